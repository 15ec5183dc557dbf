//! Common `ObservationSource` loader.
//!
//! Two recording formats are understood:
//!
//! * `.fobs` - compact little-endian binary. Each frame starts with a `u32` face count. Each face
//!   is a `u32` landmark count, followed by `x, y, z` as `f32` for every landmark, a `u8` flag,
//!   and if the flag is non-zero, 16 `f32` of the head pose matrix in column-major order.
//! * `.jsonl` - one JSON array of faces per line. Each face is
//!   `{"landmarks": [[x, y, z], ...], "pose": [16 floats] | null}`.

use faceanchor::prelude::v1::*;
use log::*;
use nalgebra as na;
use serde::Deserialize;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};

/// Create an observation source depending on the input.
///
/// If the input ends with `.jsonl`, it will be parsed as JSON lines. Files ending with `.fobs` and
/// `tcp://` streams are parsed as binary frames.
pub fn create_source(input: &str) -> Result<Box<dyn ObservationSource>> {
    if input.ends_with(".jsonl") {
        debug!("reading {input} as JSON lines");
        let reader = faceanchor::utils::open_file(input)?;
        Ok(Box::new(JsonLinesFile::new(BufReader::new(reader))))
    } else if input.ends_with(".fobs") || input.starts_with("tcp://") {
        debug!("reading {input} as binary frames");
        let reader = faceanchor::utils::open_file(input)?;
        Ok(Box::new(FobsFile::new(BufReader::new(reader))))
    } else {
        Err(anyhow!(
            "unrecognised observation stream \"{input}\" (expected .fobs, .jsonl or tcp://)"
        ))
    }
}

/// Binary observation stream.
pub struct FobsFile<T> {
    reader: T,
}

impl<T: Read> FobsFile<T> {
    pub fn new(reader: T) -> Self {
        Self { reader }
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; std::mem::size_of::<u32>()];
        self.reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_f32(&mut self) -> Result<f32> {
        let mut buf = [0u8; std::mem::size_of::<f32>()];
        self.reader.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    fn read_face(&mut self) -> Result<FaceObservation> {
        let count = self.read_u32()? as usize;

        let mut landmarks = Vec::with_capacity(count.min(landmarks::FACE_MESH_LEN * 2));
        for _ in 0..count {
            landmarks.push(LandmarkPoint::new(
                self.read_f32()?,
                self.read_f32()?,
                self.read_f32()?,
            ));
        }

        let mut flag = [0u8; 1];
        self.reader.read_exact(&mut flag)?;

        let pose = if flag[0] != 0 {
            let mut data = [0f32; 16];
            for v in &mut data {
                *v = self.read_f32()?;
            }
            Some(na::Matrix4::from_column_slice(&data))
        } else {
            None
        };

        Ok(FaceObservation { landmarks, pose })
    }
}

impl<T: Read> ObservationSource for FobsFile<T> {
    fn next_frame(&mut self, faces: &mut Vec<FaceObservation>) -> Result<bool> {
        let mut buf = [0u8; std::mem::size_of::<u32>()];

        // End of stream is only clean on a frame boundary, a partial header is an error.
        loop {
            match self.reader.read(&mut buf[..1]) {
                Ok(0) => return Ok(false),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.reader.read_exact(&mut buf[1..])?;

        for _ in 0..u32::from_le_bytes(buf) {
            faces.push(self.read_face()?);
        }

        Ok(true)
    }
}

/// Write a single frame in the binary format.
pub fn write_fobs_frame(out: &mut impl Write, faces: &[FaceObservation]) -> Result<()> {
    out.write_all(&(faces.len() as u32).to_le_bytes())?;

    for face in faces {
        out.write_all(&(face.landmarks.len() as u32).to_le_bytes())?;

        for v in face.landmarks.iter().flat_map(|p| [p.x, p.y, p.z]) {
            out.write_all(&v.to_le_bytes())?;
        }

        match &face.pose {
            Some(pose) => {
                out.write_all(&[1])?;
                for v in pose.iter() {
                    out.write_all(&v.to_le_bytes())?;
                }
            }
            None => out.write_all(&[0])?,
        }
    }

    Ok(())
}

/// Single face, as stored in JSON lines.
#[derive(Deserialize)]
struct FaceRecord {
    landmarks: Vec<[f32; 3]>,
    #[serde(default)]
    pose: Option<[f32; 16]>,
}

impl From<FaceRecord> for FaceObservation {
    fn from(rec: FaceRecord) -> Self {
        Self {
            landmarks: rec.landmarks.into_iter().map(Into::into).collect(),
            pose: rec.pose.map(|p| na::Matrix4::from_column_slice(&p)),
        }
    }
}

/// JSON lines observation stream.
pub struct JsonLinesFile<T> {
    reader: T,
    line: String,
    line_no: usize,
}

impl<T: BufRead> JsonLinesFile<T> {
    pub fn new(reader: T) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<T: BufRead> ObservationSource for JsonLinesFile<T> {
    fn next_frame(&mut self, faces: &mut Vec<FaceObservation>) -> Result<bool> {
        loop {
            self.line.clear();
            self.line_no += 1;

            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(false);
            }

            let line = self.line.trim();

            if line.is_empty() {
                continue;
            }

            let records: Vec<FaceRecord> = serde_json::from_str(line)
                .map_err(|e| anyhow!("line {}: {e}", self.line_no))?;

            faces.extend(records.into_iter().map(FaceObservation::from));

            return Ok(true);
        }
    }
}
