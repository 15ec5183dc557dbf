//! Replay recorded face observations through the anchor engine.

use clap::*;
use faceanchor::prelude::v1::{Result, *};
use log::*;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};

mod replay;

use replay::{replay, resolve_settings, ReplayOptions};

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("anchor-replay")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Replays recorded face observations through the anchor engine")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON engine settings"),
        )
        .arg(
            Arg::new("strategy")
                .long("strategy")
                .short('s')
                .takes_value(true)
                .possible_values(["eye-roll", "ear-yaw", "pose-matrix", "all"]),
        )
        .arg(
            Arg::new("mirrored")
                .long("mirrored")
                .short('m')
                .help("Treat the video as horizontally flipped"),
        )
        .arg(
            Arg::new("smoothing")
                .long("smoothing")
                .takes_value(true)
                .help("Exponential smoothing factor in (0; 1]"),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Override a strategy property, e.g. \"Scale gain=0.5\""),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .takes_value(true)
                .help("CSV output file (stdout if omitted)"),
        )
        .arg(
            Arg::new("convert")
                .long("convert")
                .takes_value(true)
                .help("Also write the input stream as a .fobs file"),
        )
        .arg(Arg::new("input").takes_value(true).required(true))
        .get_matches();

    let input = matches.value_of("input").unwrap();

    let base = match matches.value_of("config") {
        Some(path) => {
            let file = File::open(path).map_err(|e| anyhow!("could not open {path}: {e}"))?;
            serde_json::from_reader(file).map_err(|e| anyhow!("invalid config {path}: {e}"))?
        }
        None => EngineSettings::default(),
    };

    let options = ReplayOptions {
        strategy: matches.value_of("strategy").map(str::to_string),
        mirrored: matches.is_present("mirrored"),
        smoothing: matches
            .value_of("smoothing")
            .map(str::parse)
            .transpose()?,
        overrides: matches
            .values_of("set")
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect(),
    };

    let settings = resolve_settings(base, &options)?;

    // Gather all frames first, every strategy replays the same data.
    let mut source = observation_loader::create_source(input)?;
    let mut convert = matches
        .value_of("convert")
        .map(File::create)
        .transpose()?
        .map(BufWriter::new);

    let mut frames = vec![];

    loop {
        let mut faces = vec![];
        if !source.next_frame(&mut faces)? {
            break;
        }
        if let Some(out) = &mut convert {
            observation_loader::write_fobs_frame(out, &faces)?;
        }
        frames.push(faces);
    }

    if let Some(mut out) = convert {
        out.flush()?;
    }

    info!("loaded {} frames from {input}", frames.len());

    let results = settings
        .par_iter()
        .map(|s| replay(s, &frames))
        .collect::<Result<Vec<_>>>()?;

    let out: Box<dyn Write> = match matches.value_of("output") {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    };

    let mut writer = csv::Writer::from_writer(out);

    for (rows, stats) in &results {
        for row in rows {
            writer.serialize(row)?;
        }

        if let Some(row) = rows.first() {
            info!(
                "{}: {} frames, {} estimated ({:.1}%), {} held, {} empty, {} without face, {} degenerate, {} malformed",
                row.strategy,
                stats.frames,
                stats.estimated,
                stats.estimate_ratio() * 100.0,
                stats.held,
                stats.empty,
                stats.no_face,
                stats.degenerate,
                stats.missing_input,
            );
        }
    }

    writer.flush()?;

    Ok(())
}
