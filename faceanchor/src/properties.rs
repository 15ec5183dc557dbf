//! Named tunable properties.
//!
//! Strategies expose their gain constants through [`Properties`], so that hosts can list and
//! tweak them by name between tracking sessions.

use crate::prelude::v1::{anyhow, Result};
use std::ops::{Deref, DerefMut};

/// Object with custom properties.
pub trait Properties {
    /// Get available properties.
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        vec![]
    }

    fn props(&mut self) -> Vec<(&str, Property)> {
        self.props_mut()
            .into_iter()
            .map(|(n, p)| (n, p.into()))
            .collect()
    }

    /// Set a property from its textual representation.
    ///
    /// Floats are clamped to the property's bounds.
    ///
    /// # Arguments
    ///
    /// * `name` - case-insensitive property name.
    /// * `value` - value to parse.
    fn set_prop(&mut self, name: &str, value: &str) -> Result<()> {
        let mut props = self.props_mut();

        let (_, prop) = props
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("unknown property \"{name}\""))?;

        match prop {
            PropertyMut::Bool(b) => **b = value.trim().parse()?,
            PropertyMut::Float(f) => {
                **f = value.trim().parse()?;
                f.clamp();
            }
        }

        Ok(())
    }
}

/// Property with a lower and upper bound.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct BoundedProp<T> {
    pub val: T,
    pub min: T,
    pub max: T,
}

impl<T> Deref for BoundedProp<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.val
    }
}

impl<T> DerefMut for BoundedProp<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.val
    }
}

impl<'a, T: Copy> From<BoundedPropMut<'a, T>> for BoundedProp<T> {
    fn from(BoundedPropMut { val, min, max }: BoundedPropMut<'a, T>) -> Self {
        Self {
            val: *val,
            min,
            max,
        }
    }
}

/// Describes the type of a property.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum Property {
    Bool(bool),
    Float(BoundedProp<f32>),
}

impl<'a> From<PropertyMut<'a>> for Property {
    fn from(prop: PropertyMut<'a>) -> Self {
        match prop {
            PropertyMut::Bool(b) => Self::Bool(*b),
            PropertyMut::Float(p) => Self::Float(p.into()),
        }
    }
}

/// Property with a lower and upper bound.
pub struct BoundedPropMut<'a, T> {
    pub val: &'a mut T,
    pub min: T,
    pub max: T,
}

impl<'a, T> Deref for BoundedPropMut<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.val
    }
}

impl<'a, T> DerefMut for BoundedPropMut<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.val
    }
}

impl<'a> BoundedPropMut<'a, f32> {
    /// Clamp the underlying value between the lower and upper bounds.
    pub fn clamp(&mut self) {
        *self.val = self.val.clamp(self.min, self.max);
    }
}

/// Describes the type of a property.
pub enum PropertyMut<'a> {
    Bool(&'a mut bool),
    Float(BoundedPropMut<'a, f32>),
}

impl<'a> PropertyMut<'a> {
    /// Create a boolean property.
    ///
    /// # Arguments
    ///
    /// * `b` - reference to the underlying boolean to be mutated.
    pub fn bool(b: &'a mut bool) -> Self {
        Self::Bool(b)
    }

    /// Create a floating point property.
    ///
    /// # Arguments
    ///
    /// * `val` - reference to the underlying float to be mutated.
    /// * `min` - lowest value for the property.
    /// * `max` - highest value for the property.
    pub fn float(val: &'a mut f32, min: f32, max: f32) -> Self {
        Self::Float(BoundedPropMut { val, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Gains {
        gain: f32,
        enabled: bool,
    }

    impl Properties for Gains {
        fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
            vec![
                ("Gain", PropertyMut::float(&mut self.gain, 0.0, 2.0)),
                ("Enabled", PropertyMut::bool(&mut self.enabled)),
            ]
        }
    }

    #[test]
    fn set_by_name() {
        let mut gains = Gains::default();

        gains.set_prop("gain", "1.5").unwrap();
        gains.set_prop("Enabled", "true").unwrap();

        assert_eq!(gains.gain, 1.5);
        assert!(gains.enabled);
    }

    #[test]
    fn set_clamps_to_bounds() {
        let mut gains = Gains::default();
        gains.set_prop("Gain", "10").unwrap();
        assert_eq!(gains.gain, 2.0);
    }

    #[test]
    fn unknown_or_malformed() {
        let mut gains = Gains::default();
        assert!(gains.set_prop("Missing", "1").is_err());
        assert!(gains.set_prop("Gain", "abc").is_err());
    }

    #[test]
    fn listing() {
        let mut gains = Gains {
            gain: 0.5,
            enabled: false,
        };

        let props = gains.props();

        assert_eq!(props[0].0, "Gain");
        assert_eq!(
            props[0].1,
            Property::Float(BoundedProp {
                val: 0.5,
                min: 0.0,
                max: 2.0
            })
        );
        assert_eq!(props[1].1, Property::Bool(false));
    }
}
