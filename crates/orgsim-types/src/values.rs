//! Scalar values and parameter maps.
//!
//! Node attributes, final-state metrics, and time-series entries are all
//! [`Scalar`]s. Simulation parameters arrive as a flat JSON-shaped map
//! ([`ParameterSet`]) whose numeric entries are read with typed accessors;
//! structured entries (per-node opinion overrides, seed node lists) stay
//! as raw JSON and are decoded by the behavior that understands them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A scalar attribute or metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean flag.
    Bool(bool),
    /// Integer count or step index.
    Int(i64),
    /// Real-valued measurement.
    Float(f64),
    /// Text label.
    Text(String),
}

impl Scalar {
    /// Numeric view of the value. Booleans and text have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            // Step indices and counts are far below 2^53.
            #[allow(clippy::cast_precision_loss)]
            Self::Int(n) => Some(*n as f64),
            Self::Float(x) => Some(*x),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Integer view of the value.
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Named simulation parameters.
///
/// Unknown names are carried along untouched and ignored by behaviors;
/// missing names fall back to each behavior's documented defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ParameterSet(pub BTreeMap<String, serde_json::Value>);

impl ParameterSet {
    /// Create an empty parameter set.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert of a numeric parameter.
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set_f64(name, value);
        self
    }

    /// Builder-style insert of a structured parameter.
    pub fn with_value(mut self, name: &str, value: serde_json::Value) -> Self {
        self.0.insert(name.to_owned(), value);
        self
    }

    /// Set a numeric parameter. Non-finite values are stored as `null`.
    pub fn set_f64(&mut self, name: &str, value: f64) {
        let json = serde_json::Number::from_f64(value)
            .map_or(serde_json::Value::Null, serde_json::Value::Number);
        self.0.insert(name.to_owned(), json);
    }

    /// Set an integer parameter.
    pub fn set_u64(&mut self, name: &str, value: u64) {
        self.0.insert(name.to_owned(), serde_json::Value::from(value));
    }

    /// Raw JSON value of a parameter.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// Whether a parameter is present (and not `null`).
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_null())
    }

    /// Numeric value of a parameter, if present and numeric.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(serde_json::Value::as_f64)
    }

    /// Non-negative integer value of a parameter.
    ///
    /// Whole-valued floats (`42.0`) are accepted because swept values are
    /// always floats.
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        let value = self.get(name)?;
        if let Some(n) = value.as_u64() {
            return Some(n);
        }
        let x = value.as_f64()?;
        if x.is_finite() && x >= 0.0 && x.fract() == 0.0 && x < 18_446_744_073_709_551_616.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(x as u64)
        } else {
            None
        }
    }

    /// Return a copy of `self` with every entry of `overrides` applied on top.
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut out = self.clone();
        for (name, value) in &overrides.0 {
            out.0.insert(name.clone(), value.clone());
        }
        out
    }

    /// Iterate over all parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}
