//! Generative modes and prompt construction.
//!
//! A mode names the field to generate and the fields it is conditioned on,
//! written with angle keys: `s+c => a` generates an argdown reconstruction
//! from the source text and the conclusion.

use std::fmt;
use std::str::FromStr;

use argtutor_core::{Field, InputMap};
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};

/// Target field and ordered input fields of a generation or loss call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerativeMode {
    pub target: Field,
    pub inputs: Vec<Field>,
}

impl GenerativeMode {
    pub fn new(target: Field, inputs: impl IntoIterator<Item = Field>) -> Self {
        Self {
            target,
            inputs: inputs.into_iter().collect(),
        }
    }

    /// Parse `"s+c => a"`; whitespace around keys is ignored.
    pub fn from_keys(keys: &str) -> Result<Self> {
        let invalid = || OracleError::InvalidMode(keys.to_string());
        let (lhs, rhs) = keys.split_once("=>").ok_or_else(invalid)?;
        let target = Field::parse(rhs).ok_or_else(invalid)?;
        let inputs = lhs
            .split('+')
            .map(|key| Field::parse(key).ok_or_else(invalid))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { target, inputs })
    }

    /// Prompt for this mode: `"<target>: <input>: <value> ..."`.
    ///
    /// Line breaks in input values are replaced by spaces.
    pub fn prompt(&self, inputs: &InputMap) -> Result<String> {
        let mut prompt = format!("{}:", self.target.as_str());
        for field in &self.inputs {
            let value = inputs
                .get(field.as_str())
                .ok_or(OracleError::MissingInput(*field))?;
            prompt.push_str(&format!(" {}: {}", field.as_str(), preprocess(value)));
        }
        Ok(prompt)
    }

    /// Target text for a loss call.
    pub fn target_text(&self, inputs: &InputMap) -> Result<String> {
        inputs
            .get(self.target.as_str())
            .map(|v| preprocess(v))
            .ok_or(OracleError::MissingInput(self.target))
    }
}

impl fmt::Display for GenerativeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<_> = self.inputs.iter().map(|i| i.key()).collect();
        write!(f, "{} => {}", inputs.join("+"), self.target.key())
    }
}

impl FromStr for GenerativeMode {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_keys(s)
    }
}

fn preprocess(value: &str) -> String {
    value.replace('\n', " ")
}
