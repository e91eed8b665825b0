use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How candidate scores are ordered before the top `key_size` are taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    /// Highest corruption first.
    #[default]
    Highest,
    /// Closest to 0.5 first.
    Balanced,
}

/// What a candidate flip disturbs while scoring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FlipScope {
    /// The driver net, for all of its consumers.
    #[default]
    Net,
    /// Only the candidate's consumer slot, which is what an inserted keygate perturbs.
    Edge,
}

/// Settings for one locking run.
///
/// Every field has a default so that a JSON file only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Number of keygates requested.
    pub key_size: usize,
    /// Enumerate all 2^k vectors when the circuit has at most this many inputs.
    pub exhaustive_limit: u32,
    /// Vectors drawn when the input count is above `exhaustive_limit`.
    pub samples: usize,
    /// Seeds vector sampling and keygate polarity.
    pub seed: u64,
    pub ranking: Ranking,
    pub flip: FlipScope,
    /// Scoring worker count; `None` leaves it to rayon.
    pub threads: Option<usize>,
    /// Let gate inputs name nets produced further down the file.
    pub forward_references: bool,
    /// Base name of inserted key-input nets.
    pub key_prefix: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            key_size: 8,
            exhaustive_limit: 20,
            samples: 4096,
            seed: 0,
            ranking: Ranking::Highest,
            flip: FlipScope::Net,
            threads: None,
            forward_references: false,
            key_prefix: String::from("keyinput"),
        }
    }
}

impl LockConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
