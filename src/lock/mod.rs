//! Keygate selection and insertion.
//!
//! [`lock`] runs the whole flow: enumerate candidate edges, score them on a
//! fixed vector population, pick the best distinct edges and splice one
//! keygate into each. The input netlist is only read; the locked netlist is a
//! new value.

use rayon::ThreadPoolBuilder;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::LockConfig,
    error::{Error, Result, Warning},
    netlist::{Edge, Netlist, NetlistStats},
    sim::{Simulator, VectorSet, mismatches},
};

mod key;
mod mutator;
mod scorer;
mod selector;

pub use key::{Key, KeyParseError};
pub use mutator::{LockedNetlist, insert_key_gates};
pub use scorer::{CorruptionScore, Scorer, candidates, score};
pub use selector::{ranked, select};

/// Everything one locking run produced.
#[derive(Debug)]
pub struct LockOutcome {
    /// All candidate scores, best first.
    pub scores: Vec<CorruptionScore>,
    /// Edges that received a keygate, in insertion order.
    pub selected: Vec<Edge>,
    pub locked: LockedNetlist,
    pub warnings: Vec<Warning>,
    pub vectors: VectorSet,
}

fn run_scoring<T: Send>(threads: Option<usize>, job: impl FnOnce() -> T + Send) -> Result<T> {
    match threads {
        Some(n) => Ok(ThreadPoolBuilder::new().num_threads(n).build()?.install(job)),
        None => Ok(job()),
    }
}

pub fn lock(netlist: &Netlist, config: &LockConfig) -> Result<LockOutcome> {
    let span = tracing::info_span!("lock", key_size = config.key_size);
    let _enter = span.enter();

    let edges = candidates(netlist);
    let scorer = Scorer::from_config(netlist, config)?;
    info!(
        candidates = edges.len(),
        vectors = scorer.vectors().len(),
        exhaustive = scorer.vectors().is_exhaustive(),
        "scoring candidates"
    );

    let scores = run_scoring(config.threads, || scorer.score_all(&edges))?;
    let scores = ranked(&scores, config.ranking);
    let selected = select(&scores, config.key_size, config.ranking);

    let mut warnings = Vec::new();
    if selected.len() < config.key_size {
        let shortfall = Warning::InsufficientCandidates {
            requested: config.key_size,
            available: selected.len(),
        };
        warn!("{shortfall}");
        warnings.push(shortfall);
    }

    let locked = insert_key_gates(netlist, &selected, config.seed, &config.key_prefix)?;
    info!(key_bits = locked.key.len(), "locked netlist");

    Ok(LockOutcome {
        scores,
        selected,
        locked,
        warnings,
        vectors: scorer.into_vectors(),
    })
}

/// Input words for the locked netlist: the original inputs followed by the key bits.
fn keyed(inputs: &[u64], key: &Key) -> Vec<u64> {
    inputs
        .iter()
        .copied()
        .chain(key.bits().iter().map(|bit| if *bit { !0 } else { 0 }))
        .collect()
}

/// Total differing output bits between `original` and `locked` (driven by `key`) over `vectors`.
fn differing_bits(
    original: &Netlist,
    locked: &Netlist,
    key: &Key,
    vectors: &VectorSet,
) -> Result<u64> {
    let expected = original.inputs().len();
    if vectors.width() != expected {
        return Err(Error::InputWidth {
            expected,
            got: vectors.width(),
        });
    }
    if locked.inputs().len() != expected + key.len() {
        return Err(Error::InputWidth {
            expected: locked.inputs().len(),
            got: expected + key.len(),
        });
    }

    let reference = Simulator::new(original)?;
    let candidate = Simulator::new(locked)?;
    Ok(vectors
        .iter()
        .map(|(inputs, mask)| {
            let want = reference.evaluate_words(inputs, None);
            let got = candidate.evaluate_words(&keyed(inputs, key), None);
            mismatches(&want, &got, mask)
        })
        .sum())
}

/// True when `locked` under its recorded key matches `original` on every vector.
pub fn verify_unlocks(original: &Netlist, locked: &LockedNetlist, vectors: &VectorSet) -> Result<bool> {
    Ok(differing_bits(original, &locked.netlist, &locked.key, vectors)? == 0)
}

/// Average fraction of output bits that differ from `original` when `locked` is driven by `key`.
pub fn output_corruption(
    original: &Netlist,
    locked: &Netlist,
    key: &Key,
    vectors: &VectorSet,
) -> Result<f64> {
    let total = vectors.len() * original.outputs().len() as u64;
    if total == 0 {
        return Ok(0.0);
    }
    Ok(differing_bits(original, locked, key, vectors)? as f64 / total as f64)
}

/// A candidate edge named by nets rather than arena ids.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EdgeReport {
    pub net: String,
    /// Output net of the consuming gate.
    pub consumer: String,
    pub slot: usize,
    pub score: f64,
}

/// Serializable summary of a run.
#[derive(Clone, Debug, Serialize)]
pub struct LockReport {
    pub original: NetlistStats,
    pub locked: NetlistStats,
    pub vectors: u64,
    pub exhaustive: bool,
    pub key: Key,
    pub selected: Vec<EdgeReport>,
    pub scores: Vec<EdgeReport>,
    pub warnings: Vec<Warning>,
}

impl LockOutcome {
    pub fn key(&self) -> &Key {
        &self.locked.key
    }

    pub fn report(&self, original: &Netlist) -> Result<LockReport> {
        let describe = |s: &CorruptionScore| EdgeReport {
            net: original.net_name(s.edge.net).to_owned(),
            consumer: original.net_name(original.gate(s.edge.gate).output).to_owned(),
            slot: s.edge.slot,
            score: s.score,
        };
        let selected = self
            .selected
            .iter()
            .filter_map(|edge| self.scores.iter().find(|s| s.edge == *edge))
            .map(describe)
            .collect();

        Ok(LockReport {
            original: original.stats()?,
            locked: self.locked.netlist.stats()?,
            vectors: self.vectors.len(),
            exhaustive: self.vectors.is_exhaustive(),
            key: self.locked.key.clone(),
            selected,
            scores: self.scores.iter().map(describe).collect(),
            warnings: self.warnings.clone(),
        })
    }
}
