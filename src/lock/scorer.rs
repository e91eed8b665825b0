use rayon::prelude::*;
use serde::Serialize;

use crate::{
    config::{FlipScope, LockConfig},
    error::Result,
    netlist::{Driver, Edge, Netlist},
    sim::{Override, Simulator, VectorSet, mismatches},
};

/// Average fraction of output bits that change when a candidate is flipped.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CorruptionScore {
    pub edge: Edge,
    pub score: f64,
}

/// Every edge leaving an internal net, i.e. a net that is neither a primary
/// input nor a primary output. Sorted and free of duplicates.
pub fn candidates(netlist: &Netlist) -> Vec<Edge> {
    let mut edges: Vec<Edge> = netlist
        .nets()
        .filter(|(id, net)| matches!(net.driver, Driver::Gate(_)) && !netlist.is_output(*id))
        .flat_map(|(id, net)| {
            net.consumers.iter().map(move |c| Edge {
                net: id,
                gate: c.gate,
                slot: c.slot,
            })
        })
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Scores candidates against a fixed vector population.
///
/// The reference outputs are computed once at construction; afterwards the
/// scorer is read-only and [`Scorer::score_all`] fans candidates out over the
/// current rayon pool.
pub struct Scorer<'n> {
    sim: Simulator<'n>,
    vectors: VectorSet,
    reference: Vec<Vec<u64>>,
    flip: FlipScope,
}

impl<'n> Scorer<'n> {
    pub fn new(netlist: &'n Netlist, vectors: VectorSet, flip: FlipScope) -> Result<Self> {
        let sim = Simulator::new(netlist)?;
        let reference = vectors
            .iter()
            .map(|(inputs, _)| sim.evaluate_words(inputs, None))
            .collect();
        Ok(Self {
            sim,
            vectors,
            reference,
            flip,
        })
    }

    /// Builds the vector population described by `config` for `netlist`.
    pub fn from_config(netlist: &'n Netlist, config: &LockConfig) -> Result<Self> {
        let vectors = VectorSet::for_width(
            netlist.inputs().len(),
            config.exhaustive_limit,
            config.samples,
            config.seed,
        );
        Self::new(netlist, vectors, config.flip)
    }

    pub fn vectors(&self) -> &VectorSet {
        &self.vectors
    }

    pub fn into_vectors(self) -> VectorSet {
        self.vectors
    }

    pub fn score(&self, edge: Edge) -> CorruptionScore {
        let width = self.sim.netlist().outputs().len() as u64;
        let total = self.vectors.len() * width;
        if total == 0 {
            return CorruptionScore { edge, score: 0.0 };
        }

        let ov = match self.flip {
            FlipScope::Net => Override::flip_net(edge.net),
            FlipScope::Edge => Override::flip_edge(edge),
        };

        let mut values = Vec::new();
        let differing: u64 = self
            .vectors
            .iter()
            .zip(&self.reference)
            .map(|((inputs, mask), reference)| {
                self.sim.run_word(inputs, Some(&ov), &mut values);
                mismatches(&self.sim.outputs_of(&values), reference, mask)
            })
            .sum();

        CorruptionScore {
            edge,
            score: differing as f64 / total as f64,
        }
    }

    /// Scores every edge in parallel. Results come back in the order of `edges`.
    pub fn score_all(&self, edges: &[Edge]) -> Vec<CorruptionScore> {
        edges.par_iter().map(|edge| self.score(*edge)).collect()
    }
}

/// Scores a single candidate with the vector population described by `config`.
pub fn score(netlist: &Netlist, edge: Edge, config: &LockConfig) -> Result<CorruptionScore> {
    Ok(Scorer::from_config(netlist, config)?.score(edge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::GateKind;

    fn and_only() -> Netlist {
        let mut n = Netlist::new();
        let a = n.add_input("a").unwrap();
        let b = n.add_input("b").unwrap();
        n.add_output("c").unwrap();
        n.add_gate(GateKind::And, &[a, b], "c").unwrap();
        n
    }

    fn and_not() -> Netlist {
        let mut n = and_only();
        let c = n.net_by_name("c").unwrap();
        n.add_output("d").unwrap();
        n.add_gate(GateKind::Not, &[c], "d").unwrap();
        n
    }

    /// `c = AND(a, b)` observed through `d = NOT(c)` only.
    fn and_into_not() -> Netlist {
        let mut n = Netlist::new();
        let a = n.add_input("a").unwrap();
        let b = n.add_input("b").unwrap();
        n.add_output("d").unwrap();
        let c = n.add_gate(GateKind::And, &[a, b], "c").unwrap();
        let c = n.gate(c).output;
        n.add_gate(GateKind::Not, &[c], "d").unwrap();
        n
    }

    #[test]
    fn outputs_and_inputs_are_not_candidates() {
        assert!(candidates(&and_only()).is_empty());
        // `c` is still an output, so nothing qualifies
        assert!(candidates(&and_not()).is_empty());

        let n = and_into_not();
        let c = n.net_by_name("c").unwrap();
        let edges = candidates(&n);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].net, c);
    }

    #[test]
    fn flipping_into_inverter_always_corrupts() {
        let n = and_into_not();
        let edge = candidates(&n)[0];
        for flip in [FlipScope::Net, FlipScope::Edge] {
            let config = LockConfig {
                flip,
                ..LockConfig::default()
            };
            assert_eq!(score(&n, edge, &config).unwrap().score, 1.0);
        }
    }

    #[test]
    fn masked_signal_scores_partially() {
        // x = AND(a, b); y = AND(x, c); output y. Flipping x is visible only when c = 1.
        let mut n = Netlist::new();
        let a = n.add_input("a").unwrap();
        let b = n.add_input("b").unwrap();
        let c = n.add_input("c").unwrap();
        n.add_output("y").unwrap();
        let x = n.add_gate(GateKind::And, &[a, b], "x").unwrap();
        let x = n.gate(x).output;
        n.add_gate(GateKind::And, &[x, c], "y").unwrap();

        let scorer = Scorer::from_config(&n, &LockConfig::default()).unwrap();
        assert!(scorer.vectors().is_exhaustive());
        let edge = candidates(&n)[0];
        assert_eq!(scorer.score(edge).score, 0.5);
    }

    #[test]
    fn sampled_scores_are_reproducible() {
        let n = and_into_not();
        let config = LockConfig {
            exhaustive_limit: 0,
            samples: 100,
            seed: 42,
            ..LockConfig::default()
        };
        let scorer = Scorer::from_config(&n, &config).unwrap();
        assert!(!scorer.vectors().is_exhaustive());
        let edges = candidates(&n);
        let first = scorer.score_all(&edges);
        let second = Scorer::from_config(&n, &config).unwrap().score_all(&edges);
        assert_eq!(first, second);
        assert_eq!(first[0].score, 1.0);
    }
}
