//! Bit-parallel logic simulation.
//!
//! A [`Simulator`] compiles a netlist once into a topologically ordered
//! program and then evaluates 64 input vectors per `u64` word. Net values are
//! memoised only for the duration of one word; nothing carries over between
//! calls, so the simulator is freely shared between threads.

use crate::{
    error::{Error, Result},
    netlist::{Edge, GateId, NetId, Netlist},
};

mod vectors;

pub use vectors::{MAX_EXHAUSTIVE_WIDTH, VectorSet};

/// Which signal an [`Override`] replaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The net itself, as seen by every consumer.
    Net(NetId),
    /// Only the value read through one gate input slot.
    Edge(Edge),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Force(bool),
    /// Invert the naturally computed value.
    Flip,
}

/// Replaces the value of one signal, ignoring its driver, before it propagates downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Override {
    pub target: Target,
    pub action: Action,
}

impl Override {
    pub fn force(net: NetId, value: bool) -> Self {
        Self {
            target: Target::Net(net),
            action: Action::Force(value),
        }
    }

    pub fn flip_net(net: NetId) -> Self {
        Self {
            target: Target::Net(net),
            action: Action::Flip,
        }
    }

    pub fn flip_edge(edge: Edge) -> Self {
        Self {
            target: Target::Edge(edge),
            action: Action::Flip,
        }
    }

    fn apply(&self, word: u64) -> u64 {
        match self.action {
            Action::Force(true) => !0,
            Action::Force(false) => 0,
            Action::Flip => !word,
        }
    }
}

pub struct Simulator<'n> {
    netlist: &'n Netlist,
    order: Vec<GateId>,
}

impl<'n> Simulator<'n> {
    /// Fails with [`Error::Cycle`] if the netlist is not combinational.
    pub fn new(netlist: &'n Netlist) -> Result<Self> {
        Ok(Self {
            netlist,
            order: netlist.topological_order()?,
        })
    }

    pub fn netlist(&self) -> &'n Netlist {
        self.netlist
    }

    /// Evaluates one word of 64 vectors and leaves every net's value in `values`.
    ///
    /// # Panics
    ///
    /// If `ov` targets a net or gate outside the simulated netlist.
    pub fn run_word(&self, inputs: &[u64], ov: Option<&Override>, values: &mut Vec<u64>) {
        let netlist = self.netlist;
        values.clear();
        values.resize(netlist.net_count(), 0);

        for (net, word) in netlist.inputs().iter().zip(inputs) {
            values[net.0] = *word;
        }

        let (net_ov, edge_ov) = match ov {
            Some(o) => match o.target {
                Target::Net(net) => (Some((net, o)), None),
                Target::Edge(edge) => (None, Some((edge, o))),
            },
            None => (None, None),
        };
        if let Some((net, o)) = net_ov {
            if netlist.net(net).is_input() {
                values[net.0] = o.apply(values[net.0]);
            }
        }

        let mut operands = Vec::new();
        for &gate_id in &self.order {
            let gate = netlist.gate(gate_id);
            operands.clear();
            operands.extend(gate.inputs.iter().map(|n| values[n.0]));
            if let Some((edge, o)) = edge_ov {
                if edge.gate == gate_id {
                    operands[edge.slot] = o.apply(operands[edge.slot]);
                }
            }

            let mut out = gate.kind.eval(&operands);
            if let Some((net, o)) = net_ov {
                if net == gate.output {
                    out = o.apply(out);
                }
            }
            values[gate.output.0] = out;
        }
    }

    /// Primary output words, in declared output order.
    pub fn evaluate_words(&self, inputs: &[u64], ov: Option<&Override>) -> Vec<u64> {
        let mut values = Vec::new();
        self.run_word(inputs, ov, &mut values);
        self.outputs_of(&values)
    }

    pub(crate) fn outputs_of(&self, values: &[u64]) -> Vec<u64> {
        self.netlist.outputs().iter().map(|n| values[n.0]).collect()
    }

    fn pack(&self, inputs: &[bool]) -> Result<Vec<u64>> {
        let expected = self.netlist.inputs().len();
        if inputs.len() != expected {
            return Err(Error::InputWidth {
                expected,
                got: inputs.len(),
            });
        }
        Ok(inputs.iter().map(|b| u64::from(*b)).collect())
    }

    fn unpack(words: Vec<u64>) -> Vec<bool> {
        words.into_iter().map(|w| w & 1 == 1).collect()
    }

    /// Primary output values for one input vector given in declared input order.
    pub fn evaluate(&self, inputs: &[bool]) -> Result<Vec<bool>> {
        let packed = self.pack(inputs)?;
        Ok(Self::unpack(self.evaluate_words(&packed, None)))
    }

    /// Like [`Simulator::evaluate`] with `net` held at `forced` regardless of its driver.
    pub fn evaluate_with_override(
        &self,
        inputs: &[bool],
        net: NetId,
        forced: bool,
    ) -> Result<Vec<bool>> {
        if !self.netlist.contains_net(net) {
            return Err(Error::UnknownNet { net });
        }
        let packed = self.pack(inputs)?;
        let ov = Override::force(net, forced);
        Ok(Self::unpack(self.evaluate_words(&packed, Some(&ov))))
    }
}

/// Number of output bits that differ between `a` and `b` over the lanes in `mask`.
pub fn mismatches(a: &[u64], b: &[u64], mask: u64) -> u64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| u64::from(((x ^ y) & mask).count_ones()))
        .sum()
}

/// One-shot evaluation of `netlist` on a single vector.
pub fn evaluate(netlist: &Netlist, inputs: &[bool]) -> Result<Vec<bool>> {
    Simulator::new(netlist)?.evaluate(inputs)
}

pub fn evaluate_with_override(
    netlist: &Netlist,
    inputs: &[bool],
    net: NetId,
    forced: bool,
) -> Result<Vec<bool>> {
    Simulator::new(netlist)?.evaluate_with_override(inputs, net, forced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::GateKind;

    /// `c = AND(a, b)`, `d = NOT(c)`, `e = OR(c, b)`; outputs `d`, `e`.
    fn sample() -> Netlist {
        let mut n = Netlist::new();
        let a = n.add_input("a").unwrap();
        let b = n.add_input("b").unwrap();
        n.add_output("d").unwrap();
        n.add_output("e").unwrap();
        let c = n.add_gate(GateKind::And, &[a, b], "c").unwrap();
        let c = n.gate(c).output;
        n.add_gate(GateKind::Not, &[c], "d").unwrap();
        n.add_gate(GateKind::Or, &[c, b], "e").unwrap();
        n
    }

    #[test]
    fn evaluates_every_vector() {
        let n = sample();
        let sim = Simulator::new(&n).unwrap();
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let c = a && b;
            assert_eq!(sim.evaluate(&[a, b]).unwrap(), vec![!c, c || b]);
        }
    }

    #[test]
    fn override_ignores_driver() {
        let n = sample();
        let c = n.net_by_name("c").unwrap();
        assert_eq!(
            evaluate_with_override(&n, &[false, false], c, true).unwrap(),
            vec![false, true]
        );
        let a = n.net_by_name("a").unwrap();
        assert_eq!(
            evaluate_with_override(&n, &[false, true], a, true).unwrap(),
            vec![false, true]
        );
    }

    #[test]
    fn edge_flip_only_touches_one_consumer() {
        let n = sample();
        let sim = Simulator::new(&n).unwrap();
        let c = n.net_by_name("c").unwrap();
        let not_gate = n.net(c).consumers[0].gate;
        let edge = Edge {
            net: c,
            gate: not_gate,
            slot: 0,
        };
        let inputs = [0b1100, 0b1010];
        let plain = sim.evaluate_words(&inputs, None);
        let flipped = sim.evaluate_words(&inputs, Some(&Override::flip_edge(edge)));
        assert_eq!(flipped[0] & 0xf, !plain[0] & 0xf);
        assert_eq!(flipped[1], plain[1]);

        let net_flip = sim.evaluate_words(&inputs, Some(&Override::flip_net(c)));
        assert_ne!(net_flip[1] & 0xf, plain[1] & 0xf);
    }

    #[test]
    fn override_of_foreign_net_is_an_error() {
        let n = sample();
        let foreign = NetId(n.net_count() + 3);
        assert!(matches!(
            evaluate_with_override(&n, &[true, true], foreign, false),
            Err(Error::UnknownNet { net }) if net == foreign
        ));
    }

    #[test]
    fn input_width_is_checked() {
        let n = sample();
        assert!(matches!(
            evaluate(&n, &[true]),
            Err(Error::InputWidth {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn mismatches_respect_mask() {
        assert_eq!(mismatches(&[0b1111, 0], &[0, 0b11], 0b0111), 5);
    }
}
