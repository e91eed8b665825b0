//! In-memory gate-level netlist.
//!
//! Nets and gates live in two arenas and refer to each other only through
//! [`NetId`] / [`GateId`]. Every net has exactly one driver: a primary input or
//! the output of one gate. Acyclicity is not assumed; it is checked by
//! [`Netlist::topological_order`].

use std::collections::{BTreeMap, HashMap};

use indexmap::{IndexMap, map::Entry};
use serde::Serialize;

use crate::error::{Error, Result};

mod gate;
mod net;
mod topology;

pub use gate::{Gate, GateId, GateKind};
pub use net::{Consumer, Driver, Edge, Net, NetId};

#[derive(Clone, Debug, Default)]
pub struct Netlist {
    nets: Vec<Net>,
    gates: Vec<Gate>,
    names: IndexMap<String, NetId>,
    inputs: Vec<NetId>,
    outputs: Vec<NetId>,
}

/// Summary figures for reporting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetlistStats {
    pub inputs: usize,
    pub outputs: usize,
    pub nets: usize,
    pub gates: BTreeMap<GateKind, usize>,
    pub depth: usize,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// If `id` was not issued by this netlist. Use [`Netlist::contains_net`]
    /// to check ids of unknown origin.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.0]
    }

    pub fn contains_net(&self, id: NetId) -> bool {
        id.0 < self.nets.len()
    }

    /// # Panics
    ///
    /// If `id` was not issued by this netlist.
    pub fn gate(&self, id: GateId) -> &Gate {
        &self.gates[id.0]
    }

    pub fn net_by_name(&self, name: &str) -> Option<NetId> {
        self.names.get(name).copied()
    }

    pub fn net_name(&self, id: NetId) -> &str {
        &self.nets[id.0].name
    }

    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets.iter().enumerate().map(|(i, n)| (NetId(i), n))
    }

    pub fn gates(&self) -> impl Iterator<Item = (GateId, &Gate)> {
        self.gates.iter().enumerate().map(|(i, g)| (GateId(i), g))
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    pub fn inputs(&self) -> &[NetId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NetId] {
        &self.outputs
    }

    pub fn is_output(&self, id: NetId) -> bool {
        self.outputs.contains(&id)
    }

    pub fn fanout(&self, id: NetId) -> usize {
        self.nets[id.0].fanout()
    }

    /// Returns the net called `name`, creating an undriven placeholder if it is unknown.
    pub(crate) fn net_or_pending(&mut self, name: &str) -> NetId {
        match self.names.entry(name.to_owned()) {
            Entry::Occupied(occ) => *occ.get(),
            Entry::Vacant(vac) => {
                let id = NetId(self.nets.len());
                self.nets.push(Net::new(name.to_owned(), Driver::Pending));
                vac.insert(id);
                id
            }
        }
    }

    /// Claims the net `name` for a new driver.
    fn drive(&mut self, name: &str, driver: Driver) -> Result<NetId> {
        let id = self.net_or_pending(name);
        let net = &mut self.nets[id.0];
        if net.driver != Driver::Pending {
            return Err(Error::malformed(0, format!("net `{name}` has more than one driver")));
        }
        net.driver = driver;
        Ok(id)
    }

    pub fn add_input(&mut self, name: &str) -> Result<NetId> {
        let id = self.drive(name, Driver::Input)?;
        self.inputs.push(id);
        Ok(id)
    }

    /// Marks `name` as a primary output. The net may still be undriven at this point.
    pub fn add_output(&mut self, name: &str) -> Result<NetId> {
        let id = self.net_or_pending(name);
        if self.outputs.contains(&id) {
            return Err(Error::malformed(0, format!("output `{name}` declared twice")));
        }
        self.outputs.push(id);
        Ok(id)
    }

    pub fn add_gate(&mut self, kind: GateKind, inputs: &[NetId], output: &str) -> Result<GateId> {
        if !kind.accepts_arity(inputs.len()) {
            return Err(Error::malformed(0, kind.arity_error(inputs.len())));
        }
        if let Some(bad) = inputs.iter().find(|id| !self.contains_net(**id)) {
            return Err(Error::malformed(0, format!("unknown net {bad}")));
        }

        let gate_id = GateId(self.gates.len());
        let output = self.drive(output, Driver::Gate(gate_id))?;

        for (slot, input) in inputs.iter().enumerate() {
            self.nets[input.0].consumers.push(Consumer {
                gate: gate_id,
                slot,
            });
        }
        self.gates.push(Gate {
            kind,
            inputs: inputs.to_vec(),
            output,
        });
        Ok(gate_id)
    }

    /// Nets that were referenced but never received a driver.
    pub(crate) fn undriven(&self) -> impl Iterator<Item = NetId> + '_ {
        self.nets()
            .filter(|(_, net)| net.driver == Driver::Pending)
            .map(|(id, _)| id)
    }

    /// Fails on the first net that was referenced but never driven.
    pub fn validate(&self) -> Result<()> {
        match self.undriven().next() {
            Some(id) => Err(Error::malformed(
                0,
                format!("net `{}` is never driven", self.net_name(id)),
            )),
            None => Ok(()),
        }
    }

    /// A name derived from `base` that no net uses yet.
    pub fn fresh_name(&self, base: &str) -> String {
        if !self.names.contains_key(base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.names.contains_key(candidate))
            .unwrap_or_else(|| unreachable!("unbounded range"))
    }

    /// Points `consumer` at `net`, keeping consumer lists in sync.
    pub(crate) fn rewire(&mut self, consumer: Consumer, net: NetId) {
        let input = &mut self.gates[consumer.gate.0].inputs[consumer.slot];
        let old = std::mem::replace(input, net);
        self.nets[old.0].detach(consumer);
        self.nets[net.0].consumers.push(consumer);
    }

    /// Equality by names: same inputs and outputs in the same order, and the
    /// same gate producing every net. Arena ids are ignored.
    pub fn same_structure(&self, other: &Netlist) -> bool {
        let names = |n: &Netlist, ids: &[NetId]| -> Vec<String> {
            ids.iter().map(|id| n.net_name(*id).to_owned()).collect()
        };
        let definitions = |n: &Netlist| -> HashMap<String, (GateKind, Vec<String>)> {
            n.gates()
                .map(|(_, g)| {
                    (
                        n.net_name(g.output).to_owned(),
                        (g.kind, names(n, &g.inputs)),
                    )
                })
                .collect()
        };

        names(self, &self.inputs) == names(other, &other.inputs)
            && names(self, &self.outputs) == names(other, &other.outputs)
            && definitions(self) == definitions(other)
    }

    pub fn stats(&self) -> Result<NetlistStats> {
        let mut gates = BTreeMap::new();
        for (_, gate) in self.gates() {
            *gates.entry(gate.kind).or_insert(0) += 1;
        }
        Ok(NetlistStats {
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
            nets: self.nets.len(),
            gates,
            depth: self.depth()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn and_not() -> Netlist {
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
    fn lookup_by_name_and_id() {
        let n = and_not();
        let c = n.net_by_name("c").unwrap();
        assert_eq!(n.net_name(c), "c");
        assert_eq!(n.fanout(c), 1);
        assert!(matches!(n.net(c).driver, Driver::Gate(GateId(0))));
        assert!(n.net(n.net_by_name("a").unwrap()).is_input());
        assert!(n.is_output(n.net_by_name("d").unwrap()));
        n.validate().unwrap();
        assert!(n.contains_net(c));
        assert!(!n.contains_net(NetId(n.net_count())));
    }

    #[test]
    fn second_driver_is_rejected() {
        let mut n = and_not();
        let a = n.net_by_name("a").unwrap();
        let err = n.add_gate(GateKind::Buf, &[a], "c").unwrap_err();
        assert!(matches!(err, Error::MalformedNetlist { .. }));
        assert!(n.add_input("d").is_err());
    }

    #[test]
    fn arity_is_checked() {
        let mut n = Netlist::new();
        let a = n.add_input("a").unwrap();
        assert!(n.add_gate(GateKind::Not, &[a, a], "x").is_err());
        assert!(n.add_gate(GateKind::Xor, &[a], "x").is_err());
    }

    #[test]
    fn undriven_output_fails_validation() {
        let mut n = Netlist::new();
        n.add_input("a").unwrap();
        n.add_output("z").unwrap();
        assert!(n.validate().is_err());
    }

    #[test]
    fn fresh_names_avoid_collisions() {
        let n = and_not();
        assert_eq!(n.fresh_name("k"), "k");
        assert_eq!(n.fresh_name("c"), "c_1");
    }

    #[test]
    fn rewire_moves_consumer() {
        let mut n = and_not();
        let a = n.net_by_name("a").unwrap();
        let c = n.net_by_name("c").unwrap();
        n.rewire(
            Consumer {
                gate: GateId(1),
                slot: 0,
            },
            a,
        );
        assert_eq!(n.fanout(c), 0);
        assert_eq!(n.fanout(a), 2);
        assert_eq!(n.gate(GateId(1)).inputs, vec![a]);
    }

    #[test]
    fn structure_ignores_arena_order() {
        let mut other = Netlist::new();
        other.add_output("d").unwrap();
        let a = other.add_input("a").unwrap();
        let b = other.add_input("b").unwrap();
        let c = other.net_or_pending("c");
        other.add_gate(GateKind::Not, &[c], "d").unwrap();
        other.add_gate(GateKind::And, &[a, b], "c").unwrap();
        assert!(and_not().same_structure(&other));

        let mut different = and_not();
        different.add_output("c").unwrap();
        assert!(!and_not().same_structure(&different));
    }

    #[test]
    fn stats_count_kinds() {
        let stats = and_not().stats().unwrap();
        assert_eq!(stats.gates[&GateKind::And], 1);
        assert_eq!(stats.gates[&GateKind::Not], 1);
        assert_eq!(stats.depth, 2);
        assert_eq!(stats.nets, 4);
    }
}
