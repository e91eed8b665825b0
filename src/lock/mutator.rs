use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use super::Key;
use crate::{
    error::{Error, Result},
    netlist::{Edge, GateId, GateKind, NetId, Netlist},
};

/// Keeps polarity draws independent of the vector-sampling stream that shares the seed.
const POLARITY_STREAM: u64 = 1;

/// A locked copy of a netlist together with its correct key.
#[derive(Clone, Debug)]
pub struct LockedNetlist {
    pub netlist: Netlist,
    pub key: Key,
    /// Key-input nets, parallel to `key`.
    pub key_inputs: Vec<NetId>,
    pub key_gates: Vec<GateId>,
}

fn check_edge(netlist: &Netlist, edge: &Edge) -> Result<()> {
    let valid = netlist.contains_net(edge.net)
        && edge.gate.0 < netlist.gate_count()
        && netlist.gate(edge.gate).inputs.get(edge.slot) == Some(&edge.net);
    if valid {
        return Ok(());
    }

    let name_of_net = |id: NetId| {
        netlist.contains_net(id)
            .then(|| netlist.net_name(id).to_owned())
            .unwrap_or_else(|| id.to_string())
    };
    let gate = if edge.gate.0 < netlist.gate_count() {
        name_of_net(netlist.gate(edge.gate).output)
    } else {
        edge.gate.to_string()
    };
    Err(Error::InvalidEdge {
        net: name_of_net(edge.net),
        gate,
        slot: edge.slot,
    })
}

/// Splices one keygate into every edge, in the order given.
///
/// For edge `i` a primary input `{key_prefix}{i}` is appended after the
/// existing inputs, a keygate reading the original net and that key input is
/// added, and the consumer slot is moved onto the keygate output. Polarity is
/// drawn from `seed`: XOR records key bit 0, XNOR records key bit 1, so the
/// recorded key makes every keygate a pass-through.
///
/// `netlist` is left untouched.
pub fn insert_key_gates(
    netlist: &Netlist,
    edges: &[Edge],
    seed: u64,
    key_prefix: &str,
) -> Result<LockedNetlist> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream(POLARITY_STREAM);

    let mut locked = netlist.clone();
    let mut key = Key::default();
    let mut key_inputs = Vec::with_capacity(edges.len());
    let mut key_gates = Vec::with_capacity(edges.len());

    for (i, edge) in edges.iter().enumerate() {
        check_edge(&locked, edge)?;

        let bit: bool = rng.random();
        let kind = if bit { GateKind::Xnor } else { GateKind::Xor };

        let key_name = locked.fresh_name(&format!("{key_prefix}{i}"));
        let key_input = locked.add_input(&key_name)?;

        let gate_name = locked.fresh_name(&format!("{}_{key_prefix}{i}", locked.net_name(edge.net)));
        let gate = locked.add_gate(kind, &[edge.net, key_input], &gate_name)?;
        let gate_output = locked.gate(gate).output;
        locked.rewire(edge.consumer(), gate_output);

        debug!(
            net = locked.net_name(edge.net),
            keygate = %kind,
            key_input = key_name.as_str(),
            "inserted keygate"
        );

        key.push(bit);
        key_inputs.push(key_input);
        key_gates.push(gate);
    }

    Ok(LockedNetlist {
        netlist: locked,
        key,
        key_inputs,
        key_gates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{netlist::Driver, sim::evaluate};

    /// `c = AND(a, b)`, `d = NOT(c)`, `e = OR(c, b)`.
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

    fn edges_of_c(n: &Netlist) -> Vec<Edge> {
        let c = n.net_by_name("c").unwrap();
        n.net(c)
            .consumers
            .iter()
            .map(|k| Edge {
                net: c,
                gate: k.gate,
                slot: k.slot,
            })
            .collect()
    }

    #[test]
    fn splices_keygate_on_edge() {
        let n = sample();
        let edges = edges_of_c(&n);
        let locked = insert_key_gates(&n, &edges[..1], 3, "keyinput").unwrap();
        let l = &locked.netlist;

        assert_eq!(l.inputs().len(), 3);
        assert_eq!(l.net_name(l.inputs()[2]), "keyinput0");
        assert_eq!(locked.key.len(), 1);

        let gate = l.gate(locked.key_gates[0]);
        let expected = if locked.key.bits()[0] { GateKind::Xnor } else { GateKind::Xor };
        assert_eq!(gate.kind, expected);
        assert_eq!(gate.inputs, vec![edges[0].net, locked.key_inputs[0]]);
        assert_eq!(l.gate(edges[0].gate).inputs[0], gate.output);
        assert!(matches!(l.net(gate.output).driver, Driver::Gate(_)));

        // the untouched consumer still reads `c` directly
        assert_eq!(l.gate(edges[1].gate).inputs[edges[1].slot], edges[1].net);
        // the original is unchanged
        assert_eq!(n.inputs().len(), 2);
        assert_eq!(n.gate_count(), 3);
    }

    #[test]
    fn correct_key_restores_function() {
        let n = sample();
        let locked = insert_key_gates(&n, &edges_of_c(&n), 11, "k").unwrap();
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let mut inputs = vec![a, b];
            inputs.extend_from_slice(locked.key.bits());
            assert_eq!(
                evaluate(&locked.netlist, &inputs).unwrap(),
                evaluate(&n, &[a, b]).unwrap()
            );
        }
    }

    #[test]
    fn names_do_not_collide() {
        let mut n = sample();
        n.add_input("k0").unwrap();
        let locked = insert_key_gates(&n, &edges_of_c(&n)[..1], 0, "k").unwrap();
        let key_input = locked.key_inputs[0];
        assert_eq!(locked.netlist.net_name(key_input), "k0_1");
    }

    #[test]
    fn rejects_stale_or_repeated_edges() {
        let n = sample();
        let edge = edges_of_c(&n)[0];
        let err = insert_key_gates(&n, &[edge, edge], 0, "k").unwrap_err();
        assert!(matches!(err, Error::InvalidEdge { slot: 0, .. }));

        let bogus = Edge { slot: 5, ..edge };
        assert!(insert_key_gates(&n, &[bogus], 0, "k").is_err());
    }

    #[test]
    fn polarity_follows_seed() {
        let n = sample();
        let edges = edges_of_c(&n);
        let a = insert_key_gates(&n, &edges, 9, "k").unwrap();
        let b = insert_key_gates(&n, &edges, 9, "k").unwrap();
        assert_eq!(a.key, b.key);
    }
}
