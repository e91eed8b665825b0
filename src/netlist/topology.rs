use std::collections::VecDeque;

use super::{Driver, GateId, Netlist};
use crate::error::{Error, Result};

impl Netlist {
    /// Gates ordered so that every gate comes after the drivers of all its inputs.
    ///
    /// Gates become ready in id order and are emitted first-ready first, so the
    /// order is stable for a given netlist.
    pub fn topological_order(&self) -> Result<Vec<GateId>> {
        let mut pending: Vec<usize> = self
            .gates
            .iter()
            .map(|gate| {
                gate.inputs
                    .iter()
                    .filter(|net| matches!(self.nets[net.0].driver, Driver::Gate(_)))
                    .count()
            })
            .collect();

        let mut ready: VecDeque<GateId> = (0..self.gates.len())
            .filter(|&g| pending[g] == 0)
            .map(GateId)
            .collect();

        let mut order = Vec::with_capacity(self.gates.len());
        while let Some(gate) = ready.pop_front() {
            order.push(gate);
            let output = self.gates[gate.0].output;
            for consumer in &self.nets[output.0].consumers {
                let count = &mut pending[consumer.gate.0];
                *count -= 1;
                if *count == 0 {
                    ready.push_back(consumer.gate);
                }
            }
        }

        if order.len() < self.gates.len() {
            return Err(self.cycle_error(&pending));
        }
        Ok(order)
    }

    /// Walks backwards from a blocked gate until a gate repeats; that gate lies on a cycle.
    fn cycle_error(&self, pending: &[usize]) -> Error {
        let mut visited = vec![false; self.gates.len()];
        let mut current = (0..self.gates.len()).find(|&g| pending[g] > 0);

        while let Some(g) = current {
            if visited[g] {
                return Error::Cycle {
                    net: self.net_name(self.gates[g].output).to_owned(),
                };
            }
            visited[g] = true;
            current = self.gates[g].inputs.iter().find_map(|net| match self.nets[net.0].driver {
                Driver::Gate(driver) if pending[driver.0] > 0 => Some(driver.0),
                _ => None,
            });
        }

        Error::Cycle {
            net: String::from("<unknown>"),
        }
    }

    /// Number of gates on the longest input-to-output path.
    pub fn depth(&self) -> Result<usize> {
        let mut level = vec![0usize; self.nets.len()];
        let mut depth = 0;
        for gate in self.topological_order()? {
            let gate = &self.gates[gate.0];
            let l = gate.inputs.iter().map(|n| level[n.0]).max().unwrap_or(0) + 1;
            level[gate.output.0] = l;
            depth = depth.max(l);
        }
        Ok(depth)
    }
}
