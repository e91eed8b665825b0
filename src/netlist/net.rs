use std::fmt;

use serde::{Deserialize, Serialize};

use super::GateId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetId(pub usize);

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// What produces the value of a net.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Driver {
    Input,
    Gate(GateId),
    /// Referenced but not yet produced. Only exists while a netlist is being parsed.
    Pending,
}

/// One reader of a net: input `slot` of `gate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Consumer {
    pub gate: GateId,
    pub slot: usize,
}

#[derive(Clone, Debug)]
pub struct Net {
    pub name: String,
    pub driver: Driver,
    pub consumers: Vec<Consumer>,
}

impl Net {
    pub(crate) fn new(name: String, driver: Driver) -> Self {
        Self {
            name,
            driver,
            consumers: Vec::new(),
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.driver, Driver::Input)
    }

    pub fn fanout(&self) -> usize {
        self.consumers.len()
    }

    pub(crate) fn detach(&mut self, consumer: Consumer) -> bool {
        match self.consumers.iter().position(|c| *c == consumer) {
            Some(pos) => {
                self.consumers.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// The connection from `net` into input `slot` of `gate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub net: NetId,
    pub gate: GateId,
    pub slot: usize,
}

impl Edge {
    pub fn consumer(&self) -> Consumer {
        Consumer {
            gate: self.gate,
            slot: self.slot,
        }
    }
}
