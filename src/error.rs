use std::io;

use serde::Serialize;

use crate::netlist::NetId;

/// Fatal errors. Any of these aborts the locking flow before a netlist is emitted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad syntax, unknown gate kind, undeclared reference or arity mismatch
    #[error("malformed netlist at line {line}: {reason}")]
    MalformedNetlist { line: usize, reason: String },
    /// No topological order exists
    #[error("netlist is not combinational: cycle through net `{net}`")]
    Cycle { net: String },
    #[error("input vector has {got} bits, netlist declares {expected} primary inputs")]
    InputWidth { expected: usize, got: usize },
    #[error("net `{net}` does not feed slot {slot} of gate driving `{gate}`")]
    InvalidEdge {
        net: String,
        gate: String,
        slot: usize,
    },
    #[error("net {net} does not belong to this netlist")]
    UnknownNet { net: NetId },
    #[error("failed to build scoring thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedNetlist {
            line,
            reason: reason.into(),
        }
    }

    /// Attributes a netlist error raised by the builder to a source line.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            Self::MalformedNetlist { reason, .. } => Self::MalformedNetlist { line, reason },
            other => other,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Non-fatal conditions. They never stop the flow but are always surfaced to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("requested {requested} keygates but only {available} candidate edges exist")]
    InsufficientCandidates { requested: usize, available: usize },
    /// `cell` is emitted anyway so the gap stays visible in the output
    #[error("cell `{cell}` used by `{gate}` is not in the target library")]
    UnsupportedPrimitive { gate: String, cell: String },
}
