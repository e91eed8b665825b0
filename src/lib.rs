//! Logic locking for combinational gate-level netlists.
//!
//! Keygates (XOR/XNOR driven by secret key inputs) are spliced into the
//! internal edges whose corruption of the primary outputs is largest, so the
//! locked circuit only computes the original function under the correct key.
//!
//! ```text
//! .bench text
//!   → Netlist        (netlist: arena of nets and gates)
//!   → Simulator      (sim: bit-parallel evaluation, overrides)
//!   → Scorer         (lock::scorer: corruption per candidate edge, in parallel)
//!   → select         (lock::selector: ranked, distinct edges)
//!   → LockedNetlist  (lock::mutator: keygates + key)
//!   → .bench / Verilog (format)
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod lock;
pub mod netlist;
pub mod sim;

pub use config::{FlipScope, LockConfig, Ranking};
pub use error::{Error, Result, Warning};
pub use lock::{
    CorruptionScore, Key, LockOutcome, LockReport, LockedNetlist, insert_key_gates, lock,
    output_corruption, verify_unlocks,
};
pub use netlist::{Edge, Gate, GateId, GateKind, NetId, Netlist};
pub use sim::{Simulator, VectorSet, evaluate, evaluate_with_override};
