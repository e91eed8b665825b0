use std::{fmt, ops::RangeInclusive};

use serde::{Deserialize, Serialize};

use super::NetId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GateId(pub usize);

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Closed set of gate operations.
///
/// The n-ary kinds (`And`, `Or`, `Nand`, `Nor`, `Xor`, `Xnor`) accept any
/// fan-in of two or more and evaluate as the natural generalisation of the
/// two-input function: `Xor` is odd parity, `Xnor` its complement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GateKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
    Not,
    Buf,
}

type EvalFn = fn(&[u64]) -> u64;

fn and(inputs: &[u64]) -> u64 {
    inputs.iter().fold(!0, |acc, v| acc & v)
}

fn or(inputs: &[u64]) -> u64 {
    inputs.iter().fold(0, |acc, v| acc | v)
}

fn xor(inputs: &[u64]) -> u64 {
    inputs.iter().fold(0, |acc, v| acc ^ v)
}

impl GateKind {
    pub const ALL: [GateKind; 8] = [
        GateKind::And,
        GateKind::Or,
        GateKind::Nand,
        GateKind::Nor,
        GateKind::Xor,
        GateKind::Xnor,
        GateKind::Not,
        GateKind::Buf,
    ];

    /// Bit-parallel evaluation table: every `u64` carries 64 independent vectors.
    pub fn eval_fn(&self) -> EvalFn {
        match self {
            GateKind::And => and,
            GateKind::Or => or,
            GateKind::Nand => |i| !and(i),
            GateKind::Nor => |i| !or(i),
            GateKind::Xor => xor,
            GateKind::Xnor => |i| !xor(i),
            GateKind::Not => |i| !i[0],
            GateKind::Buf => |i| i[0],
        }
    }

    pub fn eval(&self, inputs: &[u64]) -> u64 {
        (self.eval_fn())(inputs)
    }

    pub fn arity_range(&self) -> RangeInclusive<usize> {
        match self {
            GateKind::Not | GateKind::Buf => 1..=1,
            _ => 2..=usize::MAX,
        }
    }

    pub fn accepts_arity(&self, arity: usize) -> bool {
        self.arity_range().contains(&arity)
    }

    /// Canonical `.bench` spelling.
    pub fn name(&self) -> &'static str {
        match self {
            GateKind::And => "AND",
            GateKind::Or => "OR",
            GateKind::Nand => "NAND",
            GateKind::Nor => "NOR",
            GateKind::Xor => "XOR",
            GateKind::Xnor => "XNOR",
            GateKind::Not => "NOT",
            GateKind::Buf => "BUFF",
        }
    }

    /// Parses a gate keyword applied to `arity` arguments.
    ///
    /// Keywords are case-insensitive. Wide gates may carry their fan-in as a
    /// suffix (`NAND8`); the suffix then has to agree with `arity`.
    pub fn parse(keyword: &str, arity: usize) -> Result<Self, String> {
        let upper = keyword.to_ascii_uppercase();
        let split = upper
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(upper.len());
        let (base, suffix) = upper.split_at(split);

        let kind = match base {
            "AND" => GateKind::And,
            "OR" => GateKind::Or,
            "NAND" => GateKind::Nand,
            "NOR" => GateKind::Nor,
            "XOR" => GateKind::Xor,
            "XNOR" => GateKind::Xnor,
            "NOT" | "INV" => GateKind::Not,
            "BUFF" | "BUF" => GateKind::Buf,
            _ => return Err(format!("unknown gate kind `{keyword}`")),
        };

        if !suffix.is_empty() {
            let declared: usize = suffix
                .parse()
                .map_err(|_| format!("unknown gate kind `{keyword}`"))?;
            if declared != arity {
                return Err(format!(
                    "`{keyword}` declares {declared} inputs but {arity} were given"
                ));
            }
        }

        if !kind.accepts_arity(arity) {
            return Err(kind.arity_error(arity));
        }

        Ok(kind)
    }

    pub(crate) fn arity_error(&self, arity: usize) -> String {
        match self {
            GateKind::Not | GateKind::Buf => {
                format!("{} takes exactly 1 input, got {arity}", self.name())
            }
            _ => format!("{} takes at least 2 inputs, got {arity}", self.name()),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gate {
    pub kind: GateKind,
    pub inputs: Vec<NetId>,
    pub output: NetId,
}

impl Gate {
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }
}
