//! Structural Verilog output against a named primitive-cell library.

use std::{
    collections::{BTreeSet, HashSet},
    fmt,
};

use tracing::warn;

use crate::{
    error::{Result, Warning},
    netlist::{GateKind, NetId, Netlist},
};

/// IEEE 1364-2005 reserved words, sorted.
const KEYWORDS: &[&str] = &[
    "always", "and", "assign", "automatic", "begin", "buf", "bufif0", "bufif1", "case", "casex",
    "casez", "cell", "cmos", "config", "deassign", "default", "defparam", "design", "disable",
    "edge", "else", "end", "endcase", "endconfig", "endfunction", "endgenerate", "endmodule",
    "endprimitive", "endspecify", "endtable", "endtask", "event", "for", "force", "forever",
    "fork", "function", "generate", "genvar", "highz0", "highz1", "if", "ifnone", "incdir",
    "include", "initial", "inout", "input", "instance", "integer", "join", "large", "liblist",
    "library", "localparam", "macromodule", "medium", "module", "nand", "negedge", "nmos", "nor",
    "noshowcancelled", "not", "notif0", "notif1", "or", "output", "parameter", "pmos", "posedge",
    "primitive", "pull0", "pull1", "pulldown", "pullup", "pulsestyle_ondetect",
    "pulsestyle_onevent", "rcmos", "real", "realtime", "reg", "release", "repeat", "rnmos",
    "rpmos", "rtran", "rtranif0", "rtranif1", "scalared", "showcancelled", "signed", "small",
    "specify", "specparam", "strong0", "strong1", "supply0", "supply1", "table", "task", "time",
    "tran", "tranif0", "tranif1", "tri", "tri0", "tri1", "triand", "trior", "trireg", "unsigned",
    "use", "uwire", "vectored", "wait", "wand", "weak0", "weak1", "while", "wire", "wor", "xnor",
    "xor",
];

/// The (kind, fan-in) pairs a target library provides.
///
/// Cells are instantiated positionally as `CELL inst (out, in0, in1, ...)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellLibrary {
    cells: BTreeSet<(GateKind, usize)>,
}

impl Default for CellLibrary {
    /// 2 to 4 input AND/OR/NAND/NOR, 2 input XOR/XNOR, INV and BUF.
    fn default() -> Self {
        let mut library = Self::empty();
        for kind in [GateKind::And, GateKind::Or, GateKind::Nand, GateKind::Nor] {
            for arity in 2..=4 {
                library.insert(kind, arity);
            }
        }
        library.insert(GateKind::Xor, 2);
        library.insert(GateKind::Xnor, 2);
        library.insert(GateKind::Not, 1);
        library.insert(GateKind::Buf, 1);
        library
    }
}

impl CellLibrary {
    pub fn empty() -> Self {
        Self {
            cells: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, kind: GateKind, arity: usize) {
        self.cells.insert((kind, arity));
    }

    pub fn supports(&self, kind: GateKind, arity: usize) -> bool {
        self.cells.contains(&(kind, arity))
    }

    /// Natural cell name for a kind and fan-in: `INV`, `BUF`, `NAND2`, `NAND8`, ...
    pub fn cell_name(kind: GateKind, arity: usize) -> String {
        match kind {
            GateKind::Not => String::from("INV"),
            GateKind::Buf => String::from("BUF"),
            _ => format!("{kind}{arity}"),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    head_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && KEYWORDS.binary_search(&name).is_err()
}

/// `name` as a Verilog identifier, escaped (`\name `) when it is not a plain one.
pub fn identifier(name: &str) -> String {
    if is_identifier(name) {
        name.to_owned()
    } else {
        format!("\\{name} ")
    }
}

/// A module ready to print: every name is already a valid Verilog identifier.
struct Module {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    wires: Vec<String>,
    /// `(output port, input port)` for primary inputs that are also primary outputs.
    assigns: Vec<(String, String)>,
    /// `(cell, pins)`, output pin first.
    cells: Vec<(String, Vec<String>)>,
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ports: Vec<&str> = self
            .inputs
            .iter()
            .chain(&self.outputs)
            .map(String::as_str)
            .collect();
        writeln!(f, "module {} ({});", self.name, ports.join(", "))?;
        for input in &self.inputs {
            writeln!(f, "  input {input};")?;
        }
        for output in &self.outputs {
            writeln!(f, "  output {output};")?;
        }
        for wire in &self.wires {
            writeln!(f, "  wire {wire};")?;
        }
        writeln!(f)?;

        for (output, input) in &self.assigns {
            writeln!(f, "  assign {output} = {input};")?;
        }
        for (index, (cell, pins)) in self.cells.iter().enumerate() {
            writeln!(f, "  {cell} g{index} ({});", pins.join(", "))?;
        }
        writeln!(f, "endmodule")
    }
}

/// Port name for a primary input that is also declared as an output: `{base}_out`,
/// numbered when that is taken.
fn feedthrough_port(base: &str, taken: &mut HashSet<String>) -> String {
    let port = (0..)
        .map(|n| match n {
            0 => format!("{base}_out"),
            n => format!("{base}_out_{n}"),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| unreachable!("unbounded range"));
    taken.insert(port.clone());
    port
}

/// Writes `netlist` as module `module`.
///
/// Ports are the primary inputs (key inputs included) followed by every
/// primary output; every other net becomes a `wire`. An output that is also a
/// primary input gets its own port, `{name}_out`, driven by an `assign`. A
/// gate whose kind and fan-in the library lacks is still instantiated under
/// its natural cell name, and a [`Warning::UnsupportedPrimitive`] is returned
/// for it.
pub fn write(
    netlist: &Netlist,
    module: &str,
    library: &CellLibrary,
) -> Result<(String, Vec<Warning>)> {
    let order = netlist.topological_order()?;
    let name = |id: &NetId| identifier(netlist.net_name(*id));

    let inputs: HashSet<NetId> = netlist.inputs().iter().copied().collect();
    let outputs: HashSet<NetId> = netlist.outputs().iter().copied().collect();
    let mut taken: HashSet<String> = netlist.nets().map(|(_, net)| net.name.clone()).collect();

    let mut assigns = Vec::new();
    let output_ports: Vec<String> = netlist
        .outputs()
        .iter()
        .map(|id| {
            if !inputs.contains(id) {
                return name(id);
            }
            let port = identifier(&feedthrough_port(netlist.net_name(*id), &mut taken));
            assigns.push((port.clone(), name(id)));
            port
        })
        .collect();

    let mut warnings = Vec::new();
    let cells: Vec<(String, Vec<String>)> = order
        .iter()
        .map(|gate_id| {
            let gate = netlist.gate(*gate_id);
            let cell = CellLibrary::cell_name(gate.kind, gate.arity());
            if !library.supports(gate.kind, gate.arity()) {
                let warning = Warning::UnsupportedPrimitive {
                    gate: netlist.net_name(gate.output).to_owned(),
                    cell: cell.clone(),
                };
                warn!("{warning}");
                warnings.push(warning);
            }
            let pins: Vec<String> = std::iter::once(&gate.output)
                .chain(&gate.inputs)
                .map(name)
                .collect();
            (cell, pins)
        })
        .collect();

    let module = Module {
        name: identifier(module),
        inputs: netlist.inputs().iter().map(name).collect(),
        outputs: output_ports,
        wires: netlist
            .nets()
            .filter(|(id, _)| !inputs.contains(id) && !outputs.contains(id))
            .map(|(id, _)| name(&id))
            .collect(),
        assigns,
        cells,
    };
    Ok((module.to_string(), warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::bench::{ParseOptions, parse};

    #[test]
    fn escapes_non_identifiers() {
        assert_eq!(identifier("n_12"), "n_12");
        assert_eq!(identifier("22"), "\\22 ");
        assert_eq!(identifier("a.b"), "\\a.b ");
        assert_eq!(identifier("wire"), "\\wire ");
    }

    #[test]
    fn default_library_names() {
        let lib = CellLibrary::default();
        assert!(lib.supports(GateKind::Nand, 4));
        assert!(!lib.supports(GateKind::Nand, 8));
        assert!(!lib.supports(GateKind::Xor, 3));
        assert_eq!(CellLibrary::cell_name(GateKind::Nand, 8), "NAND8");
        assert_eq!(CellLibrary::cell_name(GateKind::Not, 1), "INV");
    }

    #[test]
    fn writes_ports_wires_and_cells() {
        let text = "INPUT(a)\nINPUT(b)\nOUTPUT(y)\nc = AND(a, b)\ny = NOT(c)\n";
        let n = parse(text, &ParseOptions::default()).unwrap();
        let (verilog, warnings) = write(&n, "top", &CellLibrary::default()).unwrap();
        assert!(warnings.is_empty());
        assert!(verilog.starts_with("module top (a, b, y);\n"));
        assert!(verilog.contains("  input a;\n"));
        assert!(verilog.contains("  output y;\n"));
        assert!(verilog.contains("  wire c;\n"));
        assert!(verilog.contains("  AND2 g0 (c, a, b);\n"));
        assert!(verilog.contains("  INV g1 (y, c);\n"));
        assert!(verilog.ends_with("endmodule\n"));
    }

    #[test]
    fn unsupported_cells_are_kept_and_reported() {
        let inputs: String = (0..8).map(|i| format!("INPUT(i{i})\n")).collect();
        let args: Vec<String> = (0..8).map(|i| format!("i{i}")).collect();
        let text = format!("{inputs}OUTPUT(y)\ny = NAND({})\n", args.join(", "));
        let n = parse(&text, &ParseOptions::default()).unwrap();
        let (verilog, warnings) = write(&n, "wide", &CellLibrary::default()).unwrap();
        assert!(verilog.contains("NAND8 g0 (y, i0, i1, i2, i3, i4, i5, i6, i7);"));
        assert_eq!(
            warnings,
            vec![Warning::UnsupportedPrimitive {
                gate: String::from("y"),
                cell: String::from("NAND8"),
            }]
        );
    }

    #[test]
    fn input_that_is_also_output_keeps_its_port() {
        let text = "INPUT(a)\nINPUT(b)\nOUTPUT(a)\nOUTPUT(y)\ny = AND(a, b)\n";
        let n = parse(text, &ParseOptions::default()).unwrap();
        let (verilog, _) = write(&n, "top", &CellLibrary::default()).unwrap();
        assert!(verilog.starts_with("module top (a, b, a_out, y);\n"));
        assert!(verilog.contains("  output a_out;\n"));
        assert!(verilog.contains("  output y;\n"));
        assert!(verilog.contains("  assign a_out = a;\n"));
        assert!(verilog.contains("  AND2 g0 (y, a, b);\n"));
        assert!(!verilog.contains("wire a"));
    }

    #[test]
    fn feedthrough_port_avoids_existing_names() {
        let text = "INPUT(a)\nINPUT(b)\nOUTPUT(a)\nOUTPUT(a_out)\na_out = NOT(b)\n";
        let n = parse(text, &ParseOptions::default()).unwrap();
        let (verilog, _) = write(&n, "top", &CellLibrary::default()).unwrap();
        assert!(verilog.starts_with("module top (a, b, a_out_1, a_out);\n"));
        assert!(verilog.contains("  assign a_out_1 = a;\n"));
    }

    #[test]
    fn reserved_words_are_escaped() {
        for word in ["always", "initial", "integer", "supply0", "tri", "parameter", "case", "default"] {
            assert_eq!(identifier(word), format!("\\{word} "));
        }
        assert!(KEYWORDS.windows(2).all(|w| w[0] < w[1]));

        let text = "INPUT(always)\nINPUT(b)\nOUTPUT(initial)\ninitial = AND(always, b)\n";
        let n = parse(text, &ParseOptions::default()).unwrap();
        let (verilog, _) = write(&n, "top", &CellLibrary::default()).unwrap();
        assert!(verilog.contains("  input \\always ;\n"));
        assert!(verilog.contains("  output \\initial ;\n"));
        assert!(verilog.contains("  AND2 g0 (\\initial , \\always , b);\n"));
    }
}
