//! ISCAS `.bench` netlists.
//!
//! ```text
//! # comment
//! INPUT(a)
//! OUTPUT(y)
//! y = NAND(a, b)
//! ```

use std::{collections::HashMap, fmt, fs, path::Path};

use crate::{
    error::{Error, Result},
    lock::Key,
    netlist::{Driver, GateId, GateKind, NetId, Netlist},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Allow gate inputs that are produced later in the file.
    pub forward_references: bool,
}

/// Splits `KEYWORD(arg, arg, ...)` into the keyword and its arguments.
fn call(text: &str) -> Option<(&str, Vec<&str>)> {
    let open = text.find('(')?;
    let inner = text[open + 1..].strip_suffix(')')?;
    let keyword = text[..open].trim();
    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(str::trim).collect()
    };
    Some((keyword, args))
}

fn check_name(line: usize, name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ',' | '=' | '#'));
    if bad {
        return Err(Error::malformed(line, format!("invalid net name `{name}`")));
    }
    Ok(())
}

struct Parser {
    netlist: Netlist,
    options: ParseOptions,
    /// First line that mentioned a net before anything drove it.
    first_use: HashMap<NetId, usize>,
}

impl Parser {
    fn reference(&mut self, line: usize, name: &str) -> Result<NetId> {
        check_name(line, name)?;
        let known = self
            .netlist
            .net_by_name(name)
            .filter(|id| self.netlist.net(*id).driver != Driver::Pending);
        match known {
            Some(id) => Ok(id),
            None if self.options.forward_references => {
                let id = self.netlist.net_or_pending(name);
                self.first_use.entry(id).or_insert(line);
                Ok(id)
            }
            None => Err(Error::malformed(
                line,
                format!("net `{name}` is used before it is declared"),
            )),
        }
    }

    fn statement(&mut self, line: usize, text: &str) -> Result<()> {
        if let Some((lhs, rhs)) = text.split_once('=') {
            let output = lhs.trim();
            check_name(line, output)?;
            let (keyword, args) = call(rhs.trim())
                .ok_or_else(|| Error::malformed(line, "expected `KIND(inputs)` after `=`"))?;
            let kind =
                GateKind::parse(keyword, args.len()).map_err(|reason| Error::malformed(line, reason))?;
            let inputs = args
                .iter()
                .map(|arg| self.reference(line, arg))
                .collect::<Result<Vec<_>>>()?;
            self.netlist
                .add_gate(kind, &inputs, output)
                .map_err(|e| e.at_line(line))?;
            return Ok(());
        }

        let (keyword, args) =
            call(text).ok_or_else(|| Error::malformed(line, format!("unrecognised statement `{text}`")))?;
        let [name] = args.as_slice() else {
            return Err(Error::malformed(line, format!("{keyword} takes exactly one net")));
        };
        check_name(line, name)?;

        match keyword.to_ascii_uppercase().as_str() {
            "INPUT" => {
                self.netlist.add_input(name).map_err(|e| e.at_line(line))?;
            }
            "OUTPUT" => {
                let id = self.netlist.add_output(name).map_err(|e| e.at_line(line))?;
                if self.netlist.net(id).driver == Driver::Pending {
                    self.first_use.entry(id).or_insert(line);
                }
            }
            _ => {
                return Err(Error::malformed(
                    line,
                    format!("unknown declaration `{keyword}`"),
                ));
            }
        }
        Ok(())
    }
}

/// Parses a `.bench` netlist.
///
/// Without [`ParseOptions::forward_references`], gate inputs must already be
/// declared or produced on an earlier line. `OUTPUT` may always name a net
/// that is produced further down.
pub fn parse(text: &str, options: &ParseOptions) -> Result<Netlist> {
    let mut parser = Parser {
        netlist: Netlist::new(),
        options: *options,
        first_use: HashMap::new(),
    };

    for (index, raw) in text.lines().enumerate() {
        let content = raw.split_once('#').map_or(raw, |(code, _)| code).trim();
        if !content.is_empty() {
            parser.statement(index + 1, content)?;
        }
    }

    let Parser {
        netlist, first_use, ..
    } = parser;
    if let Some(id) = netlist.undriven().next() {
        let line = first_use.get(&id).copied().unwrap_or(0);
        return Err(Error::malformed(
            line,
            format!("net `{}` is never driven", netlist.net_name(id)),
        ));
    }
    Ok(netlist)
}

pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Netlist> {
    parse(&fs::read_to_string(path)?, options)
}

struct Bench<'a> {
    netlist: &'a Netlist,
    order: Vec<GateId>,
    key: Option<&'a Key>,
}

impl fmt::Display for Bench<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.netlist;
        writeln!(
            f,
            "# {} inputs, {} outputs, {} gates",
            n.inputs().len(),
            n.outputs().len(),
            n.gate_count()
        )?;
        if let Some(key) = self.key {
            writeln!(f, "# key={key}")?;
            writeln!(f, "# keygates: XOR is transparent at key bit 0, XNOR at key bit 1")?;
        }
        writeln!(f)?;

        for id in n.inputs() {
            writeln!(f, "INPUT({})", n.net_name(*id))?;
        }
        for id in n.outputs() {
            writeln!(f, "OUTPUT({})", n.net_name(*id))?;
        }
        writeln!(f)?;

        for gate_id in &self.order {
            let gate = n.gate(*gate_id);
            write!(f, "{} = {}(", n.net_name(gate.output), gate.kind)?;
            for (i, input) in gate.inputs.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(n.net_name(*input))?;
            }
            writeln!(f, ")")?;
        }
        Ok(())
    }
}

/// Serializes `netlist` with gates in topological order, so every net is
/// produced before it is read. `key`, when given, is recorded in a header comment.
pub fn write(netlist: &Netlist, key: Option<&Key>) -> Result<String> {
    let bench = Bench {
        netlist,
        order: netlist.topological_order()?,
        key,
    };
    Ok(bench.to_string())
}
