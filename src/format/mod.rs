//! Textual netlist forms: `.bench` in and out, structural Verilog out.

pub mod bench;
pub mod verilog;

pub use bench::ParseOptions;
pub use verilog::CellLibrary;
