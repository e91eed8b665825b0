//! Command-line front end: lock a `.bench` netlist and write the results.
//!
//! Run with `RUST_LOG=debug` to see every inserted keygate.

use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use logic_lock::{
    FlipScope, LockConfig, Ranking,
    format::{
        CellLibrary, ParseOptions,
        bench::{self, parse_file},
        verilog,
    },
    lock, output_corruption, verify_unlocks,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "logic-lock", about = "Insert corruption-ranked keygates into a combinational netlist")]
struct Cli {
    /// Input netlist in ISCAS .bench format.
    input: PathBuf,

    /// Write the locked netlist as .bench.
    #[clap(long)]
    bench_out: Option<PathBuf>,

    /// Write the locked netlist as structural Verilog.
    #[clap(long)]
    verilog_out: Option<PathBuf>,

    /// Module name used in the Verilog output.
    #[clap(long, default_value = "locked")]
    module: String,

    /// Write a JSON report with scores, selected edges and the key.
    #[clap(long)]
    report: Option<PathBuf>,

    /// JSON file with a LockConfig. Flags below override its values.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Number of keygates to insert.
    #[clap(short, long)]
    keys: Option<usize>,

    /// Seed for vector sampling and keygate polarity.
    #[clap(long)]
    seed: Option<u64>,

    /// Scoring threads.
    #[clap(long)]
    threads: Option<usize>,

    #[clap(long, value_enum)]
    ranking: Option<Ranking>,

    #[clap(long, value_enum)]
    flip: Option<FlipScope>,

    /// Accept gate inputs produced later in the file.
    #[clap(long)]
    forward_references: bool,

    /// How many ranked candidates to log.
    #[clap(long, default_value_t = 10)]
    show: usize,
}

impl Cli {
    fn lock_config(&self) -> logic_lock::Result<LockConfig> {
        let mut config = match &self.config {
            Some(path) => LockConfig::from_json_file(path)?,
            None => LockConfig::default(),
        };
        if let Some(keys) = self.keys {
            config.key_size = keys;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if let Some(ranking) = self.ranking {
            config.ranking = ranking;
        }
        if let Some(flip) = self.flip {
            config.flip = flip;
        }
        config.forward_references |= self.forward_references;
        Ok(config)
    }
}

/// Fails the run, before anything is written, when the correct key does not unlock.
fn run(cli: &Cli) -> logic_lock::Result<ExitCode> {
    let config = cli.lock_config()?;
    let options = ParseOptions {
        forward_references: config.forward_references,
    };

    let netlist = parse_file(&cli.input, &options)?;
    let stats = netlist.stats()?;
    info!(
        "{}: {} inputs, {} outputs, {} gates, depth {}",
        cli.input.display(),
        stats.inputs,
        stats.outputs,
        netlist.gate_count(),
        stats.depth
    );

    let outcome = lock(&netlist, &config)?;
    for (rank, scored) in outcome.scores.iter().take(cli.show).enumerate() {
        let edge = scored.edge;
        info!(
            "#{:<3} {} -> {}[{}]  corruption {:.4}",
            rank + 1,
            netlist.net_name(edge.net),
            netlist.net_name(netlist.gate(edge.gate).output),
            edge.slot,
            scored.score
        );
    }
    info!("key = {}", outcome.key());

    if !verify_unlocks(&netlist, &outcome.locked, &outcome.vectors)? {
        error!("locked netlist does not reproduce the original under the correct key");
        return Ok(ExitCode::FAILURE);
    }
    if !outcome.key().is_empty() {
        let wrong = !outcome.key();
        let corruption = output_corruption(&netlist, &outcome.locked.netlist, &wrong, &outcome.vectors)?;
        info!("output corruption under inverted key: {:.4}", corruption);
    }

    let locked = &outcome.locked.netlist;
    if let Some(path) = &cli.bench_out {
        fs::write(path, bench::write(locked, Some(outcome.key()))?)?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &cli.verilog_out {
        let (text, warnings) = verilog::write(locked, &cli.module, &CellLibrary::default())?;
        fs::write(path, text)?;
        info!("wrote {} ({} unsupported cells)", path.display(), warnings.len());
    }
    if let Some(path) = &cli.report {
        let report = outcome.report(&netlist)?;
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!("wrote {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
