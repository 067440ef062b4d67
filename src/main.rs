use std::error::Error;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use cachesim_interconnect::config::InterconnectConfig;
use cachesim_interconnect::driver::trace::read_trace;
use cachesim_interconnect::driver::Simulation;
use clap::Parser;
use env_logger::Env;
use log::error;

/// Replays per-processor traces over a snooping bus and reports interconnect statistics.
#[derive(Parser, Debug)]
#[command(name = "cachesim")]
#[command(version = "0.1.0")]
#[command(about = "Cycle-level bus interconnect simulator", long_about = None)]
struct Args {
    /// TOML file with delays and limits
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Trace file, once per processor
    #[arg(short, long = "trace", value_name = "FILE", required = true)]
    traces: Vec<PathBuf>,

    /// Write statistics here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    stats: Option<PathBuf>,

    /// Dump the bus state every tick
    #[arg(short, long)]
    watch: bool,
}

fn main() -> ExitCode {
    // logging
    let env = Env::default()
        .filter_or("CACHESIM_LOG", "info")
        .write_style_or("CACHESIM_LOG_STYLE", "auto");
    env_logger::init_from_env(env);

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => InterconnectConfig::load(path)?,
        None => InterconnectConfig::default(),
    };
    let traces = args.traces.iter().map(|p| read_trace(p)).collect::<Result<Vec<_>, _>>()?;

    let mut sim = Simulation::new(&config, traces)?;
    sim.bus_mut().dbg.watched = args.watch;
    let cycles = sim.run()?;
    println!("finished simulation in {} cycles", cycles);

    let bus = sim.bus_mut();
    match args.stats {
        Some(path) => bus.finish(|| File::create(path)),
        None => bus.finish(|| Ok(io::stdout())),
    }
    bus.destroy();
    Ok(())
}
