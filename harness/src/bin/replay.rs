//! Replay mode: execute a recorded trace across the launched MPI ranks.
//!
//! Every rank reads the full trace file itself; rank 0 prints the elapsed
//! seconds for its own walk to stdout.
use clap::Parser;
use mpi::traits::Communicator;

use commload::replay::{ReplayEngine, ReplayOptions};
use commload::trace::Trace;
use commload_mpi::WorldTransport;
use harness::ReplayArgs;

fn run<C: Communicator>(args: &ReplayArgs, world: C) -> commload::Result<()> {
    let trace = Trace::load(&args.trace)?;
    let opts = ReplayOptions {
        progress_interval: args.progress_interval,
        abort_flag: None,
    };
    let mut engine = ReplayEngine::new(WorldTransport::new(world), opts);
    let report = engine.run(&trace)?;
    if let Some(elapsed) = report.elapsed {
        println!("{}", elapsed.as_secs_f64());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = ReplayArgs::parse();
    let universe = mpi::initialize().expect("failed to initialize MPI");
    let world = universe.world();
    if let Err(err) = run(&args, world) {
        // No notification reaches the peers: a rank blocked on a matching
        // operation for this rank will wait indefinitely.
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
