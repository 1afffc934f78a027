//! Generation mode: synthesize a workload trace on a single process.
use clap::Parser;
use log::info;

use commload::generate::{degree, partition};
use harness::{GenerateArgs, Model, WorkloadConfig};

fn run(args: &GenerateArgs) -> commload::Result<()> {
    let config: WorkloadConfig = harness::load_config(&args.config)?;
    config.validate()?;
    let seed = args.seed.or(config.seed).unwrap_or(0);

    let (trace, matrix) = match config.model {
        Model::Degree => degree::generate(&config.degree_params(), seed)?,
        Model::Partition => partition::generate(&config.partition_params()?, seed)?,
    };

    trace.save(&config.out_file)?;
    info!(
        "wrote {} events for {} ranks to {}",
        trace.events.len(),
        trace.header.procs_num,
        config.out_file.display()
    );
    if let Some(path) = &config.comm_mtx_file {
        matrix.save(path)?;
        info!("wrote comm matrix to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = GenerateArgs::parse();
    if let Err(err) = run(&args) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
