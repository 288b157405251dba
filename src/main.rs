use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};

use bgpx::cli::{self, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let (bgpx_level, other_level) = match args.verbose {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        2 => (LevelFilter::Trace, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };
    Builder::new()
        .filter(Some("bgpx"), bgpx_level)
        .filter(None, other_level)
        .init();
    info!("Logging at levels {}/{}", bgpx_level, other_level);

    cli::run(&args).await;
}
