use anyhow::Result;
use clap::Parser;
use mmsplits::cli::Cli;
use mmsplits::infra::logging;

fn main() -> Result<()> {
    logging::init("mmsplits=info");

    let cli = Cli::parse();
    cli.run()
}
