mod cli;
mod config;
mod db;
mod logging;
mod report;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use config::{Config, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load()?;
    let settings = Settings::resolve(&cli, &config)?;

    if cli.write_config {
        let path = settings.to_config(&config).save()?;
        eprintln!("Config written to {}", path.display());
    }

    // The connection is closed before anything is printed.
    let snapshot = db::fetch_schema(&settings.connect).await;

    print!(
        "{}",
        report::render_output(snapshot.as_ref(), cli.format, &settings.compare_with)?
    );

    Ok(())
}
