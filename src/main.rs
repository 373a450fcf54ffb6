// Entrypoint for the CLI application.
// - Keeps `main` small: resolve configuration, build the collaborators and
//   hand them to the navigator.
// - Problems with the API or the config file are printed and the process
//   still exits normally; only setup and terminal failures return an error.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use hypernav_cli::api::HttpFetcher;
use hypernav_cli::config::Cli;
use hypernav_cli::logging;
use hypernav_cli::navigate::Navigator;
use hypernav_cli::session::SessionStore;
use hypernav_cli::ui::ConsoleTerminal;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let store = SessionStore::new(cli.config_path());
    match store.ensure_exists() {
        Ok(true) => println!("Using config file: {}", store.path().display()),
        Ok(false) => {}
        Err(err) => println!("Error creating config file: {}", err),
    }

    let api_url = cli.api_url(store.server_url());
    if let Err(err) = store.save_server_url(&api_url) {
        println!("{}", err);
    }

    let api = HttpFetcher::new().context("Failed to build HTTP client")?;
    let mut term = ConsoleTerminal::detect();
    let mut navigator = Navigator::new(&api, &store, &mut term, &api_url);

    let outcome = match cli.command {
        Some(command) => navigator.start_flow(command.mode()),
        None => navigator.step(),
    }
    .context("Terminal interaction failed")?;

    debug!(?outcome, "finished");
    Ok(())
}
