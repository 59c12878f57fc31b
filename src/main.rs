// Entrypoint for the CLI application.
// - Parses options, sets up logging and builds the controller.
// - Without a subcommand it hands over to the interactive menu; subcommands
//   run one action, wait for it and print the outcome.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hc_uploader::api::{ApiClient, DEFAULT_API_URL};
use hc_uploader::config::ConfigStore;
use hc_uploader::controller::Controller;
use hc_uploader::convert::{CaptureConverter, DEFAULT_CONVERTER};
use hc_uploader::logging::{self, LogDestination};
use hc_uploader::state::Action;
use hc_uploader::ui;

#[derive(Debug, Parser)]
#[command(
    name = "hc-uploader",
    version,
    about = "Upload WPA handshakes to a cracking service and poll task status"
)]
struct Cli {
    /// Config file holding the API key
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service endpoint
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Capture converter executable
    #[arg(long, default_value = DEFAULT_CONVERTER)]
    converter: PathBuf,

    /// Log file path
    #[arg(long, default_value = "hc-uploader.log")]
    log_file: PathBuf,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store the API key and exit
    SetKey { key: String },
    /// Upload the first hash of a capture or hc22000 file
    Upload { file: PathBuf },
    /// Print the task list
    Tasks,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let destination = if cli.command.is_some() {
        LogDestination::Both
    } else {
        LogDestination::File
    };
    logging::initialize(destination, &cli.log_file, cli.verbose);

    let store = cli
        .config
        .map(ConfigStore::new)
        .unwrap_or_else(ConfigStore::default_location);
    let api = ApiClient::new(&cli.api_url).context("Failed to build API client")?;
    let mut controller = Controller::new(
        Arc::new(api),
        CaptureConverter::new(cli.converter),
        store,
    );

    match cli.command {
        None => ui::main_menu(controller)?,
        Some(Command::SetKey { key }) => {
            controller.set_api_key(key);
            controller.save_api_key();
            ui::print_log(controller.state());
        }
        Some(Command::Upload { file }) => {
            controller.select_file(file);
            if controller.upload().is_some() {
                ui::wait_for(&mut controller, Action::Upload, "Uploading...")?;
            }
            ui::print_log(controller.state());
        }
        Some(Command::Tasks) => {
            if controller.fetch_tasks().is_some() {
                ui::wait_for(&mut controller, Action::FetchTasks, "Fetching tasks...")?;
            }
            ui::print_tasks(controller.state());
            ui::print_log(controller.state());
        }
    }
    Ok(())
}
