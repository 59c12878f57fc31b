// UI layer: an interactive menu built on `dialoguer`. This loop is the UI
// thread: it triggers controller actions and pumps worker results back into
// the application state on every pass. One-shot subcommands wait on a spinner
// instead.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};

use crate::controller::Controller;
use crate::state::{Action, AppState};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Main interactive menu. Runs until the user chooses "Exit".
pub fn main_menu(mut controller: Controller) -> Result<()> {
    loop {
        controller.pump();
        print_header(&controller);
        let items = vec![
            "Set API key",
            "Save API key",
            "Select handshake file",
            "Upload",
            "Fetch tasks",
            "Show status",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(3).interact()?;
        match selection {
            0 => {
                let key: String = Password::new()
                    .with_prompt("API key")
                    .allow_empty_password(true)
                    .interact()?;
                controller.set_api_key(key);
            }
            1 => {
                controller.save_api_key();
                print_log(controller.state());
            }
            2 => {
                let path: String = Input::new()
                    .with_prompt("Handshake file (.cap, .pcap, .pcapng, .hc22000)")
                    .interact_text()?;
                controller.select_file(PathBuf::from(path.trim()));
            }
            3 => {
                print_log(controller.state());
                if trigger(&mut controller, Action::Upload) {
                    println!("Upload running in the background; pick \"Show status\" for the result.");
                }
            }
            4 => {
                if trigger(&mut controller, Action::FetchTasks) {
                    println!("Fetching tasks in the background; pick \"Show status\" for the result.");
                } else {
                    print_log(controller.state());
                }
            }
            5 => {
                controller.pump();
                print_tasks(controller.state());
                print_log(controller.state());
            }
            6 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Starts `action` and returns as soon as its worker is dispatched, so the
/// menu stays responsive during network I/O. Returns whether a worker started.
pub fn trigger(controller: &mut Controller, action: Action) -> bool {
    match action {
        Action::Upload => controller.upload().is_some(),
        Action::FetchTasks => controller.fetch_tasks().is_some(),
    }
}

/// Shows a spinner until the worker for `action` finishes, applying its
/// results as they arrive.
pub fn wait_for(controller: &mut Controller, action: Action, message: &str) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    while controller.is_busy(action) {
        controller.pump();
        thread::sleep(POLL_INTERVAL);
    }
    controller.pump();

    spinner.finish_and_clear();
    Ok(())
}

/// Prints the log with each line colored by its prefix.
pub fn print_log(state: &AppState) {
    for line in state.log_lines() {
        if line.starts_with("[+]") {
            println!("{}", line.green());
        } else if line.starts_with("[-]") {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}

pub fn print_tasks(state: &AppState) {
    if !state.tasks_text().is_empty() {
        println!("{}", state.tasks_text());
    }
}

fn print_header(controller: &Controller) {
    let state = controller.state();
    let key = if state.usable_api_key().is_some() {
        "set".green()
    } else {
        "missing".red()
    };
    let file = state
        .file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "none".into());
    let mut running = Vec::new();
    if controller.is_busy(Action::Upload) {
        running.push("upload");
    }
    if controller.is_busy(Action::FetchTasks) {
        running.push("fetch");
    }
    let running = if running.is_empty() {
        "idle".to_string()
    } else {
        running.join(", ")
    };
    println!("API key: {}  |  File: {}  |  Running: {}", key, file, running);
}
