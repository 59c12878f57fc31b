// Orchestrates the upload and fetch-tasks flows. File preparation runs on the
// calling (UI) thread; network calls run on one worker thread per action and
// report back through a channel drained by `pump`.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use crate::api::{ApiResponse, CrackingService, Task};
use crate::config::{Config, ConfigStore};
use crate::convert::{CaptureConverter, InputKind};
use crate::error::{Error, Result};
use crate::hashfile::require_first_hash;
use crate::state::{Action, AppState, StatusUpdate, UiEvent};

pub const NO_TASKS_TEXT: &str = "No tasks found.";
const TASK_SEPARATOR_WIDTH: usize = 40;

/// Set while a worker for one action kind is running.
#[derive(Clone, Default)]
struct BusyFlag(Arc<Mutex<bool>>);

impl BusyFlag {
    fn try_acquire(&self) -> Option<BusyGuard> {
        let mut busy = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *busy {
            return None;
        }
        *busy = true;
        Some(BusyGuard(self.0.clone()))
    }

    fn is_set(&self) -> bool {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears its flag when dropped, including when the worker panics.
struct BusyGuard(Arc<Mutex<bool>>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

pub struct Controller {
    state: AppState,
    service: Arc<dyn CrackingService>,
    converter: CaptureConverter,
    store: ConfigStore,
    events_tx: Sender<UiEvent>,
    events_rx: Receiver<UiEvent>,
    last_seq: u64,
    upload_busy: BusyFlag,
    fetch_busy: BusyFlag,
}

impl Controller {
    /// Builds the controller and loads the stored API key.
    pub fn new(
        service: Arc<dyn CrackingService>,
        converter: CaptureConverter,
        store: ConfigStore,
    ) -> Self {
        let config = store.load();
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            state: AppState::new(config.api_key),
            service,
            converter,
            store,
            events_tx,
            events_rx,
            last_seq: 0,
            upload_busy: BusyFlag::default(),
            fetch_busy: BusyFlag::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.state.set_api_key(key);
    }

    pub fn select_file(&mut self, path: impl Into<PathBuf>) {
        self.state.set_file_path(Some(path.into()));
    }

    /// Overwrites the config file with the current key.
    pub fn save_api_key(&mut self) {
        let config = Config {
            api_key: self.state.api_key().trim().to_string(),
        };
        match self.store.save(&config) {
            Ok(()) => self.state.append_log("[*] API key saved."),
            Err(err) => self.report(&err),
        }
    }

    pub fn is_busy(&self, action: Action) -> bool {
        match action {
            Action::Upload => self.upload_busy.is_set(),
            Action::FetchTasks => self.fetch_busy.is_set(),
        }
    }

    /// Applies pending worker results to the state. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            debug!("Applying {:?} #{}", event.action, event.seq);
            if self.state.apply(event) {
                applied += 1;
            } else {
                debug!("Discarded stale tasks update");
            }
        }
        applied
    }

    /// Validates input, prepares the hash and submits it on a worker thread.
    /// Returns `None` when the action stopped before dispatch; the reason is
    /// in the log.
    pub fn upload(&mut self) -> Option<JoinHandle<()>> {
        self.state.clear_log();
        let api_key = match self.require_api_key() {
            Ok(key) => key,
            Err(err) => {
                self.report(&err);
                return None;
            }
        };
        let Some(guard) = self.upload_busy.try_acquire() else {
            self.state.append_log("[-] Upload already in progress.");
            return None;
        };
        let hashes = match self.prepare_hashes() {
            Ok(hashes) => hashes,
            Err(err) => {
                self.report(&err);
                return None;
            }
        };

        let seq = self.next_seq();
        let service = Arc::clone(&self.service);
        let tx = self.events_tx.clone();
        info!("Dispatching upload #{}", seq);
        Some(thread::spawn(move || {
            let _guard = guard;
            let result = service
                .submit_hashes(&api_key, &hashes)
                .and_then(ApiResponse::into_result);
            let line = match result {
                Ok(_) => "[+] Hashes uploaded successfully.".to_string(),
                Err(Error::ApiLogic(msg)) => format!("[-] Upload error: {msg}"),
                Err(err) => {
                    warn!("Upload #{} failed: {}", seq, err);
                    format!("[-] Upload failed: {err}")
                }
            };
            let _ = tx.send(UiEvent {
                action: Action::Upload,
                seq,
                update: StatusUpdate::Log(line),
            });
        }))
    }

    /// Fetches the task list on a worker thread.
    pub fn fetch_tasks(&mut self) -> Option<JoinHandle<()>> {
        let api_key = match self.require_api_key() {
            Ok(key) => key,
            Err(err) => {
                self.report(&err);
                return None;
            }
        };
        let Some(guard) = self.fetch_busy.try_acquire() else {
            self.state.append_log("[-] Task fetch already in progress.");
            return None;
        };

        let seq = self.next_seq();
        self.state.begin_tasks(seq);

        let service = Arc::clone(&self.service);
        let tx = self.events_tx.clone();
        info!("Dispatching task fetch #{}", seq);
        Some(thread::spawn(move || {
            let _guard = guard;
            let result = service
                .list_tasks(&api_key)
                .and_then(ApiResponse::into_result);
            let update = match result {
                Ok(resp) => StatusUpdate::Tasks(render_tasks(&resp.tasks)),
                Err(Error::ApiLogic(msg)) => {
                    StatusUpdate::Log(format!("[-] Error fetching tasks: {msg}"))
                }
                Err(err) => {
                    warn!("Task fetch #{} failed: {}", seq, err);
                    StatusUpdate::Log(format!("[-] Fetch tasks failed: {err}"))
                }
            };
            let _ = tx.send(UiEvent {
                action: Action::FetchTasks,
                seq,
                update,
            });
        }))
    }

    /// Resolves the selected file to exactly one hash, converting captures
    /// first.
    pub fn prepare_hashes(&mut self) -> Result<Vec<String>> {
        let path = self
            .state
            .file_path()
            .ok_or(Error::MissingFile)?
            .to_path_buf();

        let hash_file = match InputKind::from_path(&path)? {
            InputKind::Capture => {
                self.state
                    .append_log("[*] Converting capture file to hc22000 format...");
                self.converter.convert(&path)?
            }
            InputKind::Hashes => path,
        };

        Ok(vec![require_first_hash(&hash_file)?])
    }

    fn require_api_key(&self) -> Result<String> {
        self.state
            .usable_api_key()
            .map(str::to_owned)
            .ok_or(Error::MissingApiKey)
    }

    fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    fn report(&mut self, err: &Error) {
        debug!("Action stopped: {:?}", err);
        self.state.append_log(format!("[-] {err}"));
    }
}

/// Renders tasks as text blocks, or the fixed empty message.
pub fn render_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return NO_TASKS_TEXT.to_string();
    }
    let separator = "-".repeat(TASK_SEPARATOR_WIDTH);
    tasks
        .iter()
        .map(|t| {
            format!(
                "Task ID: {}\nStatus: {}\nCracked: {}\nPassword: {}\n{}\n",
                t.task_id, t.status, t.cracked, t.password, separator
            )
        })
        .collect()
}
