use std::path::{Path, PathBuf};

/// Which user action produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Upload,
    FetchTasks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Append one line to the log.
    Log(String),
    /// Replace the tasks panel.
    Tasks(String),
}

/// A worker result on its way back to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub action: Action,
    pub seq: u64,
    pub update: StatusUpdate,
}

/// Everything the UI renders. Only the UI thread mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    api_key: String,
    file_path: Option<PathBuf>,
    log_text: String,
    tasks_text: String,
    tasks_seq: u64,
}

impl AppState {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The key if it has any non-whitespace content.
    pub fn usable_api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty()).then_some(key)
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = key.into();
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn set_file_path(&mut self, path: Option<PathBuf>) {
        self.file_path = path;
    }

    pub fn log_text(&self) -> &str {
        &self.log_text
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log_text.lines()
    }

    pub fn append_log(&mut self, line: impl AsRef<str>) {
        self.log_text.push_str(line.as_ref());
        self.log_text.push('\n');
    }

    pub fn clear_log(&mut self) {
        self.log_text.clear();
    }

    pub fn tasks_text(&self) -> &str {
        &self.tasks_text
    }

    /// Clears the panel and marks `seq` as the newest fetch.
    pub fn begin_tasks(&mut self, seq: u64) {
        self.tasks_text.clear();
        self.tasks_seq = self.tasks_seq.max(seq);
    }

    /// Replaces the panel unless a newer fetch has already started.
    /// Returns whether the text was applied.
    pub fn set_tasks_text(&mut self, seq: u64, text: impl Into<String>) -> bool {
        if seq < self.tasks_seq {
            return false;
        }
        self.tasks_seq = seq;
        self.tasks_text = text.into();
        true
    }

    pub fn apply(&mut self, event: UiEvent) -> bool {
        match event.update {
            StatusUpdate::Log(line) => {
                self.append_log(line);
                true
            }
            StatusUpdate::Tasks(text) => self.set_tasks_text(event.seq, text),
        }
    }
}
