// Capture conversion: shells out to hcxpcapngtool (or a configured
// replacement) to turn .cap/.pcap/.pcapng captures into hc22000 hash lines.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::error::{Error, Result};

pub const DEFAULT_CONVERTER: &str = "hcxpcapngtool";
pub const HC22000_EXTENSION: &str = "hc22000";

/// How an input file must be handled before its hash can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Raw capture that needs conversion first.
    Capture,
    /// Already in hc22000 format.
    Hashes,
}

impl InputKind {
    /// Classifies by extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self> {
        // Text after the last dot of the file name, so a bare `.hc22000`
        // counts as an hc22000 file.
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "cap" | "pcap" | "pcapng" => Ok(InputKind::Capture),
            HC22000_EXTENSION => Ok(InputKind::Hashes),
            _ => Err(Error::UnsupportedExtension(ext)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureConverter {
    tool: PathBuf,
}

impl Default for CaptureConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER)
    }
}

impl CaptureConverter {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    /// `capture.pcapng` converts into `capture.pcapng.hc22000`.
    pub fn output_path_for(input: &Path) -> PathBuf {
        let mut out: OsString = input.as_os_str().to_owned();
        out.push(".");
        out.push(HC22000_EXTENSION);
        PathBuf::from(out)
    }

    /// Runs the converter and returns the path of the non-empty hash file.
    pub fn convert(&self, input: &Path) -> Result<PathBuf> {
        if !input.exists() {
            return Err(Error::Conversion(format!(
                "file not found: {}",
                input.display()
            )));
        }

        let output_path = Self::output_path_for(input);
        // A leftover file would mask a conversion that produced nothing.
        match fs::remove_file(&output_path) {
            Ok(()) => debug!("Removed stale output {:?}", output_path),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(Error::io(&output_path, err)),
        }

        info!("Converting {:?} with {:?}", input, self.tool);
        let output = Command::new(&self.tool)
            .arg("-o")
            .arg(&output_path)
            .arg(input)
            .output()
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    Error::Conversion(format!("{} not found", self.tool.display()))
                } else {
                    Error::Conversion(format!("failed to run {}: {err}", self.tool.display()))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Conversion(format!(
                "{} exited with {}: {}",
                self.tool.display(),
                output.status,
                stderr.trim()
            )));
        }

        let produced = fs::metadata(&output_path)
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(Error::Conversion("conversion produced no output".into()));
        }

        info!("Converted {:?} into {:?}", input, output_path);
        Ok(output_path)
    }
}
