#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Writes an executable shell script standing in for the capture converter.
/// It is invoked as `<script> -o <out> <in>`.
#[cfg(unix)]
pub fn fake_converter(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}
