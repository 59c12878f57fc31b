// Library root
// -----------
// This crate exposes the upload/poll logic behind the `hc-uploader` binary.
//
// Module responsibilities:
// - `config`: persists the API key as a small JSON file.
// - `http`: blocking HTTP with a fixed retry policy.
// - `convert`: runs the external capture-to-hc22000 converter.
// - `hashfile`: pulls the first hash line out of an hc22000 file.
// - `api`: request/response types and the `CrackingService` client.
// - `state` / `controller`: application state and the two action flows,
//   with network work on background threads.
// - `ui`: the interactive terminal menu driving the controller.
// - `logging`: logger initialization.
pub mod api;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod hashfile;
pub mod http;
pub mod logging;
pub mod state;
pub mod ui;

pub use error::{Error, Result};
