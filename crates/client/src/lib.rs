//! `dreamrun-client` library crate.
//!
//! HTTP client for the Dreamrun API and the status poller that waits for a
//! run's image. The command-line entrypoint lives in `main.rs`.

pub mod api;
pub mod poller;

pub use api::{ClientError, DreamrunClient};
pub use poller::{observe, spawn, PollError, PollHandle, StatusSource};
