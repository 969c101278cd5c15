//! Request handlers.
//!
//! Handlers delegate to the submitter or the run store held in
//! [`AppState`](crate::state::AppState) and map errors via
//! [`AppError`](crate::error::AppError).

pub mod runs;
pub mod webhook;
