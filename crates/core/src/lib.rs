//! Domain types shared by every dreamrun crate.
//!
//! - [`run`]: the [`Run`](run::Run) record, its inputs and derived status.
//! - [`store`]: the [`RunStore`](store::RunStore) trait and an in-memory
//!   implementation.
//! - [`generation`]: fixed generation parameters and prompt validation.
//! - [`signature`]: HMAC signing for inbound provider callbacks.

pub mod error;
pub mod generation;
pub mod run;
pub mod signature;
pub mod store;
pub mod types;
