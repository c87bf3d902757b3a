//! Configuration for imgbatch.
//!
//! Two separate things are configured here:
//!
//! - [`Input`]: what to do in one batch (which images, and how to transform
//!   them). Read from a JSON or YAML document, then validated into a
//!   [`Batch`].
//! - [`Settings`]: where things live (stores, dataset, HTTP behaviour).
//!   Layered with figment: built-in defaults, then a config file, then
//!   `IMGBATCH_`-prefixed environment variables, then whatever the caller
//!   merges on top (CLI flags).

pub mod error;
mod input;
mod settings;

pub use crate::input::{Batch, DEFAULT_CONCURRENCY, Input, SourceEntry};
pub use crate::settings::{DatasetSettings, HttpSettings, S3Settings, Settings, StorageSettings, StoreBackend};
pub use figment::Figment;

/// Application name used for platform directories and the config file stem.
pub const APP_NAME: &str = "imgbatch";
