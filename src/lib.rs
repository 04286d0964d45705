//! shellcache - offline app-shell cache worker
//!
//! Pre-caches an app's static assets and CDN libraries under a named cache
//! generation, purges older generations on activation, and answers requests
//! cache-first with a network fallback, leaving live-data API hosts alone.

pub mod cli;
pub mod config;
pub mod error;
pub mod journal;
pub mod net;
pub mod store;
pub mod ui;
pub mod worker;

pub use error::{ShellcacheError, ShellcacheResult};
