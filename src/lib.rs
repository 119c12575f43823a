//! Self-hosted update checking for locally installed components.
//!
//! Components register once with an entry path and a manifest location; the
//! resolver then answers "what needs updating?" by fetching each component's
//! manifest, caching the result for a day, and comparing versions against
//! what is installed.

pub mod config;
pub mod host;
pub mod sanitize;
pub mod update;
