//! strm-sync: converge a library of `.strm` pointer files with an extended
//! M3U playlist.
//!
//! The crate parses the playlist, classifies every entry as live channel,
//! movie, or episode, filters it through user allow rules, derives a stable
//! on-disk layout, and reconciles the filesystem against the previous run's
//! manifest. See [`sync::SyncEngine`] for the entry point.

pub mod allowlist;
pub mod artwork;
pub mod classify;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod paths;
pub mod playlist;
pub mod sync;
