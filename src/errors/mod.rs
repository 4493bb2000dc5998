//! Centralized error handling for strm-sync
//!
//! Individual file operations inside a sync run are deliberately recovered
//! in place (logged and skipped) so a run always reaches the manifest-persist
//! step; the types here cover the failures that genuinely abort a run, such
//! as an unusable state directory or a concurrent run holding the lock.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
