//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a client is started.
//!
//! # Tasks
//! - Maintenance sweep: removes expired cache entries and stale pending
//!   requests at the configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
