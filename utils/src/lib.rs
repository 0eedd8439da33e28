//! Shared infrastructure utilities for stylebridge.
//!
//! - **`atomic_write`**: crash-safe replacement of documents a worker process
//!   reads while the host may rewrite them.

mod atomic_write;

pub use atomic_write::atomic_write;
