//! Environment file synchronization library.
//!
//! This library keeps an actual `.env` file in step with a git-tracked sample
//! file. Variables the sample defines but the actual file lacks are appended to
//! the actual file, below a timestamped marker comment. Values already present
//! in the actual file are never changed, and nothing is ever removed.
//!
//! # Features
//!
//! - **Append-only**: the target file is only ever appended to
//! - **Pluggable format**: parsing and serialization sit behind [`codec::EnvCodec`]
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use envsync::sync::{EnvSync, EnvSyncOptions};
//!
//! let added = EnvSync::sync_with_options(EnvSyncOptions::default()).unwrap();
//! for (key, value) in added.iter() {
//!     println!("{key}={value}");
//! }
//! ```

pub mod codec;
pub mod map;
pub mod parse;
pub mod sync;
