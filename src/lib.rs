//! # treemirror - One-way Concurrent Directory Mirroring
//!
//! treemirror makes a destination directory tree mirror a source tree:
//! missing directories and files are created, entries absent from the source
//! are removed, and files whose size or modification time differ are copied
//! again in full. Contents are never compared.
//!
//! Work happens in two phases. [`plan`] walks both trees concurrently and
//! returns a [`Plan`] without touching the disk; [`execute`] applies it.
//! [`sync`] does both.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let summary = treemirror::sync("./photos", "/mnt/backup/photos").await?;
//!     println!("Copied {} files", summary.files_copied);
//!     Ok(())
//! }
//! ```
//!
//! ## Using the Builder Pattern
//!
//! ```rust,ignore
//! use treemirror::MirrorBuilder;
//!
//! let mirror = MirrorBuilder::new().workers(8).channel_depth(16).build()?;
//! let plan = mirror.plan(src, dst).await?;
//! println!("{} actions", plan.action_count());
//! mirror.execute(src, dst, &plan).await?;
//! ```
//!
//! Failures to list a directory, open a file, or move its bytes are logged
//! and skipped. Only failing to create or remove a directory aborts a run.

pub mod compare;
pub mod config;
pub mod consolidate;
pub mod copy;
pub mod engine;
pub mod error;
pub mod execute;
pub mod listing;
pub mod logging;
pub mod path;
pub mod throttle;
pub mod types;

use std::path::Path;

pub use config::{CaseSensitivity, MirrorConfig, TimePrecision};
pub use engine::{Mirror, MirrorBuilder};
pub use error::MirrorError;
pub use types::{CopyItem, ExecuteSummary, FileStat, Plan, Timestamp};

/// Mirror `source` onto `destination` with the default configuration
pub async fn sync(
	source: impl AsRef<Path>,
	destination: impl AsRef<Path>,
) -> Result<ExecuteSummary, MirrorError> {
	Mirror::new(MirrorConfig::default())?.sync(source.as_ref(), destination.as_ref()).await
}

/// Compute the plan for mirroring `source` onto `destination`
pub async fn plan(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<Plan, MirrorError> {
	Mirror::new(MirrorConfig::default())?.plan(source.as_ref(), destination.as_ref()).await
}

/// Apply a plan computed by [`plan`]
pub async fn execute(
	source: impl AsRef<Path>,
	destination: impl AsRef<Path>,
	plan: &Plan,
) -> Result<ExecuteSummary, MirrorError> {
	Mirror::new(MirrorConfig::default())?
		.execute(source.as_ref(), destination.as_ref(), plan)
		.await
}

// vim: ts=4
