//! Error types for tree mirroring

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for mirror operations
///
/// Only structural failures surface through this type. Listing, open and
/// transfer failures are absorbed where they happen and reported through
/// logging and the execution summary.
#[derive(Debug)]
pub enum MirrorError {
	/// Destination directory could not be created
	CreateDir { path: PathBuf, source: io::Error },

	/// Destination directory could not be removed
	RemoveDir { path: PathBuf, source: io::Error },

	/// Root path could not be resolved
	InvalidRoot { path: PathBuf, message: String },

	/// Invalid configuration
	InvalidConfig { message: String },

	/// Configuration file could not be loaded
	ConfigLoad { path: PathBuf, message: String },

	/// A spawned task panicked or was cancelled
	TaskFailed { message: String },
}

impl fmt::Display for MirrorError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MirrorError::CreateDir { path, source } => {
				write!(f, "Cannot create directory {}: {}", path.display(), source)
			}
			MirrorError::RemoveDir { path, source } => {
				write!(f, "Cannot remove directory {}: {}", path.display(), source)
			}
			MirrorError::InvalidRoot { path, message } => {
				write!(f, "Invalid root {}: {}", path.display(), message)
			}
			MirrorError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			MirrorError::ConfigLoad { path, message } => {
				write!(f, "Cannot load config {}: {}", path.display(), message)
			}
			MirrorError::TaskFailed { message } => write!(f, "Task failed: {}", message),
		}
	}
}

impl Error for MirrorError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			MirrorError::CreateDir { source, .. } => Some(source),
			MirrorError::RemoveDir { source, .. } => Some(source),
			_ => None,
		}
	}
}

impl From<tokio::task::JoinError> for MirrorError {
	fn from(e: tokio::task::JoinError) -> Self {
		MirrorError::TaskFailed { message: e.to_string() }
	}
}


// vim: ts=4
