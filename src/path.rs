//! Root path normalization and entry name folding

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

use crate::config::CaseSensitivity;
use crate::error::MirrorError;

/// Normalized (source, destination) roots every relative path is joined onto
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPair {
	pub source: PathBuf,
	pub destination: PathBuf,
}

impl RootPair {
	pub fn new(source: &Path, destination: &Path) -> Result<Self, MirrorError> {
		Ok(RootPair { source: normalize_root(source)?, destination: normalize_root(destination)? })
	}

	pub fn source_path(&self, relative: &Path) -> PathBuf {
		join_relative(&self.source, relative)
	}

	pub fn destination_path(&self, relative: &Path) -> PathBuf {
		join_relative(&self.destination, relative)
	}
}

fn join_relative(root: &Path, relative: &Path) -> PathBuf {
	if relative.as_os_str().is_empty() {
		root.to_path_buf()
	} else {
		root.join(relative)
	}
}

/// Canonical form of a root path
///
/// Relative roots are anchored at the current directory, then the path is
/// normalized lexically (no symlink resolution, no filesystem access). On
/// case-insensitive platforms the result is case folded.
pub fn normalize_root(path: &Path) -> Result<PathBuf, MirrorError> {
	if path.as_os_str().is_empty() {
		return Err(MirrorError::InvalidRoot {
			path: path.to_path_buf(),
			message: "empty path".to_string(),
		});
	}

	let absolute = if path.is_absolute() {
		path.to_path_buf()
	} else {
		let cwd = std::env::current_dir().map_err(|e| MirrorError::InvalidRoot {
			path: path.to_path_buf(),
			message: format!("cannot determine current directory: {}", e),
		})?;
		cwd.join(path)
	};

	let normal = normalize_lexically(&absolute);
	if cfg!(windows) {
		Ok(PathBuf::from(fold(normal.as_os_str())))
	} else {
		Ok(normal)
	}
}

/// Collapse `.` and `..` segments without touching the filesystem
///
/// `..` at the root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
	let mut out = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				let at_root = matches!(
					out.components().next_back(),
					None | Some(Component::RootDir) | Some(Component::Prefix(_))
				);
				if at_root {
					if !path.has_root() {
						out.push("..");
					}
				} else if out.ends_with("..") {
					out.push("..");
				} else {
					out.pop();
				}
			}
			other => out.push(other.as_os_str()),
		}
	}
	if out.as_os_str().is_empty() {
		out.push(".");
	}
	out
}

/// Key under which an entry name is matched against the other side
pub fn fold_name(name: &OsStr, sensitivity: CaseSensitivity) -> OsString {
	if sensitivity.folds() {
		fold(name)
	} else {
		name.to_os_string()
	}
}

fn fold(name: &OsStr) -> OsString {
	match name.to_str() {
		Some(s) => OsString::from(s.to_lowercase()),
		// Not valid unicode: lossy folding could merge unrelated names
		None => name.to_os_string(),
	}
}


// vim: ts=4
