//! Plan and metadata types shared by the comparator and the executor

use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use crate::config::TimePrecision;

/// Point in time as seconds since the Unix epoch plus nanoseconds
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Timestamp {
	pub secs: i64,
	pub nanos: u32,
}

impl Timestamp {
	pub fn new(secs: i64, nanos: u32) -> Self {
		Timestamp { secs, nanos }
	}

	/// Compare two timestamps at the given resolution
	pub fn matches(&self, other: &Timestamp, precision: TimePrecision) -> bool {
		match precision {
			TimePrecision::Seconds => self.secs == other.secs,
			TimePrecision::Nanoseconds => self == other,
		}
	}
}

impl From<FileTime> for Timestamp {
	fn from(ft: FileTime) -> Self {
		Timestamp { secs: ft.unix_seconds(), nanos: ft.nanoseconds() }
	}
}

impl From<Timestamp> for FileTime {
	fn from(ts: Timestamp) -> Self {
		FileTime::from_unix_time(ts.secs, ts.nanos)
	}
}

/// Stat record of a regular file, fetched once per entry
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct FileStat {
	pub size: u64,
	pub modified: Timestamp,
	pub accessed: Timestamp,
	pub mode: u32,
}

impl FileStat {
	pub fn from_metadata(meta: &Metadata) -> Self {
		FileStat {
			size: meta.len(),
			modified: FileTime::from_last_modification_time(meta).into(),
			accessed: FileTime::from_last_access_time(meta).into(),
			mode: mode_of(meta),
		}
	}
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
	use std::os::unix::fs::MetadataExt;
	meta.mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 {
	if meta.permissions().readonly() {
		0o444
	} else {
		0o666
	}
}

/// What a directory entry is, as far as mirroring is concerned
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntryKind {
	Dir,
	File,
	/// Symlink that is not followed
	Link,
	/// Sockets, FIFOs, devices, dangling symlinks
	Other,
}

/// One listed directory entry
#[derive(Clone, PartialEq, Debug)]
pub struct DirEntry {
	pub name: OsString,
	pub kind: EntryKind,
}

impl DirEntry {
	pub fn new(name: impl Into<OsString>, kind: EntryKind) -> Self {
		DirEntry { name: name.into(), kind }
	}

	pub fn is_dir(&self) -> bool {
		self.kind == EntryKind::Dir
	}
}

/// A file scheduled for copying, with the source stat captured at plan time
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct CopyItem {
	pub path: PathBuf,
	pub stat: FileStat,
}

impl CopyItem {
	pub fn new(path: impl Into<PathBuf>, stat: FileStat) -> Self {
		CopyItem { path: path.into(), stat }
	}
}

/// The set of filesystem changes that mirror source onto destination
///
/// All paths are relative to the roots. A partial plan covers one directory
/// pair; the global plan is the union of all partial plans.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Plan {
	pub mkdir: BTreeSet<PathBuf>,
	pub rmdir: BTreeSet<PathBuf>,
	pub rmfile: BTreeSet<PathBuf>,
	pub rmlink: BTreeSet<PathBuf>,
	pub copy: BTreeSet<CopyItem>,
}

impl Plan {
	pub fn new() -> Self {
		Self::default()
	}

	/// Union every set of `other` into this plan
	pub fn merge(&mut self, other: Plan) {
		self.mkdir.extend(other.mkdir);
		self.rmdir.extend(other.rmdir);
		self.rmfile.extend(other.rmfile);
		self.rmlink.extend(other.rmlink);
		self.copy.extend(other.copy);
	}

	pub fn is_empty(&self) -> bool {
		self.action_count() == 0
	}

	pub fn action_count(&self) -> usize {
		self.mkdir.len() + self.rmdir.len() + self.rmfile.len() + self.rmlink.len() + self.copy.len()
	}

	/// Directories to remove, deepest first
	pub fn removal_order(&self) -> Vec<&Path> {
		self.rmdir.iter().rev().map(PathBuf::as_path).collect()
	}

	/// Directories to create, shallowest first
	pub fn creation_order(&self) -> Vec<&Path> {
		self.mkdir.iter().map(PathBuf::as_path).collect()
	}

	/// Files to copy, largest first
	pub fn copy_order(&self) -> Vec<&CopyItem> {
		let mut items: Vec<&CopyItem> = self.copy.iter().collect();
		items.sort_by(|a, b| b.stat.size.cmp(&a.stat.size).then_with(|| a.path.cmp(&b.path)));
		items
	}

	/// Bytes the copy phase will move
	pub fn copy_bytes(&self) -> u64 {
		self.copy.iter().map(|c| c.stat.size).sum()
	}
}

/// Counts reported by an execution run
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSummary {
	pub files_removed: usize,
	pub links_removed: usize,
	pub dirs_removed: usize,
	pub dirs_created: usize,
	pub files_copied: usize,
	pub bytes_copied: u64,
	/// Removals and copies that failed and were skipped
	pub failures: usize,
}

impl ExecuteSummary {
	pub fn is_clean(&self) -> bool {
		self.failures == 0
	}
}


// vim: ts=4
