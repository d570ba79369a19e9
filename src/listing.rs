//! Directory listing with absorbed failures

use std::fs::FileType;
use std::io;
use std::path::Path;
use tokio::fs as afs;

use crate::logging::*;
use crate::types::{DirEntry, EntryKind, FileStat};

/// List the entries of `dir`
///
/// Any failure to open or read the directory yields an empty listing, so a
/// vanished or unreadable directory looks like an empty one. Entries that
/// cannot be typed are skipped; an error from the directory stream itself
/// discards everything read so far.
///
/// Symlinks are classified by their target when `follow_links` is set, and
/// reported as [`EntryKind::Link`] otherwise.
pub async fn list_dir(dir: &Path, follow_links: bool) -> Vec<DirEntry> {
	let mut read_dir = match afs::read_dir(dir).await {
		Ok(rd) => rd,
		Err(e) => {
			debug!("Cannot list {}: {}", dir.display(), e);
			return Vec::new();
		}
	};

	let mut steps = Vec::new();
	loop {
		let entry = match read_dir.next_entry().await {
			Ok(Some(entry)) => entry,
			Ok(None) => break,
			Err(e) => {
				steps.push(Err(e));
				break;
			}
		};

		let file_type = match entry.file_type().await {
			Ok(ft) => ft,
			Err(e) => {
				debug!("Cannot get type of {}: {}", entry.path().display(), e);
				continue;
			}
		};

		let kind = if file_type.is_symlink() {
			if follow_links {
				match afs::metadata(entry.path()).await {
					Ok(meta) => kind_of(meta.file_type()),
					Err(_) => EntryKind::Other,
				}
			} else {
				EntryKind::Link
			}
		} else {
			kind_of(file_type)
		};

		steps.push(Ok(DirEntry::new(entry.file_name(), kind)));
	}

	complete_listing(dir, steps)
}

/// All entries, or none if reading the directory failed at any point
fn complete_listing<I>(dir: &Path, steps: I) -> Vec<DirEntry>
where
	I: IntoIterator<Item = io::Result<DirEntry>>,
{
	let listed: io::Result<Vec<DirEntry>> = steps.into_iter().collect();
	listed.unwrap_or_else(|e| {
		debug!("Error reading directory {}: {}", dir.display(), e);
		Vec::new()
	})
}

fn kind_of(file_type: FileType) -> EntryKind {
	if file_type.is_dir() {
		EntryKind::Dir
	} else if file_type.is_file() {
		EntryKind::File
	} else {
		EntryKind::Other
	}
}

/// Stat a regular file, following symlinks
///
/// Returns `None` when the file cannot be stat'ed.
pub async fn stat_file(path: &Path) -> Option<FileStat> {
	match afs::metadata(path).await {
		Ok(meta) => Some(FileStat::from_metadata(&meta)),
		Err(e) => {
			debug!("Cannot stat {}: {}", path.display(), e);
			None
		}
	}
}


// vim: ts=4
