//! Streaming file copy
//!
//! One copy opens both files, then moves the bytes through a bounded channel
//! from a reader task to a writer task. At most `channel_depth` blocks of
//! `buffer_size` bytes are in flight. Whichever side fails stops and drops
//! its end of the channel, which stops the other side too.
//!
//! Failures never propagate out of [`copy_file`]; they are logged at debug
//! level and reported through [`CopyOutcome`].

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as afs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::config::MirrorConfig;
use crate::logging::*;
use crate::path::RootPair;
use crate::types::{CopyItem, FileStat};

/// Copy pipeline sizing and options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySettings {
	pub buffer_size: usize,
	pub channel_depth: usize,
	pub preserve_mode: bool,
}

impl From<&MirrorConfig> for CopySettings {
	fn from(config: &MirrorConfig) -> Self {
		CopySettings {
			buffer_size: config.buffer_size,
			channel_depth: config.channel_depth,
			preserve_mode: config.preserve_mode,
		}
	}
}

/// How a single file copy ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
	Copied { bytes: u64 },
	/// Source or destination could not be opened
	OpenFailed,
	ReadFailed,
	WriteFailed,
	/// Bytes were copied but timestamps or mode could not be set
	MetadataFailed,
}

enum Block {
	Data(Vec<u8>),
	End,
}

/// How one side of the pipe finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
	Complete(u64),
	Failed,
	/// The other side went away first
	PeerStopped,
}

/// Copy `item` from the source root to the destination root
pub async fn copy_file(roots: &RootPair, item: &CopyItem, settings: CopySettings) -> CopyOutcome {
	let source = roots.source_path(&item.path);
	let destination = roots.destination_path(&item.path);

	let (reader, writer) = tokio::join!(open_reader(&source), open_writer(&destination));
	// An unopened side is simply None; dropping the other one closes it
	let (reader, writer) = match (reader, writer) {
		(Some(reader), Some(writer)) => (reader, writer),
		_ => return CopyOutcome::OpenFailed,
	};

	let (tx, rx) = mpsc::channel(settings.channel_depth.max(1));
	let read_task = tokio::spawn(read_blocks(reader, tx, settings.buffer_size, source.clone()));
	let write_task = tokio::spawn(write_blocks(writer, rx, destination.clone()));
	let (read_end, write_end) = tokio::join!(read_task, write_task);

	let read_end = read_end.unwrap_or_else(|e| {
		debug!("Reader for {} panicked: {}", source.display(), e);
		StreamEnd::Failed
	});
	let write_end = write_end.unwrap_or_else(|e| {
		debug!("Writer for {} panicked: {}", destination.display(), e);
		StreamEnd::Failed
	});

	let bytes = match (read_end, write_end) {
		(StreamEnd::Complete(_), StreamEnd::Complete(written)) => written,
		(StreamEnd::Failed, _) => return CopyOutcome::ReadFailed,
		(_, StreamEnd::Failed) => return CopyOutcome::WriteFailed,
		// Neither side reported an error, yet the stream never completed
		_ => return CopyOutcome::WriteFailed,
	};

	match replicate_metadata(destination.clone(), item.stat, settings.preserve_mode).await {
		Ok(()) => CopyOutcome::Copied { bytes },
		Err(e) => {
			debug!("Cannot set metadata on {}: {}", destination.display(), e);
			CopyOutcome::MetadataFailed
		}
	}
}

async fn open_reader(path: &Path) -> Option<afs::File> {
	match afs::File::open(path).await {
		Ok(f) => Some(f),
		Err(e) => {
			debug!("Cannot open {} for reading: {}", path.display(), e);
			None
		}
	}
}

async fn open_writer(path: &Path) -> Option<afs::File> {
	match afs::File::create(path).await {
		Ok(f) => Some(f),
		Err(e) => {
			debug!("Cannot open {} for writing: {}", path.display(), e);
			None
		}
	}
}

/// Read `buffer_size` blocks until EOF, then send the end marker
///
/// On a read error the end marker is not sent; the writer sees the channel
/// close instead.
async fn read_blocks(
	mut file: afs::File,
	tx: mpsc::Sender<Block>,
	buffer_size: usize,
	path: PathBuf,
) -> StreamEnd {
	let mut total = 0u64;
	loop {
		let mut buf = vec![0u8; buffer_size];
		let n = match file.read(&mut buf).await {
			Ok(n) => n,
			Err(e) => {
				debug!("Read error on {}: {}", path.display(), e);
				return StreamEnd::Failed;
			}
		};
		if n == 0 {
			break;
		}
		buf.truncate(n);
		total += n as u64;
		if tx.send(Block::Data(buf)).await.is_err() {
			trace!("Writer stopped, abandoning read of {}", path.display());
			return StreamEnd::PeerStopped;
		}
	}

	if tx.send(Block::End).await.is_err() {
		return StreamEnd::PeerStopped;
	}
	StreamEnd::Complete(total)
}

/// Write blocks until the end marker, then flush
///
/// On a write error the receiver is closed so the reader's next send fails.
async fn write_blocks(mut file: afs::File, mut rx: mpsc::Receiver<Block>, path: PathBuf) -> StreamEnd {
	let mut written = 0u64;
	loop {
		match rx.recv().await {
			Some(Block::Data(buf)) => {
				if let Err(e) = file.write_all(&buf).await {
					debug!("Write error on {}: {}", path.display(), e);
					rx.close();
					return StreamEnd::Failed;
				}
				written += buf.len() as u64;
			}
			Some(Block::End) => break,
			None => {
				debug!("Reader stopped before end of {}", path.display());
				return StreamEnd::PeerStopped;
			}
		}
	}

	if let Err(e) = file.flush().await {
		debug!("Flush error on {}: {}", path.display(), e);
		return StreamEnd::Failed;
	}
	StreamEnd::Complete(written)
}

/// Copy access/modification times (and optionally mode) onto `path`
async fn replicate_metadata(path: PathBuf, stat: FileStat, preserve_mode: bool) -> io::Result<()> {
	tokio::task::spawn_blocking(move || {
		if preserve_mode {
			set_mode(&path, stat.mode)?;
		}
		filetime::set_file_times(&path, stat.accessed.into(), stat.modified.into())
	})
	.await
	.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
	use std::os::unix::fs::PermissionsExt;
	std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
	let mut perms = std::fs::metadata(path)?.permissions();
	perms.set_readonly(mode & 0o222 == 0);
	std::fs::set_permissions(path, perms)
}


// vim: ts=4
