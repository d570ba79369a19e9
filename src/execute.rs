//! Plan execution
//!
//! Phases run strictly one after another:
//! 1. create the destination root
//! 2. remove files and symlinks (throttled, failures contained)
//! 3. remove directories, deepest first (failures fatal)
//! 4. create directories, shallowest first (failures fatal)
//! 5. copy files, largest first (throttled, failures contained)

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::fs as afs;

use crate::copy::{copy_file, CopyOutcome, CopySettings};
use crate::error::MirrorError;
use crate::logging::*;
use crate::path::RootPair;
use crate::throttle::Throttle;
use crate::types::{ExecuteSummary, Plan};

#[derive(Debug, Default)]
struct Counters {
	files_removed: AtomicUsize,
	links_removed: AtomicUsize,
	files_copied: AtomicUsize,
	bytes_copied: AtomicU64,
	failures: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
	File,
	Link,
}

/// Applies one plan under a throttle
pub struct Executor<'a> {
	roots: Arc<RootPair>,
	throttle: &'a Throttle,
	copy: CopySettings,
	dry_run: bool,
}

impl<'a> Executor<'a> {
	pub fn new(roots: Arc<RootPair>, throttle: &'a Throttle, copy: CopySettings, dry_run: bool) -> Self {
		Executor { roots, throttle, copy, dry_run }
	}

	/// Apply `plan` to the destination tree
	///
	/// In dry-run mode every action is logged and nothing is touched; the
	/// returned summary is then all zeroes.
	pub async fn run(&self, plan: &Plan) -> Result<ExecuteSummary, MirrorError> {
		info!(
			"Executing {} actions from {} to {} (buffer {} bytes, depth {})",
			plan.action_count(),
			self.roots.source.display(),
			self.roots.destination.display(),
			self.copy.buffer_size,
			self.copy.channel_depth
		);

		if self.dry_run {
			self.log_plan(plan);
			return Ok(ExecuteSummary::default());
		}

		let counters = Arc::new(Counters::default());
		let mut summary = ExecuteSummary::default();

		let root = &self.roots.destination;
		if let Err(source) = afs::create_dir_all(root).await {
			return Err(MirrorError::CreateDir { path: root.clone(), source });
		}

		for path in &plan.rmfile {
			self.dispatch_removal(path.clone(), Removal::File, &counters).await;
		}
		for path in &plan.rmlink {
			self.dispatch_removal(path.clone(), Removal::Link, &counters).await;
		}
		trace!("Waiting for {} removals", self.throttle.pending());
		self.throttle.wait_idle().await;

		for relative in plan.removal_order() {
			let path = self.roots.destination_path(relative);
			if let Err(source) = afs::remove_dir(&path).await {
				return Err(MirrorError::RemoveDir { path, source });
			}
			summary.dirs_removed += 1;
		}

		for relative in plan.creation_order() {
			let path = self.roots.destination_path(relative);
			if let Err(source) = afs::create_dir_all(&path).await {
				return Err(MirrorError::CreateDir { path, source });
			}
			summary.dirs_created += 1;
		}

		for item in plan.copy_order() {
			let item = item.clone();
			let roots = self.roots.clone();
			let counters = counters.clone();
			let settings = self.copy;
			self.throttle
				.dispatch(async move {
					match copy_file(&roots, &item, settings).await {
						CopyOutcome::Copied { bytes } => {
							counters.files_copied.fetch_add(1, Ordering::Relaxed);
							counters.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
						}
						outcome => {
							debug!("Copy of {:?} failed: {:?}", item.path, outcome);
							counters.failures.fetch_add(1, Ordering::Relaxed);
						}
					}
				})
				.await;
		}
		trace!("Waiting for {} copies", self.throttle.pending());
		self.throttle.wait_idle().await;

		summary.files_removed = counters.files_removed.load(Ordering::Relaxed);
		summary.links_removed = counters.links_removed.load(Ordering::Relaxed);
		summary.files_copied = counters.files_copied.load(Ordering::Relaxed);
		summary.bytes_copied = counters.bytes_copied.load(Ordering::Relaxed);
		summary.failures = counters.failures.load(Ordering::Relaxed);

		info!(
			"Done: {} copied ({} bytes), {} files and {} links removed, {} dirs removed, {} dirs created, {} failures",
			summary.files_copied,
			summary.bytes_copied,
			summary.files_removed,
			summary.links_removed,
			summary.dirs_removed,
			summary.dirs_created,
			summary.failures
		);
		Ok(summary)
	}

	async fn dispatch_removal(&self, relative: PathBuf, kind: Removal, counters: &Arc<Counters>) {
		let path = self.roots.destination_path(&relative);
		let counters = counters.clone();
		self.throttle
			.dispatch(async move {
				match afs::remove_file(&path).await {
					Ok(()) => {
						let counter = match kind {
							Removal::File => &counters.files_removed,
							Removal::Link => &counters.links_removed,
						};
						counter.fetch_add(1, Ordering::Relaxed);
					}
					Err(e) => {
						debug!("Cannot remove {}: {}", path.display(), e);
						counters.failures.fetch_add(1, Ordering::Relaxed);
					}
				}
			})
			.await;
	}

	fn log_plan(&self, plan: &Plan) {
		for path in &plan.rmfile {
			info!("[dry-run] remove file {}", path.display());
		}
		for path in &plan.rmlink {
			info!("[dry-run] remove link {}", path.display());
		}
		for path in plan.removal_order() {
			info!("[dry-run] remove dir {}", path.display());
		}
		for path in plan.creation_order() {
			info!("[dry-run] create dir {}", path.display());
		}
		for item in plan.copy_order() {
			info!("[dry-run] copy {} ({} bytes)", item.path.display(), item.stat.size);
		}
	}
}


// vim: ts=4
