//! Concurrent tree comparison
//!
//! The walk is driven by a queue of relative directory paths seeded with the
//! root. A dispatcher pulls items off the queue and runs one comparison worker
//! per directory under the shared [`Throttle`]. Each worker lists both sides,
//! classifies every name, pushes the subdirectories that still need walking,
//! and sends its partial [`Plan`] to the consolidator.
//!
//! The queue counts outstanding items. An item is outstanding from the moment
//! it is pushed until its worker has sent its partial plan; children are
//! always pushed before their parent is marked done, so the count reaching
//! zero means the walk is over.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::{CaseSensitivity, MirrorConfig, TimePrecision};
use crate::listing::{list_dir, stat_file};
use crate::logging::*;
use crate::path::{fold_name, RootPair};
use crate::throttle::Throttle;
use crate::types::{CopyItem, DirEntry, EntryKind, Plan};

/// Comparison knobs taken from the engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareSettings {
	pub case_sensitivity: CaseSensitivity,
	pub mtime_precision: TimePrecision,
}

impl From<&MirrorConfig> for CompareSettings {
	fn from(config: &MirrorConfig) -> Self {
		CompareSettings {
			case_sensitivity: config.case_sensitivity,
			mtime_precision: config.mtime_precision,
		}
	}
}

/// A directory waiting to be compared
///
/// `relative` names the same directory on both sides: a pair whose names
/// differ in case is never walked together. A side that is known to be
/// absent, or that is being replaced, is not listed: its listing is taken as
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkItem {
	pub relative: PathBuf,
	pub list_source: bool,
	pub list_destination: bool,
}

impl WalkItem {
	pub fn root() -> Self {
		WalkItem { relative: PathBuf::new(), list_source: true, list_destination: true }
	}

	fn both(relative: PathBuf) -> Self {
		WalkItem { relative, list_source: true, list_destination: true }
	}

	fn source_only(relative: PathBuf) -> Self {
		WalkItem { relative, list_source: true, list_destination: false }
	}

	fn destination_only(relative: PathBuf) -> Self {
		WalkItem { relative, list_source: false, list_destination: true }
	}
}

/// Work queue with a counting barrier
///
/// `None` on the channel is the end marker, sent by whoever completes the
/// last outstanding item.
#[derive(Clone)]
struct WorkQueue {
	tx: mpsc::UnboundedSender<Option<WalkItem>>,
	outstanding: Arc<AtomicUsize>,
}

impl WorkQueue {
	fn new(tx: mpsc::UnboundedSender<Option<WalkItem>>) -> Self {
		WorkQueue { tx, outstanding: Arc::new(AtomicUsize::new(0)) }
	}

	fn push(&self, item: WalkItem) {
		self.outstanding.fetch_add(1, Ordering::AcqRel);
		if self.tx.send(Some(item)).is_err() {
			self.task_done();
		}
	}

	fn task_done(&self) {
		if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
			let _ = self.tx.send(None);
		}
	}
}

/// Marks one queue item processed when dropped, even if its worker panics
struct DoneToken(WorkQueue);

impl Drop for DoneToken {
	fn drop(&mut self) {
		self.0.task_done();
	}
}

/// Walk both trees and send one partial plan per compared directory
///
/// Returns once every directory reachable from either root has been compared
/// and every worker has finished. `results` is dropped on return, so the
/// consolidator sees end of stream once the last worker's clone is gone.
pub async fn walk(
	roots: Arc<RootPair>,
	settings: CompareSettings,
	throttle: &Throttle,
	results: mpsc::UnboundedSender<Plan>,
) -> usize {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let queue = WorkQueue::new(tx);
	queue.push(WalkItem::root());

	let mut compared = 0;
	while let Some(Some(item)) = rx.recv().await {
		compared += 1;
		let token = DoneToken(queue.clone());
		let queue = queue.clone();
		let roots = roots.clone();
		let results = results.clone();

		throttle
			.dispatch(async move {
				let partial = compare_directory(&roots, &item, &queue, settings).await;
				if results.send(partial).is_err() {
					warn!("Plan consolidator is gone, dropping result for {:?}", item.relative);
				}
				drop(token);
			})
			.await;
	}

	throttle.wait_idle().await;
	debug!("Compared {} directories", compared);
	compared
}

async fn list_side(dir: &Path, enabled: bool, follow_links: bool) -> Vec<DirEntry> {
	if enabled {
		list_dir(dir, follow_links).await
	} else {
		Vec::new()
	}
}

fn index(entries: Vec<DirEntry>, sensitivity: CaseSensitivity) -> HashMap<OsString, DirEntry> {
	entries.into_iter().map(|entry| (fold_name(&entry.name, sensitivity), entry)).collect()
}

/// Compare one directory pair and build its partial plan
///
/// Source symlinks are followed, destination symlinks are not: a destination
/// link is only ever unlinked, never walked into.
async fn compare_directory(
	roots: &RootPair,
	item: &WalkItem,
	queue: &WorkQueue,
	settings: CompareSettings,
) -> Plan {
	let source_dir = roots.source_path(&item.relative);
	let destination_dir = roots.destination_path(&item.relative);

	let (source_entries, destination_entries) = tokio::join!(
		list_side(&source_dir, item.list_source, true),
		list_side(&destination_dir, item.list_destination, false),
	);
	let source = index(source_entries, settings.case_sensitivity);
	let destination = index(destination_entries, settings.case_sensitivity);

	let mut plan = Plan::new();

	for (key, src) in &source {
		let src_rel = item.relative.join(&src.name);
		match destination.get(key) {
			None => source_only(&mut plan, queue, &source_dir, src, src_rel).await,
			Some(dst) => {
				let dst_rel = item.relative.join(&dst.name);
				let both = Pair { src, dst, src_rel, dst_rel };
				present_on_both(&mut plan, queue, &source_dir, &destination_dir, both, settings)
					.await
			}
		}
	}

	for (key, dst) in &destination {
		if !source.contains_key(key) {
			destination_only(&mut plan, queue, dst, item.relative.join(&dst.name));
		}
	}

	trace!("{:?}: {} actions", item.relative, plan.action_count());
	plan
}

async fn source_only(
	plan: &mut Plan,
	queue: &WorkQueue,
	source_dir: &Path,
	src: &DirEntry,
	src_rel: PathBuf,
) {
	match src.kind {
		EntryKind::Dir => {
			queue.push(WalkItem::source_only(src_rel.clone()));
			plan.mkdir.insert(src_rel);
		}
		EntryKind::File => {
			if let Some(stat) = stat_file(&source_dir.join(&src.name)).await {
				plan.copy.insert(CopyItem::new(src_rel, stat));
			}
		}
		EntryKind::Link | EntryKind::Other => {
			trace!("Skipping special source entry {:?}", src_rel);
		}
	}
}

fn destination_only(plan: &mut Plan, queue: &WorkQueue, dst: &DirEntry, dst_rel: PathBuf) {
	match dst.kind {
		EntryKind::Dir => {
			queue.push(WalkItem::destination_only(dst_rel.clone()));
			plan.rmdir.insert(dst_rel);
		}
		EntryKind::Link => {
			plan.rmlink.insert(dst_rel);
		}
		EntryKind::File | EntryKind::Other => {
			plan.rmfile.insert(dst_rel);
		}
	}
}

/// Same name on both sides
struct Pair<'a> {
	src: &'a DirEntry,
	dst: &'a DirEntry,
	src_rel: PathBuf,
	dst_rel: PathBuf,
}

/// Remove whatever non-directory sits at the destination path
fn remove_destination_entry(plan: &mut Plan, dst: &DirEntry, dst_rel: PathBuf) {
	if dst.kind == EntryKind::Link {
		plan.rmlink.insert(dst_rel);
	} else {
		plan.rmfile.insert(dst_rel);
	}
}

async fn present_on_both(
	plan: &mut Plan,
	queue: &WorkQueue,
	source_dir: &Path,
	destination_dir: &Path,
	pair: Pair<'_>,
	settings: CompareSettings,
) {
	let Pair { src, dst, src_rel, dst_rel } = pair;

	match src.kind {
		EntryKind::Dir => {
			if dst.is_dir() && src.name == dst.name {
				queue.push(WalkItem::both(src_rel));
			} else if dst.is_dir() {
				// Matched only through case folding: the destination directory
				// is rebuilt under the source's casing
				queue.push(WalkItem::destination_only(dst_rel.clone()));
				plan.rmdir.insert(dst_rel);
				queue.push(WalkItem::source_only(src_rel.clone()));
				plan.mkdir.insert(src_rel);
			} else {
				// Destination loses; its directory is recreated from scratch
				remove_destination_entry(plan, dst, dst_rel);
				queue.push(WalkItem::source_only(src_rel.clone()));
				plan.mkdir.insert(src_rel);
			}
		}
		EntryKind::File => {
			let Some(src_stat) = stat_file(&source_dir.join(&src.name)).await else {
				return;
			};

			match dst.kind {
				EntryKind::Dir => {
					queue.push(WalkItem::destination_only(dst_rel.clone()));
					plan.rmdir.insert(dst_rel);
					plan.copy.insert(CopyItem::new(src_rel, src_stat));
				}
				EntryKind::File if src.name != dst.name => {
					remove_destination_entry(plan, dst, dst_rel);
					plan.copy.insert(CopyItem::new(src_rel, src_stat));
				}
				EntryKind::File => {
					let differs = match stat_file(&destination_dir.join(&dst.name)).await {
						Some(dst_stat) => {
							src_stat.size != dst_stat.size
								|| !src_stat
									.modified
									.matches(&dst_stat.modified, settings.mtime_precision)
						}
						None => true,
					};
					if differs {
						plan.copy.insert(CopyItem::new(src_rel, src_stat));
					}
				}
				EntryKind::Link | EntryKind::Other => {
					remove_destination_entry(plan, dst, dst_rel);
					plan.copy.insert(CopyItem::new(src_rel, src_stat));
				}
			}
		}
		EntryKind::Link | EntryKind::Other => {
			trace!("Skipping special source entry {:?}", src_rel);
		}
	}
}


// vim: ts=4
