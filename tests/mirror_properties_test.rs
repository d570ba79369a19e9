//! End-to-end mirroring tests on real directory trees
//!
//! Each test builds a source and a destination tree in temporary directories,
//! runs plan/execute/sync, and inspects the resulting trees.

use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

use treemirror::{MirrorBuilder, Plan};

// ============================================================================
// Helper Functions
// ============================================================================

fn create_file(dir: &Path, name: &str, content: &[u8]) {
	let path = dir.join(name);
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).unwrap();
	}
	fs::write(&path, content).unwrap();
}

fn set_mtime(dir: &Path, name: &str, secs: i64) {
	filetime::set_file_mtime(dir.join(name), FileTime::from_unix_time(secs, 0)).unwrap();
}

fn read_file(dir: &Path, name: &str) -> Option<Vec<u8>> {
	fs::read(dir.join(name)).ok()
}

#[derive(Debug, PartialEq, Eq)]
enum Node {
	Dir,
	File { size: u64, mtime: i64 },
}

/// Shape of a tree: every relative path with its type, size and mtime seconds
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Node> {
	fn visit(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Node>) {
		let Ok(entries) = fs::read_dir(dir) else {
			return;
		};
		for entry in entries {
			let entry = entry.unwrap();
			let path = entry.path();
			let relative = path.strip_prefix(root).unwrap().to_path_buf();
			let meta = fs::metadata(&path).unwrap();
			if meta.is_dir() {
				out.insert(relative, Node::Dir);
				visit(root, &path, out);
			} else {
				let mtime = FileTime::from_last_modification_time(&meta).unix_seconds();
				out.insert(relative, Node::File { size: meta.len(), mtime });
			}
		}
	}

	let mut out = BTreeMap::new();
	visit(root, root, &mut out);
	out
}

fn populated_source() -> TempDir {
	let src = TempDir::new().unwrap();
	create_file(src.path(), "top.txt", b"top level");
	create_file(src.path(), "docs/readme.md", b"# readme");
	create_file(src.path(), "docs/guide/intro.md", b"intro text");
	create_file(src.path(), "docs/guide/deep/notes.txt", b"deep notes");
	create_file(src.path(), "data/blob.bin", &vec![0xAB; 300 * 1024]);
	create_file(src.path(), "data/empty", b"");
	fs::create_dir_all(src.path().join("empty_dir")).unwrap();
	src
}

// ============================================================================
// Whole-tree behaviour
// ============================================================================

#[tokio::test]
async fn test_sync_into_empty_destination() {
	let src = populated_source();
	let dst = TempDir::new().unwrap();

	let summary = treemirror::sync(src.path(), dst.path()).await.expect("sync should succeed");

	assert_eq!(snapshot(src.path()), snapshot(dst.path()));
	assert_eq!(summary.files_copied, 6);
	assert!(summary.is_clean());
	assert_eq!(read_file(dst.path(), "docs/guide/deep/notes.txt"), Some(b"deep notes".to_vec()));
}

#[tokio::test]
async fn test_sync_into_missing_destination() {
	let src = populated_source();
	let base = TempDir::new().unwrap();
	let dst = base.path().join("not/yet/here");

	treemirror::sync(src.path(), &dst).await.unwrap();
	assert_eq!(snapshot(src.path()), snapshot(&dst));
}

#[tokio::test]
async fn test_sync_reconciles_divergent_trees() {
	let src = populated_source();
	let dst = TempDir::new().unwrap();
	create_file(dst.path(), "stale.txt", b"remove me");
	create_file(dst.path(), "docs/readme.md", b"outdated readme with other size");
	create_file(dst.path(), "old_dir/a/b/c.txt", b"gone soon");
	create_file(dst.path(), "data/extra/file", b"extra");

	treemirror::sync(src.path(), dst.path()).await.unwrap();

	assert_eq!(snapshot(src.path()), snapshot(dst.path()));
	assert!(!dst.path().join("stale.txt").exists());
	assert!(!dst.path().join("old_dir").exists());
	assert_eq!(read_file(dst.path(), "docs/readme.md"), Some(b"# readme".to_vec()));
}

#[tokio::test]
async fn test_second_plan_is_empty() {
	let src = populated_source();
	let dst = TempDir::new().unwrap();
	create_file(dst.path(), "junk/x", b"x");

	treemirror::sync(src.path(), dst.path()).await.unwrap();
	let plan = treemirror::plan(src.path(), dst.path()).await.unwrap();

	assert!(plan.is_empty(), "expected empty plan after sync, got {:?}", plan);
	assert_eq!(plan, Plan::new());
}

#[tokio::test]
async fn test_second_sync_does_nothing() {
	let src = populated_source();
	let dst = TempDir::new().unwrap();

	treemirror::sync(src.path(), dst.path()).await.unwrap();
	let summary = treemirror::sync(src.path(), dst.path()).await.unwrap();

	assert_eq!(summary.files_copied, 0);
	assert_eq!(summary.files_removed, 0);
	assert_eq!(summary.dirs_created, 0);
	assert_eq!(summary.dirs_removed, 0);
}

#[tokio::test]
async fn test_plan_does_not_touch_filesystem() {
	let src = populated_source();
	let base = TempDir::new().unwrap();
	let dst = base.path().join("dst");

	let plan = treemirror::plan(src.path(), &dst).await.unwrap();
	assert!(!plan.is_empty());
	assert!(!dst.exists(), "plan must not create the destination");

	treemirror::execute(src.path(), &dst, &plan).await.unwrap();
	assert_eq!(snapshot(src.path()), snapshot(&dst));
}

// ============================================================================
// Single-entry cases
// ============================================================================

#[tokio::test]
async fn test_single_entry_cases() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "only_src.txt", b"new");
	create_file(dst.path(), "only_dst.txt", b"old");
	create_file(src.path(), "src_dir/child.txt", b"child");
	create_file(dst.path(), "dst_dir/sub/child.txt", b"child");

	let plan = treemirror::plan(src.path(), dst.path()).await.unwrap();
	assert!(plan.copy.iter().any(|c| c.path == Path::new("only_src.txt")));
	assert!(plan.copy.iter().any(|c| c.path == Path::new("src_dir/child.txt")));
	assert!(plan.rmfile.contains(Path::new("only_dst.txt")));
	assert!(plan.rmfile.contains(Path::new("dst_dir/sub/child.txt")));
	assert!(plan.mkdir.contains(Path::new("src_dir")));
	assert!(plan.rmdir.contains(Path::new("dst_dir")));
	assert!(plan.rmdir.contains(Path::new("dst_dir/sub")));
	assert!(plan.rmlink.is_empty());

	treemirror::execute(src.path(), dst.path(), &plan).await.unwrap();
	assert!(dst.path().join("only_src.txt").is_file());
	assert!(!dst.path().join("only_dst.txt").exists());
	assert!(dst.path().join("src_dir/child.txt").is_file());
	assert!(!dst.path().join("dst_dir").exists());
}

#[tokio::test]
async fn test_directory_on_source_file_on_destination() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "node/inner/leaf.txt", b"leaf");
	create_file(src.path(), "node/top.txt", b"top");
	create_file(dst.path(), "node", b"i am a file");

	treemirror::sync(src.path(), dst.path()).await.unwrap();

	assert!(dst.path().join("node").is_dir());
	assert_eq!(read_file(dst.path(), "node/inner/leaf.txt"), Some(b"leaf".to_vec()));
	assert_eq!(snapshot(src.path()), snapshot(dst.path()));
}

#[tokio::test]
async fn test_file_on_source_directory_on_destination() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "node", b"i am a file now");
	create_file(dst.path(), "node/inner/deeper/leaf.txt", b"leaf");
	create_file(dst.path(), "node/other.txt", b"other");

	let plan = treemirror::plan(src.path(), dst.path()).await.unwrap();
	assert!(plan.rmdir.contains(Path::new("node")));
	assert!(plan.copy.iter().any(|c| c.path == Path::new("node")));

	treemirror::execute(src.path(), dst.path(), &plan).await.unwrap();
	assert!(dst.path().join("node").is_file());
	assert_eq!(read_file(dst.path(), "node"), Some(b"i am a file now".to_vec()));
	assert_eq!(snapshot(src.path()), snapshot(dst.path()));
}

// ============================================================================
// Comparison rules
// ============================================================================

#[tokio::test]
async fn test_same_size_different_mtime_is_copied() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "f.txt", b"AAAA");
	create_file(dst.path(), "f.txt", b"BBBB");
	set_mtime(src.path(), "f.txt", 1_600_000_000);
	set_mtime(dst.path(), "f.txt", 1_500_000_000);

	let plan = treemirror::plan(src.path(), dst.path()).await.unwrap();
	assert_eq!(plan.copy.len(), 1);

	treemirror::execute(src.path(), dst.path(), &plan).await.unwrap();
	assert_eq!(read_file(dst.path(), "f.txt"), Some(b"AAAA".to_vec()));
	assert_eq!(snapshot(src.path()), snapshot(dst.path()));
}

#[tokio::test]
async fn test_same_size_same_mtime_is_left_alone() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "f.txt", b"AAAA");
	create_file(dst.path(), "f.txt", b"BBBB");
	set_mtime(src.path(), "f.txt", 1_600_000_000);
	set_mtime(dst.path(), "f.txt", 1_600_000_000);

	let plan = treemirror::plan(src.path(), dst.path()).await.unwrap();
	assert!(plan.is_empty());

	treemirror::sync(src.path(), dst.path()).await.unwrap();
	// Contents are never compared
	assert_eq!(read_file(dst.path(), "f.txt"), Some(b"BBBB".to_vec()));
}

#[tokio::test]
async fn test_different_size_same_mtime_is_copied() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "f.txt", b"longer content");
	create_file(dst.path(), "f.txt", b"short");
	set_mtime(src.path(), "f.txt", 1_600_000_000);
	set_mtime(dst.path(), "f.txt", 1_600_000_000);

	let plan = treemirror::plan(src.path(), dst.path()).await.unwrap();
	assert_eq!(plan.copy.len(), 1);
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_three_level_directory_ordering() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	fs::create_dir_all(src.path().join("new/mid/leaf")).unwrap();
	fs::create_dir_all(dst.path().join("old/mid/leaf")).unwrap();

	let plan = treemirror::plan(src.path(), dst.path()).await.unwrap();

	assert_eq!(
		plan.removal_order(),
		vec![Path::new("old/mid/leaf"), Path::new("old/mid"), Path::new("old")]
	);
	assert_eq!(
		plan.creation_order(),
		vec![Path::new("new"), Path::new("new/mid"), Path::new("new/mid/leaf")]
	);

	let summary = treemirror::execute(src.path(), dst.path(), &plan).await.unwrap();
	assert_eq!(summary.dirs_removed, 3);
	assert_eq!(summary.dirs_created, 3);
	assert!(dst.path().join("new/mid/leaf").is_dir());
	assert!(!dst.path().join("old").exists());
}

#[tokio::test]
async fn test_copy_order_is_largest_first() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "small", &[1; 10]);
	create_file(src.path(), "large", &[1; 10_000]);
	create_file(src.path(), "medium", &[1; 1_000]);

	let plan = treemirror::plan(src.path(), dst.path()).await.unwrap();
	let order: Vec<&Path> = plan.copy_order().iter().map(|c| c.path.as_path()).collect();
	assert_eq!(order, vec![Path::new("large"), Path::new("medium"), Path::new("small")]);
}

// ============================================================================
// Missing roots and configuration
// ============================================================================

#[tokio::test]
async fn test_missing_source_root_gives_empty_plan() {
	let base = TempDir::new().unwrap();
	let src = base.path().join("does-not-exist");
	let dst = TempDir::new().unwrap();

	let plan = treemirror::plan(&src, dst.path()).await.expect("plan must not fail");
	assert!(plan.is_empty());

	let both_missing = treemirror::plan(&src, base.path().join("also-missing")).await.unwrap();
	assert!(both_missing.is_empty());
}

#[tokio::test]
async fn test_missing_source_root_empties_destination() {
	let base = TempDir::new().unwrap();
	let src = base.path().join("does-not-exist");
	let dst = TempDir::new().unwrap();
	create_file(dst.path(), "d/e/f", b"doomed");
	create_file(dst.path(), "top.txt", b"doomed too");

	let plan = treemirror::plan(&src, dst.path()).await.unwrap();
	assert!(plan.rmdir.contains(Path::new("d")));
	assert!(plan.rmdir.contains(Path::new("d/e")));
	assert!(plan.rmfile.contains(Path::new("d/e/f")));
	assert!(plan.rmfile.contains(Path::new("top.txt")));
	assert!(plan.mkdir.is_empty());
	assert!(plan.copy.is_empty());

	let summary = treemirror::sync(&src, dst.path()).await.unwrap();
	assert_eq!(summary.files_removed, 2);
	assert_eq!(summary.dirs_removed, 2);
	assert!(dst.path().is_dir());
	assert_eq!(fs::read_dir(dst.path()).unwrap().count(), 0);
	assert!(!src.exists());
}

#[tokio::test]
async fn test_small_buffers_and_single_worker() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	let big: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
	create_file(src.path(), "big.bin", &big);
	for i in 0..40 {
		create_file(src.path(), &format!("many/d{}/f{}.txt", i % 5, i), format!("file {}", i).as_bytes());
	}

	let mirror = MirrorBuilder::new().workers(1).buffer_size(1024).channel_depth(1).build().unwrap();
	let summary = timeout(Duration::from_secs(60), mirror.sync(src.path(), dst.path()))
		.await
		.expect("sync timed out (possible deadlock)")
		.unwrap();

	assert_eq!(summary.files_copied, 41);
	assert_eq!(read_file(dst.path(), "big.bin"), Some(big));
	assert_eq!(snapshot(src.path()), snapshot(dst.path()));
}

#[tokio::test]
async fn test_wide_tree_many_workers() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	for d in 0..20 {
		for f in 0..10 {
			create_file(src.path(), &format!("d{}/s{}/f{}", d, f % 3, f), b"payload");
		}
		create_file(dst.path(), &format!("d{}/stale/x", d), b"stale");
	}

	let mirror = MirrorBuilder::new().workers(16).build().unwrap();
	timeout(Duration::from_secs(60), mirror.sync(src.path(), dst.path()))
		.await
		.expect("sync timed out (possible deadlock)")
		.unwrap();

	assert_eq!(snapshot(src.path()), snapshot(dst.path()));
	let again = mirror.plan(src.path(), dst.path()).await.unwrap();
	assert!(again.is_empty());
}

#[tokio::test]
async fn test_dry_run_mirror_changes_nothing() {
	let src = populated_source();
	let dst = TempDir::new().unwrap();
	create_file(dst.path(), "keep_me", b"still here");

	let mirror = MirrorBuilder::new().dry_run(true).build().unwrap();
	let summary = mirror.sync(src.path(), dst.path()).await.unwrap();

	assert_eq!(summary.files_copied, 0);
	assert!(dst.path().join("keep_me").exists());
	assert!(!dst.path().join("top.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_destination_symlink_is_unlinked_not_followed() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	let outside = TempDir::new().unwrap();
	create_file(outside.path(), "precious.txt", b"must survive");
	std::os::unix::fs::symlink(outside.path(), dst.path().join("escape")).unwrap();

	let summary = treemirror::sync(src.path(), dst.path()).await.unwrap();

	assert_eq!(summary.links_removed, 1);
	assert!(fs::symlink_metadata(dst.path().join("escape")).is_err());
	assert_eq!(read_file(outside.path(), "precious.txt"), Some(b"must survive".to_vec()));
}

#[cfg(unix)]
#[tokio::test]
async fn test_source_symlink_is_copied_as_target() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	create_file(src.path(), "real.txt", b"real content");
	std::os::unix::fs::symlink(src.path().join("real.txt"), src.path().join("alias.txt")).unwrap();

	treemirror::sync(src.path(), dst.path()).await.unwrap();

	let meta = fs::symlink_metadata(dst.path().join("alias.txt")).unwrap();
	assert!(meta.is_file(), "symlinks are materialized as regular files");
	assert_eq!(read_file(dst.path(), "alias.txt"), Some(b"real content".to_vec()));
}

// vim: ts=4
