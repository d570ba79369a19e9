//! Plan consolidation
//!
//! One task owns the global plan. Comparison workers hand their partial plans
//! over a channel; nothing else ever touches the global plan, so it needs no
//! lock. The stream ends when every sender has been dropped.

use tokio::sync::mpsc;

use crate::logging::*;
use crate::types::Plan;

/// Merge partial plans until end of stream and return the global plan
pub async fn consolidate(mut results: mpsc::UnboundedReceiver<Plan>) -> Plan {
	let mut global = Plan::new();
	let mut partials = 0usize;

	while let Some(partial) = results.recv().await {
		global.merge(partial);
		partials += 1;
	}

	debug!(
		"Consolidated {} partial plans: {} mkdir, {} rmdir, {} rmfile, {} rmlink, {} copy",
		partials,
		global.mkdir.len(),
		global.rmdir.len(),
		global.rmfile.len(),
		global.rmlink.len(),
		global.copy.len()
	);
	global
}


// vim: ts=4
