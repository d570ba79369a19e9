//! The mirroring engine
//!
//! A [`Mirror`] owns a validated [`MirrorConfig`]. Every `plan` and `execute`
//! call runs under its own [`Throttle`], so concurrent calls on one mirror (or
//! its clones) never wait on each other's tasks. Within `sync` the two phases
//! never overlap: execution starts only after the walk has fully finished.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::compare::{walk, CompareSettings};
use crate::config::{CaseSensitivity, MirrorConfig, TimePrecision};
use crate::consolidate::consolidate;
use crate::copy::CopySettings;
use crate::error::MirrorError;
use crate::execute::Executor;
use crate::logging::*;
use crate::path::RootPair;
use crate::throttle::Throttle;
use crate::types::{ExecuteSummary, Plan};

/// One-way directory mirror
#[derive(Debug, Clone)]
pub struct Mirror {
	config: MirrorConfig,
}

impl Mirror {
	pub fn new(config: MirrorConfig) -> Result<Self, MirrorError> {
		config.validate()?;
		Ok(Mirror { config })
	}

	pub fn config(&self) -> &MirrorConfig {
		&self.config
	}

	/// Compute the changes that would make `destination` mirror `source`
	///
	/// Read-only: nothing on disk is modified.
	pub async fn plan(&self, source: &Path, destination: &Path) -> Result<Plan, MirrorError> {
		let roots = Arc::new(RootPair::new(source, destination)?);
		let throttle = Throttle::new(self.config.workers);
		info!(
			"Planning {} -> {} ({} workers)",
			roots.source.display(),
			roots.destination.display(),
			throttle.capacity()
		);

		let (results_tx, results_rx) = mpsc::unbounded_channel();
		let consolidator = tokio::spawn(consolidate(results_rx));

		walk(roots, CompareSettings::from(&self.config), &throttle, results_tx).await;

		let plan = consolidator.await?;
		info!(
			"Plan: {} to copy ({} bytes), {} files, {} links and {} dirs to remove, {} dirs to create",
			plan.copy.len(),
			plan.copy_bytes(),
			plan.rmfile.len(),
			plan.rmlink.len(),
			plan.rmdir.len(),
			plan.mkdir.len()
		);
		Ok(plan)
	}

	/// Apply a previously computed plan
	pub async fn execute(
		&self,
		source: &Path,
		destination: &Path,
		plan: &Plan,
	) -> Result<ExecuteSummary, MirrorError> {
		let roots = Arc::new(RootPair::new(source, destination)?);
		let throttle = Throttle::new(self.config.workers);
		debug!(
			"Up to {} copies in flight, at most {} bytes buffered each",
			throttle.capacity(),
			self.config.copy_memory_bound()
		);
		let executor = Executor::new(
			roots,
			&throttle,
			CopySettings::from(&self.config),
			self.config.dry_run,
		);
		executor.run(plan).await
	}

	/// Plan, then execute
	pub async fn sync(&self, source: &Path, destination: &Path) -> Result<ExecuteSummary, MirrorError> {
		let plan = self.plan(source, destination).await?;
		self.execute(source, destination, &plan).await
	}
}

/// Fluent construction of a [`Mirror`]
///
/// ```rust,ignore
/// let mirror = MirrorBuilder::new().workers(8).buffer_size(1 << 20).build()?;
/// mirror.sync(Path::new("src"), Path::new("dst")).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MirrorBuilder {
	config: MirrorConfig,
}

impl MirrorBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Start from an existing configuration
	pub fn from_config(config: MirrorConfig) -> Self {
		MirrorBuilder { config }
	}

	pub fn workers(mut self, workers: usize) -> Self {
		self.config.workers = workers;
		self
	}

	pub fn buffer_size(mut self, bytes: usize) -> Self {
		self.config.buffer_size = bytes;
		self
	}

	pub fn channel_depth(mut self, depth: usize) -> Self {
		self.config.channel_depth = depth;
		self
	}

	pub fn preserve_mode(mut self, enabled: bool) -> Self {
		self.config.preserve_mode = enabled;
		self
	}

	pub fn case_sensitivity(mut self, sensitivity: CaseSensitivity) -> Self {
		self.config.case_sensitivity = sensitivity;
		self
	}

	pub fn mtime_precision(mut self, precision: TimePrecision) -> Self {
		self.config.mtime_precision = precision;
		self
	}

	pub fn dry_run(mut self, enabled: bool) -> Self {
		self.config.dry_run = enabled;
		self
	}

	pub fn config(&self) -> &MirrorConfig {
		&self.config
	}

	pub fn build(self) -> Result<Mirror, MirrorError> {
		Mirror::new(self.config)
	}
}


// vim: ts=4
