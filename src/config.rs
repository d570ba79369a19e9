//! Engine configuration
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (`MirrorConfig::default()`)
//! 2. Config file (`.toml`, `.json` or `.json5`)
//! 3. Environment variables (`TREEMIRROR_*` prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::MirrorError;

/// Default number of concurrent heavy tasks (directory comparisons, copies, removals)
pub const DEFAULT_WORKERS: usize = 4;

/// Default size of one copy chunk
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Default number of chunks in flight between a copy's reader and writer
pub const DEFAULT_CHANNEL_DEPTH: usize = 8;

pub const MIN_BUFFER_SIZE: usize = 1024;
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

const ENV_PREFIX: &str = "TREEMIRROR_";

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Configuration for a [`Mirror`](crate::engine::Mirror) engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorConfig {
	// ========================================================================
	// CONCURRENCY
	// ========================================================================
	/// Capacity of the shared throttle
	pub workers: usize,

	// ========================================================================
	// COPY PIPELINE
	// ========================================================================
	/// Bytes read per chunk
	pub buffer_size: usize,

	/// Chunks buffered between reader and writer
	pub channel_depth: usize,

	/// Replicate permission bits onto copied files (Unix only)
	pub preserve_mode: bool,

	// ========================================================================
	// COMPARISON
	// ========================================================================
	/// How entry names are matched between source and destination
	pub case_sensitivity: CaseSensitivity,

	/// Resolution used when comparing modification times
	pub mtime_precision: TimePrecision,

	// ========================================================================
	// BEHAVIOR & OUTPUT
	// ========================================================================
	/// Log planned actions instead of applying them
	pub dry_run: bool,

	/// Log level used when RUST_LOG is not set
	pub log_level: String,
}

impl Default for MirrorConfig {
	fn default() -> Self {
		MirrorConfig {
			workers: DEFAULT_WORKERS,
			buffer_size: DEFAULT_BUFFER_SIZE,
			channel_depth: DEFAULT_CHANNEL_DEPTH,
			preserve_mode: false,
			case_sensitivity: CaseSensitivity::Platform,
			mtime_precision: TimePrecision::Seconds,
			dry_run: false,
			log_level: "info".to_string(),
		}
	}
}

impl MirrorConfig {
	/// Load a config file, picking the format from its extension
	///
	/// `.toml` is parsed with `toml`, `.json` and `.json5` with `json5`.
	pub fn from_file(path: &Path) -> Result<Self, MirrorError> {
		let contents = std::fs::read_to_string(path).map_err(|e| MirrorError::ConfigLoad {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;

		let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
		let parsed: Result<MirrorConfig, String> = match ext.as_str() {
			"toml" => toml::from_str(&contents).map_err(|e| e.to_string()),
			"json" | "json5" => json5::from_str(&contents).map_err(|e| e.to_string()),
			other => Err(format!("Unsupported config format: '{}'", other)),
		};

		let config = parsed
			.map_err(|message| MirrorError::ConfigLoad { path: path.to_path_buf(), message })?;
		config.validate()?;
		Ok(config)
	}

	/// Override fields from `TREEMIRROR_*` environment variables
	pub fn apply_env(self) -> Result<Self, MirrorError> {
		self.apply_vars(std::env::vars())
	}

	/// Override fields from an explicit set of variables
	///
	/// Unknown variables are ignored.
	pub fn apply_vars<I>(mut self, vars: I) -> Result<Self, MirrorError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		for (key, value) in vars {
			let Some(name) = key.strip_prefix(ENV_PREFIX) else {
				continue;
			};
			match name {
				"WORKERS" => self.workers = parse_var(&key, &value)?,
				"BUFFER_SIZE" => self.buffer_size = parse_var(&key, &value)?,
				"CHANNEL_DEPTH" => self.channel_depth = parse_var(&key, &value)?,
				"PRESERVE_MODE" => self.preserve_mode = parse_var(&key, &value)?,
				"CASE_SENSITIVITY" => self.case_sensitivity = parse_var(&key, &value)?,
				"MTIME_PRECISION" => self.mtime_precision = parse_var(&key, &value)?,
				"DRY_RUN" => self.dry_run = parse_var(&key, &value)?,
				"LOG_LEVEL" => self.log_level = value,
				_ => {}
			}
		}
		Ok(self)
	}

	/// Check limits
	pub fn validate(&self) -> Result<(), MirrorError> {
		if self.workers == 0 {
			return Err(invalid("workers must be greater than 0".to_string()));
		}
		if self.channel_depth == 0 {
			return Err(invalid("channelDepth must be greater than 0".to_string()));
		}
		if self.buffer_size < MIN_BUFFER_SIZE || self.buffer_size > MAX_BUFFER_SIZE {
			return Err(invalid(format!(
				"bufferSize must be between {} and {} bytes, got {}",
				MIN_BUFFER_SIZE, MAX_BUFFER_SIZE, self.buffer_size
			)));
		}
		Ok(())
	}

	/// Upper bound of file bytes held in memory by one copy
	pub fn copy_memory_bound(&self) -> usize {
		self.buffer_size * self.channel_depth
	}
}

fn invalid(message: String) -> MirrorError {
	MirrorError::InvalidConfig { message }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, MirrorError>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	value
		.trim()
		.parse()
		.map_err(|e| invalid(format!("{}: cannot parse '{}': {}", key, value, e)))
}

// ============================================================================
// ENUMERATIONS
// ============================================================================

/// Entry name matching between the two trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CaseSensitivity {
	/// Insensitive on Windows, sensitive elsewhere
	#[default]
	Platform,
	Sensitive,
	Insensitive,
}

impl CaseSensitivity {
	/// Whether names should be case folded before matching
	pub fn folds(self) -> bool {
		match self {
			Self::Platform => cfg!(windows),
			Self::Sensitive => false,
			Self::Insensitive => true,
		}
	}
}

impl FromStr for CaseSensitivity {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"platform" | "auto" => Ok(Self::Platform),
			"sensitive" => Ok(Self::Sensitive),
			"insensitive" => Ok(Self::Insensitive),
			_ => Err(format!(
				"Unknown case sensitivity: {}. Valid options: platform, sensitive, insensitive",
				s
			)),
		}
	}
}

/// Modification time comparison resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimePrecision {
	/// Whole seconds; tolerant of filesystems with coarse timestamps
	#[default]
	Seconds,
	Nanoseconds,
}

impl FromStr for TimePrecision {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"seconds" | "s" => Ok(Self::Seconds),
			"nanoseconds" | "ns" => Ok(Self::Nanoseconds),
			_ => Err(format!("Unknown time precision: {}. Valid options: seconds, nanoseconds", s)),
		}
	}
}


// vim: ts=4
