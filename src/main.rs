use clap::{Arg, ArgAction, Command};
use std::error::Error;
use std::path::{Path, PathBuf};

use treemirror::logging::init_tracing;
use treemirror::{Mirror, MirrorConfig};

fn load_config(path: Option<&PathBuf>) -> Result<MirrorConfig, Box<dyn Error>> {
	let config = match path {
		Some(path) => MirrorConfig::from_file(path)?,
		None => MirrorConfig::default(),
	};
	Ok(config.apply_env()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("treemirror")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Mirror a source directory tree onto a destination")
		.arg(Arg::new("source").required(true).value_parser(clap::value_parser!(PathBuf)))
		.arg(Arg::new("destination").required(true).value_parser(clap::value_parser!(PathBuf)))
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.value_parser(clap::value_parser!(PathBuf))
				.help("Config file (.toml, .json or .json5)"),
		)
		.arg(
			Arg::new("workers")
				.short('w')
				.long("workers")
				.value_name("N")
				.value_parser(clap::value_parser!(usize))
				.help("Concurrent directory comparisons / copies"),
		)
		.arg(
			Arg::new("buffer-size")
				.long("buffer-size")
				.value_name("BYTES")
				.value_parser(clap::value_parser!(usize))
				.help("Copy chunk size"),
		)
		.arg(
			Arg::new("channel-depth")
				.long("channel-depth")
				.value_name("N")
				.value_parser(clap::value_parser!(usize))
				.help("Chunks in flight per copy"),
		)
		.arg(
			Arg::new("dry-run")
				.short('n')
				.long("dry-run")
				.action(ArgAction::SetTrue)
				.help("Show what would change without changing anything"),
		)
		.arg(
			Arg::new("json")
				.long("json")
				.action(ArgAction::SetTrue)
				.requires("dry-run")
				.help("Print the plan as JSON (with --dry-run)"),
		)
		.get_matches();

	let mut config = load_config(matches.get_one::<PathBuf>("config"))?;
	if let Some(workers) = matches.get_one::<usize>("workers") {
		config.workers = *workers;
	}
	if let Some(size) = matches.get_one::<usize>("buffer-size") {
		config.buffer_size = *size;
	}
	if let Some(depth) = matches.get_one::<usize>("channel-depth") {
		config.channel_depth = *depth;
	}
	if matches.get_flag("dry-run") {
		config.dry_run = true;
	}

	init_tracing(&config.log_level);

	let source: &Path = matches.get_one::<PathBuf>("source").ok_or("source argument required")?;
	let destination: &Path =
		matches.get_one::<PathBuf>("destination").ok_or("destination argument required")?;

	let mirror = Mirror::new(config)?;
	if matches.get_flag("json") {
		let plan = mirror.plan(source, destination).await?;
		println!("{}", serde_json::to_string_pretty(&plan)?);
		return Ok(());
	}

	let summary = mirror.sync(source, destination).await?;
	if !summary.is_clean() {
		eprintln!("{} entries could not be mirrored (run with RUST_LOG=debug for details)", summary.failures);
		std::process::exit(1);
	}
	Ok(())
}

// vim: ts=4
