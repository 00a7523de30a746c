use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use retarget_cli::Commands;
use retarget_cli::OutputFormat;
use retarget_cli::RetargetCli;
use retarget_core::CONFIG_FILE_CANDIDATES;
use retarget_core::RetargetConfig;
use retarget_core::RetargetError;
use retarget_core::SwitchOutcome;
use retarget_core::check_project;
use retarget_core::compute_switch;
use retarget_core::inspect_status;
use retarget_core::make_relative;
use retarget_core::write_switch;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_CONFIG: &str = r#"# retarget configuration

# The closed set of targets. The active one is recorded in the config document.
targets = ["coc.nvim", "vscode"]

[document]
# JSON document holding the reversible overlay.
path = "package.json"
# Top-level key of the metadata node with `currentTarget` and `targetChanges`.
metadata_key = "retarget"
# Mapping fields that `moveToPrimary` / `moveToSecondary` relocate members between.
primary = "dependencies"
secondary = "devDependencies"

[sources]
# Directories scanned for `#if TARGET == '<name>'` blocks, in this order.
dirs = ["src", "test"]

[exclude]
# Gitignore-style patterns for files without a comment syntax.
patterns = []

# Extra comment syntaxes keyed by file extension.
# [profiles.vue]
# open = "<!--"
# close = "-->"
"#;

fn main() {
	let args = RetargetCli::parse();

	// Respect NO_COLOR env var, --no-color flag and the terminal's support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args).map(|()| true),
		Some(Commands::Patch {
			target,
			dry_run,
			diff,
		}) => run_patch(&args, target, *dry_run, *diff).map(|()| true),
		Some(Commands::Status { format }) => run_status(&args, *format).map(|()| true),
		Some(Commands::Check { format }) => run_check(&args, *format),
		None => {
			eprintln!("No subcommand specified. Run `retarget --help` for usage.");
			process::exit(1);
		}
	};

	match result {
		Ok(true) => {}
		Ok(false) => process::exit(1),
		Err(e) => {
			// Try to render through miette for rich diagnostics with help text
			// and error codes.
			match e.downcast::<RetargetError>() {
				Ok(retarget_err) => {
					let report: miette::Report = (*retarget_err).into();
					eprintln!("{report:?}");
				}
				Err(e) => {
					eprintln!("{} {e}", colored!("error:", red));
				}
			}
			process::exit(2);
		}
	}
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.init();
}

fn resolve_root(args: &RetargetCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_init(args: &RetargetCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);

	if let Some(existing) = RetargetConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let config_path = root.join(CONFIG_FILE_CANDIDATES[0]);
	std::fs::write(&config_path, SAMPLE_CONFIG)?;
	println!("Created config file: {}", config_path.display());
	println!();
	println!("Next steps:");
	println!("  1. Add a metadata node to your config document:");
	println!("     \"retarget\": {{ \"currentTarget\": \"vscode\", \"targetChanges\": {{}} }}");
	println!("  2. Wrap target-specific code in comment directives:");
	println!("     // #if TARGET == 'coc.nvim'");
	println!("     // #endif");
	println!("  3. Run `retarget patch --target <name>` to switch");

	Ok(())
}

fn run_patch(
	args: &RetargetCli,
	target: &str,
	dry_run: bool,
	show_diff: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = RetargetConfig::load_or_default(&root)?;
	let outcome = compute_switch(&root, &config, target)?;

	if outcome.previous == outcome.current {
		println!("Already on target `{}`.", outcome.current);
		return Ok(());
	}

	if show_diff {
		print_outcome_diff(&outcome, &root);
	}

	let changed_paths = changed_paths(&outcome);

	if dry_run {
		println!(
			"{} would switch from `{}` to `{}` and update {} file(s):",
			colored!("Dry run:", yellow),
			outcome.previous,
			outcome.current,
			changed_paths.len()
		);
		for path in &changed_paths {
			println!("  {}", make_relative(path, &root));
		}
		return Ok(());
	}

	write_switch(&outcome)?;
	println!(
		"{} from `{}` to `{}`: updated {} file(s), scanned {} source file(s).",
		colored!("Switched", green),
		outcome.previous,
		outcome.current,
		changed_paths.len(),
		outcome.scanned_files
	);

	if args.verbose {
		for path in &changed_paths {
			println!("  {}", make_relative(path, &root));
		}
	}

	Ok(())
}

/// The document first, then source files in path order.
fn changed_paths(outcome: &SwitchOutcome) -> Vec<PathBuf> {
	let mut paths = Vec::with_capacity(outcome.changed_file_count());
	if outcome.updated_document.is_some() {
		paths.push(outcome.document_path.clone());
	}
	paths.extend(outcome.updated_files.keys().cloned());
	paths
}

fn print_outcome_diff(outcome: &SwitchOutcome, root: &Path) {
	if let Some(document) = &outcome.updated_document {
		eprintln!(
			"{}",
			colored!(make_relative(&outcome.document_path, root), bold)
		);
		print_diff(&outcome.original_document, document);
	}

	for (path, update) in &outcome.updated_files {
		eprintln!("{}", colored!(make_relative(path, root), bold));
		print_diff(&update.original, &update.updated);
	}
}

fn run_status(args: &RetargetCli, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = RetargetConfig::load_or_default(&root)?;
	let status = inspect_status(&root, &config)?;
	let document = make_relative(&status.document, &root);

	match format {
		OutputFormat::Json => {
			let output = serde_json::json!({
				"document": document,
				"current": status.current,
				"targets": status.targets,
				"change_sets": status.change_sets,
			});
			println!("{}", serde_json::to_string_pretty(&output)?);
		}
		OutputFormat::Text => {
			let targets: Vec<&str> = status.targets.iter().map(|target| target.as_str()).collect();
			println!("{:<16} {}", "Active target:", colored!(status.current, green));
			println!("{:<16} {}", "Targets:", targets.join(", "));
			println!("{:<16} {document}", "Document:");

			if status.change_sets.is_empty() {
				return Ok(());
			}

			println!();
			println!("{}", colored!("Recorded overlays:", bold));
			for summary in &status.change_sets {
				println!("  {}", summary.target);
				if !summary.replacements.is_empty() {
					println!("    replaces: {}", summary.replacements.join(", "));
				}
				if !summary.members.is_empty() {
					let members: Vec<String> = summary
						.members
						.iter()
						.map(|(field, count)| format!("{field} ({count})"))
						.collect();
					println!("    members: {}", members.join(", "));
				}
				if !summary.move_to_primary.is_empty() {
					println!(
						"    moves to {}: {}",
						config.document.primary,
						summary.move_to_primary.join(", ")
					);
				}
				if !summary.move_to_secondary.is_empty() {
					println!(
						"    moves to {}: {}",
						config.document.secondary,
						summary.move_to_secondary.join(", ")
					);
				}
			}
		}
	}

	Ok(())
}

/// Run the check. Returns `false` when problems were found.
fn run_check(args: &RetargetCli, format: OutputFormat) -> Result<bool, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = RetargetConfig::load_or_default(&root)?;
	let result = check_project(&root, &config)?;

	match format {
		OutputFormat::Json => {
			let diagnostics: Vec<serde_json::Value> = result
				.diagnostics
				.iter()
				.map(|found| {
					serde_json::json!({
						"file": make_relative(&found.file, &root),
						"line": found.diagnostic.line,
						"kind": found.diagnostic.kind,
						"message": found.diagnostic.message(),
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": result.is_ok(),
				"current": result.current,
				"scanned": result.scanned_files,
				"diagnostics": diagnostics,
			});
			println!("{output}");
		}
		OutputFormat::Text if result.is_ok() => {
			println!(
				"Check passed: {} file(s) match target `{}`.",
				result.scanned_files, result.current
			);
		}
		OutputFormat::Text => {
			eprintln!(
				"{} {} problem(s) for target `{}`:",
				colored!("Check failed:", red),
				result.diagnostics.len(),
				result.current
			);
			for found in &result.diagnostics {
				eprintln!(
					"  {}:{}: {}",
					make_relative(&found.file, &root),
					found.diagnostic.line,
					found.diagnostic.message()
				);
			}
		}
	}

	Ok(result.is_ok())
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}
