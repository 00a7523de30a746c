use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Switch one source tree between mutually exclusive build targets.",
	long_about = "retarget keeps a single source tree building for several deployment targets.\n\nIt \
	              toggles `#if TARGET == '<name>'` blocks written as comments in source files and \
	              applies a reversible overlay to a shared JSON config document such as \
	              `package.json`.\n\nQuick start:\n  retarget init                 Create a \
	              retarget.toml\n  retarget status               Show the active target\n  \
	              retarget patch --target NAME  Switch to another target\n  retarget check        \
	                      Verify sources match the active target"
)]
pub struct RetargetCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize retarget in a project by creating a sample `retarget.toml`.
	///
	/// If a config file already exists, this command is a no-op and exits
	/// successfully.
	Init,
	/// Patch the config document and every tracked source file for a target.
	///
	/// The config document is switched once, recording how to restore the
	/// previously active target, and then every file under the configured
	/// source directories has its directive blocks toggled. Nothing is written
	/// if any file fails to patch.
	Patch {
		/// The target to switch to. Must be one of the configured targets.
		#[arg(long, short)]
		target: String,

		/// Preview the switch without writing files.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Show a unified diff for every file the switch changes.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// Show the active target and the overlays recorded for the others.
	Status {
		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Check that every tracked source file matches the active target.
	///
	/// Reports lines of inactive targets that are not commented out, blocks
	/// without `#endif` and directives naming unknown targets. Exits with a
	/// non-zero status code when problems are found.
	Check {
		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
