use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::RetargetError;
use crate::RetargetResult;
use crate::profile::CommentProfile;
use crate::profile::ProfileTable;
use crate::target::DEFAULT_TARGETS;
use crate::target::TargetSet;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["retarget.toml", ".retarget.toml", ".config/retarget.toml"];

/// Configuration loaded from a `retarget.toml` file.
///
/// ```toml
/// targets = ["coc.nvim", "vscode"]
///
/// [document]
/// path = "package.json"
/// metadata_key = "ltexAdditionalInformation"
/// primary = "dependencies"
/// secondary = "devDependencies"
///
/// [sources]
/// dirs = ["src", "test"]
///
/// [exclude]
/// patterns = ["*.json", "fixtures/"]
///
/// [profiles.vue]
/// open = "<!--"
/// close = "-->"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RetargetConfig {
	/// The closed set of target names, in declaration order.
	#[serde(default = "default_targets")]
	pub targets: Vec<String>,
	/// Where the shared config document lives and how it is laid out.
	#[serde(default)]
	pub document: DocumentConfig,
	/// Directories scanned for directive blocks.
	#[serde(default)]
	pub sources: SourcesConfig,
	/// Files and directories skipped while scanning.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// Extra comment profiles keyed by file extension. These take precedence
	/// over the built-in table.
	#[serde(default)]
	pub profiles: BTreeMap<String, CommentProfile>,
}

impl Default for RetargetConfig {
	fn default() -> Self {
		Self {
			targets: default_targets(),
			document: DocumentConfig::default(),
			sources: SourcesConfig::default(),
			exclude: ExcludeConfig::default(),
			profiles: BTreeMap::new(),
		}
	}
}

/// The `[document]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
	/// Path of the config document relative to the project root.
	#[serde(default = "default_document_path")]
	pub path: PathBuf,
	/// Top-level key of the reserved metadata node.
	#[serde(default = "default_metadata_key")]
	pub metadata_key: String,
	/// Mapping field that `moveToPrimary` relocates members into.
	#[serde(default = "default_primary")]
	pub primary: String,
	/// Mapping field that `moveToSecondary` relocates members into.
	#[serde(default = "default_secondary")]
	pub secondary: String,
}

impl Default for DocumentConfig {
	fn default() -> Self {
		Self {
			path: default_document_path(),
			metadata_key: default_metadata_key(),
			primary: default_primary(),
			secondary: default_secondary(),
		}
	}
}

/// The `[sources]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
	/// Directories relative to the project root, walked in this order.
	#[serde(default = "default_source_dirs")]
	pub dirs: Vec<PathBuf>,
}

impl Default for SourcesConfig {
	fn default() -> Self {
		Self {
			dirs: default_source_dirs(),
		}
	}
}

/// The `[exclude]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Gitignore-style patterns relative to the project root.
	#[serde(default)]
	pub patterns: Vec<String>,
}

fn default_targets() -> Vec<String> {
	DEFAULT_TARGETS.iter().map(ToString::to_string).collect()
}

fn default_document_path() -> PathBuf {
	PathBuf::from("package.json")
}

fn default_metadata_key() -> String {
	"retarget".to_string()
}

fn default_primary() -> String {
	"dependencies".to_string()
}

fn default_secondary() -> String {
	"devDependencies".to_string()
}

fn default_source_dirs() -> Vec<PathBuf> {
	vec![PathBuf::from("src"), PathBuf::from("test")]
}

impl RetargetConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> RetargetResult<Option<RetargetConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	/// Load the config at `root`, falling back to defaults when absent.
	pub fn load_or_default(root: &Path) -> RetargetResult<RetargetConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	/// Parse and validate config text.
	pub fn parse(content: &str) -> RetargetResult<RetargetConfig> {
		let config: RetargetConfig =
			toml::from_str(content).map_err(|e| RetargetError::ConfigParse(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> RetargetResult<()> {
		self.target_set()?;

		if self.document.primary == self.document.secondary {
			return Err(RetargetError::ConfigParse(
				"`document.primary` and `document.secondary` must name different fields"
					.to_string(),
			));
		}

		for (extension, profile) in &self.profiles {
			if profile.open.trim().is_empty() {
				return Err(RetargetError::ConfigParse(format!(
					"profile `{extension}` needs a non-empty `open` delimiter"
				)));
			}
		}

		Ok(())
	}

	pub fn target_set(&self) -> RetargetResult<TargetSet> {
		TargetSet::new(self.targets.iter().cloned())
	}

	pub fn profile_table(&self) -> ProfileTable {
		ProfileTable::with_overrides(&self.profiles)
	}

	/// Absolute path of the config document.
	pub fn document_path(&self, root: &Path) -> PathBuf {
		root.join(&self.document.path)
	}
}
