use std::path::Path;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use serde_json::Map;
use serde_json::Value;

use crate::RetargetError;
use crate::RetargetResult;

/// Field of the metadata node naming the active target.
pub const CURRENT_TARGET_KEY: &str = "currentTarget";
/// Field of the metadata node holding one change set per inactive target.
pub const TARGET_CHANGES_KEY: &str = "targetChanges";

/// The shared structured configuration document (for example `package.json`).
///
/// Key order is preserved from the source text so that a switch produces a
/// minimal diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
	root: Map<String, Value>,
	metadata_key: String,
}

impl ConfigDocument {
	/// Parse a document from JSON text. `path_display` is only used in error
	/// messages.
	pub fn parse(content: &str, metadata_key: &str, path_display: &str) -> RetargetResult<Self> {
		let value: Value =
			serde_json::from_str(content).map_err(|e| RetargetError::DocumentParse {
				path: path_display.to_string(),
				reason: e.to_string(),
			})?;

		let Value::Object(root) = value else {
			return Err(RetargetError::DocumentParse {
				path: path_display.to_string(),
				reason: "the top-level value must be an object".to_string(),
			});
		};

		Self::from_map(root, metadata_key)
	}

	/// Wrap an already parsed top-level object.
	pub fn from_map(root: Map<String, Value>, metadata_key: &str) -> RetargetResult<Self> {
		let document = Self {
			root,
			metadata_key: metadata_key.to_string(),
		};

		// Validate the reserved node up front.
		document.current_target()?;
		Ok(document)
	}

	/// Read and parse the document at `path`.
	pub fn load(path: &Path, metadata_key: &str) -> RetargetResult<Self> {
		let content = std::fs::read_to_string(path)?;
		Self::parse(&content, metadata_key, &path.display().to_string())
	}

	/// Render as two-space indented JSON with a trailing newline.
	pub fn render(&self) -> RetargetResult<String> {
		let mut output = serde_json::to_string_pretty(&self.root).map_err(std::io::Error::from)?;
		output.push('\n');
		Ok(output)
	}

	pub fn metadata_key(&self) -> &str {
		&self.metadata_key
	}

	pub fn root(&self) -> &Map<String, Value> {
		&self.root
	}

	pub fn root_mut(&mut self) -> &mut Map<String, Value> {
		&mut self.root
	}

	pub fn field(&self, name: &str) -> Option<&Value> {
		self.root.get(name)
	}

	pub fn metadata(&self) -> RetargetResult<&Map<String, Value>> {
		self.root
			.get(&self.metadata_key)
			.and_then(Value::as_object)
			.ok_or_else(|| self.missing_metadata())
	}

	pub fn metadata_mut(&mut self) -> RetargetResult<&mut Map<String, Value>> {
		let missing = self.missing_metadata();
		self.root
			.get_mut(&self.metadata_key)
			.and_then(Value::as_object_mut)
			.ok_or(missing)
	}

	/// The name stored under `currentTarget`.
	pub fn current_target(&self) -> RetargetResult<&str> {
		self.metadata()?
			.get(CURRENT_TARGET_KEY)
			.and_then(Value::as_str)
			.ok_or_else(|| self.missing_metadata())
	}

	fn missing_metadata(&self) -> RetargetError {
		RetargetError::MissingMetadata {
			key: format!("{}.{CURRENT_TARGET_KEY}", self.metadata_key),
		}
	}
}

/// Write `content` to a sibling temporary file and rename it over `path`.
pub fn write_atomic(path: &Path, content: &str) -> RetargetResult<()> {
	let file_name = path
		.file_name()
		.map(|name| name.to_string_lossy().to_string())
		.unwrap_or_default();
	let temp_path: PathBuf = path.with_file_name(format!(
		".{file_name}.tmp-{}-{}",
		std::process::id(),
		std::time::SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_or(0, |duration| duration.as_nanos())
	));

	std::fs::write(&temp_path, content)?;
	if let Err(error) = std::fs::rename(&temp_path, path) {
		let _ = std::fs::remove_file(&temp_path);
		return Err(error.into());
	}

	Ok(())
}
