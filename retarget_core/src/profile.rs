use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// Built-in comment syntaxes: `(open, close, extensions)`.
const BUILTIN_PROFILES: &[(&str, &str, &[&str])] = &[
	(
		"//",
		"",
		&[
			"ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "rs", "go", "java", "kt", "kts",
			"swift", "c", "h", "cc", "cpp", "hpp", "cs", "scala", "dart", "jsonc",
		],
	),
	(
		"#",
		"",
		&[
			"py", "sh", "bash", "zsh", "rb", "pl", "toml", "yaml", "yml", "cfg", "conf", "r",
			"cmake",
		],
	),
	("<!--", "-->", &["md", "markdown", "mdx", "html", "htm", "xml", "svg", "vue"]),
	("--", "", &["lua", "sql", "hs", "elm"]),
	("%", "", &["tex", "sty", "cls", "bib"]),
	(";", "", &["el", "lisp", "clj", "ini", "asm"]),
	("\"", "", &["vim"]),
];

/// Line-comment delimiters for one family of file types.
///
/// A commented line reads `<indent><open> <content>` or, when `close` is not
/// empty, `<indent><open> <content> <close>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentProfile {
	pub open: String,
	#[serde(default)]
	pub close: String,
}

impl CommentProfile {
	pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
		Self {
			open: open.into(),
			close: close.into(),
		}
	}

	/// Whether the profile wraps content on both sides (`<!-- ... -->`).
	pub fn is_enclosing(&self) -> bool {
		!self.close.is_empty()
	}

	/// Strip the delimiters from an already indentation-free line, returning
	/// the text between them (untrimmed). `None` if the delimiters are absent.
	pub fn inner<'a>(&self, body: &'a str) -> Option<&'a str> {
		let rest = body.strip_prefix(self.open.as_str())?;
		if self.is_enclosing() {
			rest.strip_suffix(self.close.as_str())
		} else {
			Some(rest)
		}
	}

	/// Wrap `content` in this profile's delimiters.
	pub fn wrap(&self, content: &str) -> String {
		if self.is_enclosing() {
			format!("{} {content} {}", self.open, self.close)
		} else {
			format!("{} {content}", self.open)
		}
	}
}

/// Maps file extensions to the comment syntax used for directive blocks.
#[derive(Debug, Clone)]
pub struct ProfileTable {
	by_extension: BTreeMap<String, CommentProfile>,
}

impl Default for ProfileTable {
	fn default() -> Self {
		let mut by_extension = BTreeMap::new();
		for (open, close, extensions) in BUILTIN_PROFILES {
			for extension in *extensions {
				by_extension.insert((*extension).to_string(), CommentProfile::new(*open, *close));
			}
		}
		Self { by_extension }
	}
}

impl ProfileTable {
	/// The built-in table extended (or overridden) by user supplied entries.
	pub fn with_overrides(overrides: &BTreeMap<String, CommentProfile>) -> Self {
		let mut table = Self::default();
		for (extension, profile) in overrides {
			table.insert(extension, profile.clone());
		}
		table
	}

	pub fn insert(&mut self, extension: &str, profile: CommentProfile) {
		let extension = extension.trim_start_matches('.').to_ascii_lowercase();
		self.by_extension.insert(extension, profile);
	}

	pub fn get(&self, extension: &str) -> Option<&CommentProfile> {
		self.by_extension.get(&extension.to_ascii_lowercase())
	}

	/// Classify a file by its extension.
	pub fn for_path(&self, path: &Path) -> Option<&CommentProfile> {
		let extension = path.extension().and_then(|e| e.to_str())?;
		self.get(extension)
	}
}
