use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum RetargetError {
	#[error(transparent)]
	#[diagnostic(code(retarget::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(retarget::config_parse),
		help("check that retarget.toml is valid TOML and lists at least one target")
	)]
	ConfigParse(String),

	#[error("unknown target `{target}`")]
	#[diagnostic(
		code(retarget::unknown_target),
		help("known targets: {known}")
	)]
	UnknownTarget { target: String, known: String },

	#[error("failed to parse config document `{path}`: {reason}")]
	#[diagnostic(code(retarget::document_parse))]
	DocumentParse { path: String, reason: String },

	#[error("config document has no `{key}` metadata")]
	#[diagnostic(
		code(retarget::missing_metadata),
		help("add an object with a `currentTarget` field under `{key}`")
	)]
	MissingMetadata { key: String },

	#[error("target metadata is inconsistent: {0}")]
	#[diagnostic(
		code(retarget::metadata_invariant),
		help("`targetChanges` must hold one object per inactive target and none for the active one")
	)]
	MetadataInvariant(String),

	#[error("unsupported override for `{field}` in the changes of `{target}`: {reason}")]
	#[diagnostic(
		code(retarget::unsupported_override),
		help(
			"overrides are either a scalar replacement or an object of members mapped to values, \
			 `+` or `-`"
		)
	)]
	UnsupportedOverride {
		target: String,
		field: String,
		reason: String,
	},

	#[error("field `{field}` cannot take its override: {reason}")]
	#[diagnostic(code(retarget::field_shape))]
	FieldShape { field: String, reason: String },

	#[error("malformed line {line} in `{path}`: {reason}")]
	#[diagnostic(
		code(retarget::malformed_line),
		help("the file no longer matches the target it was last patched for; fix it by hand")
	)]
	MalformedLine {
		path: String,
		line: usize,
		reason: String,
	},

	#[error("no comment syntax known for `{path}`")]
	#[diagnostic(
		code(retarget::unsupported_file_type),
		help("add a `[profiles.<extension>]` entry or an `[exclude]` pattern in retarget.toml")
	)]
	UnsupportedFileType { path: String },

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(retarget::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },
}

pub type RetargetResult<T> = Result<T, RetargetError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
