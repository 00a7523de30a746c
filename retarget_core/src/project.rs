use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use tracing::debug;

use crate::RetargetError;
use crate::RetargetResult;
use crate::config::RetargetConfig;
use crate::profile::CommentProfile;
use crate::profile::ProfileTable;

/// A tracked file together with the comment syntax used to patch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
	pub path: PathBuf,
	pub profile: CommentProfile,
}

/// Collect every tracked file under the configured source directories.
///
/// Directories are visited in configuration order. Inside each directory the
/// files come first in sorted name order, then the subdirectories, also
/// sorted. Files matched by `[exclude]` are skipped; any other file without a
/// known comment profile is an error.
pub fn collect_source_files(root: &Path, config: &RetargetConfig) -> RetargetResult<Vec<SourceFile>> {
	let exclude = build_exclude_matcher(root, &config.exclude.patterns)?;
	let profiles = config.profile_table();
	let mut visited_dirs = HashSet::new();
	let mut files = Vec::new();

	for dir in &config.sources.dirs {
		let path = root.join(dir);
		if !path.is_dir() {
			debug!(dir = %path.display(), "source directory does not exist, skipping");
			continue;
		}
		walk_dir(&path, &exclude, &profiles, &mut visited_dirs, &mut files)?;
	}

	Ok(files)
}

/// Build a `Gitignore` matcher from the `[exclude]` patterns of
/// `retarget.toml`.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> RetargetResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			RetargetError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| RetargetError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

fn walk_dir(
	dir: &Path,
	exclude: &Gitignore,
	profiles: &ProfileTable,
	visited_dirs: &mut HashSet<PathBuf>,
	files: &mut Vec<SourceFile>,
) -> RetargetResult<()> {
	// Detect symlink cycles by tracking canonical paths.
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Err(RetargetError::SymlinkCycle {
			path: dir.display().to_string(),
		});
	}

	let mut file_paths = Vec::new();
	let mut dir_paths = Vec::new();

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		let is_dir = path.is_dir();

		if exclude.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			dir_paths.push(path);
		} else {
			file_paths.push(path);
		}
	}

	file_paths.sort();
	dir_paths.sort();

	for path in file_paths {
		let Some(profile) = profiles.for_path(&path) else {
			return Err(RetargetError::UnsupportedFileType {
				path: path.display().to_string(),
			});
		};
		files.push(SourceFile {
			profile: profile.clone(),
			path,
		});
	}

	for path in dir_paths {
		walk_dir(&path, exclude, profiles, visited_dirs, files)?;
	}

	Ok(())
}

/// Make a path relative to root for display purposes.
pub fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
