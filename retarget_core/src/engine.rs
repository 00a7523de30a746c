use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::RetargetResult;
use crate::config::RetargetConfig;
use crate::document::ConfigDocument;
use crate::document::write_atomic;
use crate::overlay::ChangeEntry;
use crate::overlay::MoveDirection;
use crate::overlay::Overlay;
use crate::overlay::TargetChanges;
use crate::project::collect_source_files;
use crate::scanner::ScanDiagnostic;
use crate::scanner::check_source;
use crate::scanner::patch_source;
use crate::target::Target;

/// The in-memory result of switching a project to another target. Nothing is
/// written until [`write_switch`] is called.
#[derive(Debug, Clone)]
pub struct SwitchOutcome {
	/// The target that was active before the switch.
	pub previous: Target,
	/// The target that is active after the switch.
	pub current: Target,
	/// Path of the config document.
	pub document_path: PathBuf,
	/// The document before the switch.
	pub original_document: String,
	/// The rendered document, when it changed.
	pub updated_document: Option<String>,
	/// Source files that changed, with their original and new content.
	pub updated_files: BTreeMap<PathBuf, FileUpdate>,
	/// Number of source files scanned.
	pub scanned_files: usize,
}

/// Original and patched content of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
	pub original: String,
	pub updated: String,
}

impl SwitchOutcome {
	/// Whether the switch changes anything on disk.
	pub fn is_noop(&self) -> bool {
		self.updated_document.is_none() && self.updated_files.is_empty()
	}

	/// Total number of files the switch rewrites, the document included.
	pub fn changed_file_count(&self) -> usize {
		self.updated_files.len() + usize::from(self.updated_document.is_some())
	}
}

/// Switch the config document once, then patch every tracked source file for
/// `target`, all in memory.
///
/// Any failure aborts before a single byte is written.
pub fn compute_switch(
	root: &Path,
	config: &RetargetConfig,
	target: &str,
) -> RetargetResult<SwitchOutcome> {
	let targets = config.target_set()?;
	// Reject unknown targets before anything is read.
	let target = targets.resolve(target)?;

	let document_path = config.document_path(root);
	info!(path = %document_path.display(), "patching config document");
	let original_document = std::fs::read_to_string(&document_path)?;
	let mut document = ConfigDocument::parse(
		&original_document,
		&config.document.metadata_key,
		&document_path.display().to_string(),
	)?;

	let overlay = Overlay::new(
		&targets,
		&config.document.primary,
		&config.document.secondary,
	);
	let previous = overlay.switch_target(&mut document, &target)?;

	let mut outcome = SwitchOutcome {
		previous: previous.clone(),
		current: target.clone(),
		document_path,
		original_document,
		updated_document: None,
		updated_files: BTreeMap::new(),
		scanned_files: 0,
	};

	if previous == target {
		return Ok(outcome);
	}

	let rendered = document.render()?;
	if rendered != outcome.original_document {
		outcome.updated_document = Some(rendered);
	}

	for file in collect_source_files(root, config)? {
		info!(path = %file.path.display(), "patching source file");
		let original = std::fs::read_to_string(&file.path)?;
		let updated = patch_source(
			&original,
			&file.profile,
			&previous,
			&target,
			&file.path.display().to_string(),
		)?;
		outcome.scanned_files += 1;

		if updated == original {
			continue;
		}

		debug!(path = %file.path.display(), "source file changed");
		outcome
			.updated_files
			.insert(file.path, FileUpdate { original, updated });
	}

	Ok(outcome)
}

/// Write the results of [`compute_switch`] to disk, the config document first.
pub fn write_switch(outcome: &SwitchOutcome) -> RetargetResult<()> {
	if let Some(document) = &outcome.updated_document {
		write_atomic(&outcome.document_path, document)?;
	}

	for (path, update) in &outcome.updated_files {
		write_atomic(path, &update.updated)?;
	}

	Ok(())
}

/// Switch the project at `root` to `target` and persist the result. Returns
/// the target that was active before.
pub fn run(root: &Path, config: &RetargetConfig, target: &str) -> RetargetResult<Target> {
	let outcome = compute_switch(root, config, target)?;
	write_switch(&outcome)?;
	Ok(outcome.previous)
}

/// A problem found in one file by [`check_project`].
#[derive(Debug, Clone, Serialize)]
pub struct FileDiagnostic {
	pub file: PathBuf,
	#[serde(flatten)]
	pub diagnostic: ScanDiagnostic,
}

/// Result of checking that the source tree matches the active target.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
	pub current: Target,
	pub scanned_files: usize,
	pub diagnostics: Vec<FileDiagnostic>,
}

impl CheckResult {
	pub fn is_ok(&self) -> bool {
		self.diagnostics.is_empty()
	}
}

/// Check every tracked source file against the target recorded in the config
/// document.
pub fn check_project(root: &Path, config: &RetargetConfig) -> RetargetResult<CheckResult> {
	let targets = config.target_set()?;
	let document = ConfigDocument::load(
		&config.document_path(root),
		&config.document.metadata_key,
	)?;
	let current = targets.resolve(document.current_target()?)?;

	let mut result = CheckResult {
		current: current.clone(),
		scanned_files: 0,
		diagnostics: Vec::new(),
	};

	for file in collect_source_files(root, config)? {
		let content = std::fs::read_to_string(&file.path)?;
		result.scanned_files += 1;
		for diagnostic in check_source(&content, &file.profile, &current, &targets) {
			result.diagnostics.push(FileDiagnostic {
				file: file.path.clone(),
				diagnostic,
			});
		}
	}

	Ok(result)
}

/// Summary of the change set recorded for one inactive target.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSetSummary {
	pub target: String,
	/// Fields with member overrides and the number of overridden members.
	pub members: BTreeMap<String, usize>,
	/// Fields replaced wholesale.
	pub replacements: Vec<String>,
	pub move_to_primary: Vec<String>,
	pub move_to_secondary: Vec<String>,
}

/// The overlay state of a project.
#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
	pub document: PathBuf,
	pub current: Target,
	pub targets: Vec<Target>,
	pub change_sets: Vec<ChangeSetSummary>,
}

/// Inspect the active target and the recorded change sets.
pub fn inspect_status(root: &Path, config: &RetargetConfig) -> RetargetResult<TargetStatus> {
	let targets = config.target_set()?;
	let document_path = config.document_path(root);
	let document = ConfigDocument::load(&document_path, &config.document.metadata_key)?;
	let current = targets.resolve(document.current_target()?)?;
	let changes = TargetChanges::from_document(&document)?;

	let change_sets = changes
		.iter()
		.map(|(target, set)| {
			let mut summary = ChangeSetSummary {
				target: target.to_string(),
				members: BTreeMap::new(),
				replacements: Vec::new(),
				move_to_primary: set.moves(MoveDirection::ToPrimary).to_vec(),
				move_to_secondary: set.moves(MoveDirection::ToSecondary).to_vec(),
			};
			for (field, entry) in set.entries() {
				match entry {
					ChangeEntry::Members(members) => {
						summary.members.insert(field.to_string(), members.len());
					}
					ChangeEntry::Replace(_) => summary.replacements.push(field.to_string()),
					ChangeEntry::Moves(_) => {}
				}
			}
			summary
		})
		.collect();

	Ok(TargetStatus {
		document: document_path,
		current,
		targets: targets.iter().cloned().collect(),
		change_sets,
	})
}
