use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::RetargetError;
use crate::RetargetResult;
use crate::directive::Directive;
use crate::profile::CommentProfile;
use crate::target::Target;
use crate::target::TargetSet;

/// What the scanner does with one line inside a directive block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineAction {
	Keep,
	Comment,
	Uncomment,
}

impl LineAction {
	fn for_block(block_target: Option<&str>, old: &Target, new: &Target) -> Self {
		let Some(block_target) = block_target else {
			return Self::Keep;
		};

		let was_active = block_target == old.as_str();
		let becomes_active = block_target == new.as_str();

		match (was_active, becomes_active) {
			(true, false) => Self::Comment,
			(false, true) => Self::Uncomment,
			_ => Self::Keep,
		}
	}
}

/// Split a physical line into its leading indentation and the rest.
fn split_indent(line: &str) -> (&str, &str) {
	let body = line.trim_start_matches([' ', '\t']);
	(&line[..line.len() - body.len()], body)
}

fn comment_line(line: &str, profile: &CommentProfile) -> Result<String, String> {
	let (indent, body) = split_indent(line);
	if profile.is_enclosing() && body.contains(profile.close.as_str()) {
		return Err(format!(
			"cannot comment out a line that already contains `{}`",
			profile.close
		));
	}

	Ok(format!("{indent}{}", profile.wrap(body)))
}

fn uncomment_line(line: &str, profile: &CommentProfile) -> Result<String, String> {
	let (indent, body) = split_indent(line);
	let Some(mut inner) = profile.inner(body) else {
		return Err(if profile.is_enclosing() {
			format!(
				"expected a line wrapped in `{}` and `{}`",
				profile.open, profile.close
			)
		} else {
			format!("expected a line commented out with `{}`", profile.open)
		});
	};

	if profile.is_enclosing() {
		inner = inner.strip_suffix(' ').unwrap_or(inner);
	}

	// A bare delimiter stands for a line that was blank before commenting.
	if inner.is_empty() {
		return Ok(String::new());
	}

	inner
		.strip_prefix(' ')
		.map(|content| format!("{indent}{content}"))
		.ok_or_else(|| format!("expected a space after `{}`", profile.open))
}

/// Toggle the directive blocks of `content` from `old` to `new`.
///
/// Lines inside a block for `old` are commented out, lines inside a block for
/// `new` are uncommented and everything else is reproduced verbatim. The
/// result is identical to the input when `old == new`.
pub fn patch_source(
	content: &str,
	profile: &CommentProfile,
	old: &Target,
	new: &Target,
	path_display: &str,
) -> RetargetResult<String> {
	if old == new {
		return Ok(content.to_string());
	}

	let mut block_target: Option<String> = None;
	let mut lines = Vec::new();

	for (index, raw_line) in content.split('\n').enumerate() {
		let (line, line_ending) = match raw_line.strip_suffix('\r') {
			Some(line) => (line, "\r"),
			None => (raw_line, ""),
		};

		match Directive::from_line(line, profile) {
			Some(Directive::Open { target, .. }) => {
				block_target = Some(target);
				lines.push(raw_line.to_string());
				continue;
			}
			Some(Directive::End) => {
				block_target = None;
				lines.push(raw_line.to_string());
				continue;
			}
			None => {}
		}

		if line.is_empty() {
			lines.push(raw_line.to_string());
			continue;
		}

		let patched = match LineAction::for_block(block_target.as_deref(), old, new) {
			LineAction::Keep => {
				lines.push(raw_line.to_string());
				continue;
			}
			LineAction::Comment => comment_line(line, profile),
			LineAction::Uncomment => uncomment_line(line, profile),
		};

		let patched = patched.map_err(|reason| {
			RetargetError::MalformedLine {
				path: path_display.to_string(),
				line: index + 1,
				reason,
			}
		})?;
		lines.push(format!("{patched}{line_ending}"));
	}

	Ok(lines.join("\n"))
}

/// Patch a single file in place. Returns `true` when the file changed.
pub fn patch_file(
	path: &Path,
	profile: &CommentProfile,
	old: &Target,
	new: &Target,
) -> RetargetResult<bool> {
	if old == new {
		return Ok(false);
	}

	let content = std::fs::read_to_string(path)?;
	let patched = patch_source(&content, profile, old, new, &path.display().to_string())?;
	if patched == content {
		return Ok(false);
	}

	std::fs::write(path, patched)?;
	Ok(true)
}

/// The kind of problem found while checking a file against the active target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ScanDiagnosticKind {
	/// A line in a block for an inactive target is live code.
	UncommentedLine { target: String },
	/// A block was never closed with `#endif` before the next `#if` or the end
	/// of the file.
	UnclosedBlock { target: String },
	/// A directive names a target that is not configured.
	UnknownTarget { target: String },
}

/// A problem found by [`check_source`], with its 1-indexed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDiagnostic {
	pub line: usize,
	pub kind: ScanDiagnosticKind,
}

impl ScanDiagnostic {
	/// Human-readable message for this diagnostic.
	pub fn message(&self) -> String {
		match &self.kind {
			ScanDiagnosticKind::UncommentedLine { target } => {
				format!("line belongs to inactive target `{target}` but is not commented out")
			}
			ScanDiagnosticKind::UnclosedBlock { target } => {
				format!("block for target `{target}` is missing `#endif`")
			}
			ScanDiagnosticKind::UnknownTarget { target } => {
				format!("directive names unknown target `{target}`")
			}
		}
	}
}

/// Verify that `content` matches the state expected for `current`: every
/// non-empty line in a block for another known target must be commented out.
pub fn check_source(
	content: &str,
	profile: &CommentProfile,
	current: &Target,
	targets: &TargetSet,
) -> Vec<ScanDiagnostic> {
	let mut diagnostics = Vec::new();
	let mut open_block: Option<(usize, String)> = None;

	for (index, raw_line) in content.split('\n').enumerate() {
		let line_number = index + 1;
		let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

		match Directive::from_line(line, profile) {
			Some(Directive::Open { target, else_if }) => {
				if let Some((opened_at, previous)) = open_block.take() {
					if !else_if {
						diagnostics.push(ScanDiagnostic {
							line: opened_at,
							kind: ScanDiagnosticKind::UnclosedBlock { target: previous },
						});
					}
				}
				if !targets.contains(&target) {
					diagnostics.push(ScanDiagnostic {
						line: line_number,
						kind: ScanDiagnosticKind::UnknownTarget {
							target: target.clone(),
						},
					});
				}
				open_block = Some((line_number, target));
				continue;
			}
			Some(Directive::End) => {
				open_block = None;
				continue;
			}
			None => {}
		}

		let Some((_, block_target)) = &open_block else {
			continue;
		};

		if line.is_empty() || block_target == current.as_str() || !targets.contains(block_target)
		{
			continue;
		}

		let (_, body) = split_indent(line);
		if profile.inner(body).is_none() {
			diagnostics.push(ScanDiagnostic {
				line: line_number,
				kind: ScanDiagnosticKind::UncommentedLine {
					target: block_target.clone(),
				},
			});
		}
	}

	if let Some((opened_at, target)) = open_block {
		diagnostics.push(ScanDiagnostic {
			line: opened_at,
			kind: ScanDiagnosticKind::UnclosedBlock { target },
		});
	}

	diagnostics
}
