use std::borrow::Borrow;

use derive_more::Deref;
use derive_more::Display;
use serde::Deserialize;
use serde::Serialize;

use crate::RetargetError;
use crate::RetargetResult;

/// Targets used when no config file overrides them.
pub const DEFAULT_TARGETS: [&str; 2] = ["coc.nvim", "vscode"];

/// The name of one build or deployment configuration sharing the source tree.
#[derive(
	Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, Display, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for Target {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<&str> for Target {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// The closed, ordered set of targets a project knows about.
///
/// Order is the declaration order from the config file and decides the order
/// in which per-target change sets are created inside the config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
	targets: Vec<Target>,
}

impl TargetSet {
	/// Build a target set, rejecting empty lists and duplicate names.
	pub fn new<I, T>(names: I) -> RetargetResult<Self>
	where
		I: IntoIterator<Item = T>,
		T: Into<String>,
	{
		let mut targets: Vec<Target> = Vec::new();

		for name in names {
			let target = Target::new(name);
			if target.is_empty() {
				return Err(RetargetError::ConfigParse(
					"target names must not be empty".to_string(),
				));
			}
			if targets.contains(&target) {
				return Err(RetargetError::ConfigParse(format!(
					"target `{target}` is listed more than once"
				)));
			}
			targets.push(target);
		}

		if targets.is_empty() {
			return Err(RetargetError::ConfigParse(
				"at least one target must be configured".to_string(),
			));
		}

		Ok(Self { targets })
	}

	pub fn contains(&self, name: &str) -> bool {
		self.targets.iter().any(|target| target.as_str() == name)
	}

	/// Resolve a user supplied name into a known target.
	pub fn resolve(&self, name: &str) -> RetargetResult<Target> {
		self.targets
			.iter()
			.find(|target| target.as_str() == name)
			.cloned()
			.ok_or_else(|| {
				RetargetError::UnknownTarget {
					target: name.to_string(),
					known: self.to_string(),
				}
			})
	}

	pub fn iter(&self) -> impl Iterator<Item = &Target> {
		self.targets.iter()
	}

	/// Every known target except `target`, in declaration order.
	pub fn others<'a>(&'a self, target: &'a Target) -> impl Iterator<Item = &'a Target> {
		self.targets.iter().filter(move |candidate| *candidate != target)
	}

	pub fn len(&self) -> usize {
		self.targets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.targets.is_empty()
	}
}

impl Default for TargetSet {
	fn default() -> Self {
		Self {
			targets: DEFAULT_TARGETS.iter().copied().map(Target::from).collect(),
		}
	}
}

impl std::fmt::Display for TargetSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let names: Vec<&str> = self.targets.iter().map(Target::as_str).collect();
		write!(f, "{}", names.join(", "))
	}
}
