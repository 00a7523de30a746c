//! Reversible overlays for the shared config document.
//!
//! The document carries a reserved metadata node:
//!
//! ```json
//! {
//!   "currentTarget": "vscode",
//!   "targetChanges": {
//!     "coc.nvim": {
//!       "activationEvents": { "onLanguage:bibtex": "-" },
//!       "engines": { "coc": "^0.0.80", "vscode": "-" },
//!       "main": "./dist/coc.js",
//!       "moveToPrimary": ["coc-helper"]
//!     }
//!   }
//! }
//! ```
//!
//! Switching to a target consumes its change set and records, for every other
//! target, the inverse overrides needed to get back to the state it expects.

use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::RetargetError;
use crate::RetargetResult;
use crate::document::CURRENT_TARGET_KEY;
use crate::document::ConfigDocument;
use crate::document::TARGET_CHANGES_KEY;
use crate::target::Target;
use crate::target::TargetSet;

/// Change set key listing members to move from the secondary to the primary
/// mapping field.
pub const MOVE_TO_PRIMARY_KEY: &str = "moveToPrimary";
/// Change set key listing members to move from the primary to the secondary
/// mapping field.
pub const MOVE_TO_SECONDARY_KEY: &str = "moveToSecondary";

const PRESENT: &str = "+";
const ABSENT: &str = "-";

/// Direction of a dependency move between the two mapping fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
	ToPrimary,
	ToSecondary,
}

impl MoveDirection {
	pub fn key(self) -> &'static str {
		match self {
			Self::ToPrimary => MOVE_TO_PRIMARY_KEY,
			Self::ToSecondary => MOVE_TO_SECONDARY_KEY,
		}
	}

	pub fn opposite(self) -> Self {
		match self {
			Self::ToPrimary => Self::ToSecondary,
			Self::ToSecondary => Self::ToPrimary,
		}
	}

	fn from_key(key: &str) -> Option<Self> {
		match key {
			MOVE_TO_PRIMARY_KEY => Some(Self::ToPrimary),
			MOVE_TO_SECONDARY_KEY => Some(Self::ToSecondary),
			_ => None,
		}
	}
}

/// Presence of a member in a sequence field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
	Present,
	Absent,
}

/// The desired (or recorded) state of one member of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberOverride {
	/// Membership of a string in a sequence field, encoded as `+` / `-`.
	SequenceMembership(Membership),
	/// Value of a key in a mapping field; `None` (encoded as `-`) removes it.
	KeyedValue(Option<Value>),
}

impl MemberOverride {
	fn parse(kind: FieldKind, raw: &Value) -> Result<Self, String> {
		match kind {
			FieldKind::Sequence => {
				match raw.as_str() {
					Some(PRESENT) => Ok(Self::SequenceMembership(Membership::Present)),
					Some(ABSENT) => Ok(Self::SequenceMembership(Membership::Absent)),
					_ => Err(format!("sequence members take `{PRESENT}` or `{ABSENT}`, got `{raw}`")),
				}
			}
			FieldKind::Keyed => {
				if raw.as_str() == Some(ABSENT) {
					Ok(Self::KeyedValue(None))
				} else {
					Ok(Self::KeyedValue(Some(raw.clone())))
				}
			}
		}
	}

	/// Encode for storage inside a change set.
	pub fn to_value(&self) -> Value {
		match self {
			Self::SequenceMembership(Membership::Present) => Value::from(PRESENT),
			Self::SequenceMembership(Membership::Absent) | Self::KeyedValue(None) => {
				Value::from(ABSENT)
			}
			Self::KeyedValue(Some(value)) => value.clone(),
		}
	}
}

/// A whole-field replacement of a scalar field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldReplacement {
	Set(Value),
	Remove,
}

impl FieldReplacement {
	fn parse(raw: &Value) -> Self {
		if raw.as_str() == Some(ABSENT) {
			Self::Remove
		} else {
			Self::Set(raw.clone())
		}
	}

	/// The replacement that restores a field's current state.
	fn capture(current: Option<&Value>) -> Value {
		current.cloned().unwrap_or_else(|| Value::from(ABSENT))
	}
}

/// One entry of a change set, keyed by a top-level field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEntry {
	/// Member-keyed overrides, interpreted against the live field's kind.
	Members(Map<String, Value>),
	/// Replacement of the whole (scalar) field.
	Replace(Value),
	/// Members to relocate between the primary and secondary fields.
	Moves(Vec<String>),
}

impl ChangeEntry {
	fn parse(target: &str, field: &str, raw: &Value) -> RetargetResult<Self> {
		let unsupported = |reason: &str| {
			RetargetError::UnsupportedOverride {
				target: target.to_string(),
				field: field.to_string(),
				reason: reason.to_string(),
			}
		};

		if MoveDirection::from_key(field).is_some() {
			let Value::Array(items) = raw else {
				return Err(unsupported("move lists must be arrays of member names"));
			};
			return items
				.iter()
				.map(|item| {
					item.as_str()
						.map(str::to_string)
						.ok_or_else(|| unsupported("move lists must be arrays of member names"))
				})
				.collect::<RetargetResult<Vec<_>>>()
				.map(Self::Moves);
		}

		match raw {
			Value::Object(members) => Ok(Self::Members(members.clone())),
			Value::Array(_) => Err(unsupported("arrays are not a supported override shape")),
			scalar => Ok(Self::Replace(scalar.clone())),
		}
	}

	fn to_value(&self) -> Value {
		match self {
			Self::Members(members) => Value::Object(members.clone()),
			Self::Replace(value) => value.clone(),
			Self::Moves(keys) => Value::Array(keys.iter().cloned().map(Value::from).collect()),
		}
	}

	fn is_empty(&self) -> bool {
		match self {
			Self::Members(members) => members.is_empty(),
			Self::Replace(_) => false,
			Self::Moves(keys) => keys.is_empty(),
		}
	}
}

/// The recorded delta that reconstructs one inactive target's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
	entries: Vec<(String, ChangeEntry)>,
}

impl ChangeSet {
	fn parse(target: &str, raw: &Value) -> RetargetResult<Self> {
		let Value::Object(map) = raw else {
			return Err(RetargetError::MetadataInvariant(format!(
				"the change set for `{target}` is not an object"
			)));
		};

		let entries = map
			.iter()
			.map(|(field, value)| Ok((field.clone(), ChangeEntry::parse(target, field, value)?)))
			.collect::<RetargetResult<Vec<_>>>()?;

		Ok(Self { entries })
	}

	fn to_value(&self) -> Value {
		let map: Map<String, Value> = self
			.entries
			.iter()
			.map(|(field, entry)| (field.clone(), entry.to_value()))
			.collect();
		Value::Object(map)
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> impl Iterator<Item = (&str, &ChangeEntry)> {
		self.entries.iter().map(|(field, entry)| (field.as_str(), entry))
	}

	pub fn get(&self, field: &str) -> Option<&ChangeEntry> {
		self.entries
			.iter()
			.find(|(name, _)| name == field)
			.map(|(_, entry)| entry)
	}

	fn get_mut(&mut self, field: &str) -> Option<&mut ChangeEntry> {
		self.entries
			.iter_mut()
			.find(|(name, _)| name == field)
			.map(|(_, entry)| entry)
	}

	fn get_or_insert(&mut self, field: &str, default: ChangeEntry) -> &mut ChangeEntry {
		let index = match self.entries.iter().position(|(name, _)| name == field) {
			Some(index) => index,
			None => {
				self.entries.push((field.to_string(), default));
				self.entries.len() - 1
			}
		};
		&mut self.entries[index].1
	}

	fn remove(&mut self, field: &str) {
		self.entries.retain(|(name, _)| name != field);
	}

	/// Members listed for a move in `direction`.
	pub fn moves(&self, direction: MoveDirection) -> &[String] {
		match self.get(direction.key()) {
			Some(ChangeEntry::Moves(keys)) => keys,
			_ => &[],
		}
	}

	/// Record the inverse of members moved in `direction`. A member this set
	/// already wants moved the same way cancels out instead.
	fn record_inverse_moves(&mut self, direction: MoveDirection, moved: &[String]) {
		for key in moved {
			if let Some(ChangeEntry::Moves(same)) = self.get_mut(direction.key()) {
				if let Some(index) = same.iter().position(|existing| existing == key) {
					same.remove(index);
					continue;
				}
			}

			let opposite = self.get_or_insert(
				direction.opposite().key(),
				ChangeEntry::Moves(Vec::new()),
			);
			if let ChangeEntry::Moves(keys) = opposite {
				if !keys.contains(key) {
					keys.push(key.clone());
				}
			}
		}
	}

	/// Drop entries that no longer change anything.
	fn prune_empty(&mut self) {
		self.entries.retain(|(_, entry)| !entry.is_empty());
	}
}

/// All recorded change sets, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetChanges {
	sets: Vec<(String, ChangeSet)>,
}

impl TargetChanges {
	/// Read the `targetChanges` node of a document.
	pub fn from_document(document: &ConfigDocument) -> RetargetResult<Self> {
		let Some(raw) = document.metadata()?.get(TARGET_CHANGES_KEY) else {
			return Ok(Self::default());
		};

		let Value::Object(map) = raw else {
			return Err(RetargetError::MetadataInvariant(format!(
				"`{TARGET_CHANGES_KEY}` is not an object"
			)));
		};

		let sets = map
			.iter()
			.map(|(target, value)| Ok((target.clone(), ChangeSet::parse(target, value)?)))
			.collect::<RetargetResult<Vec<_>>>()?;

		Ok(Self { sets })
	}

	fn to_value(&self) -> Value {
		let map: Map<String, Value> = self
			.sets
			.iter()
			.map(|(target, set)| (target.clone(), set.to_value()))
			.collect();
		Value::Object(map)
	}

	pub fn get(&self, target: &str) -> Option<&ChangeSet> {
		self.sets
			.iter()
			.find(|(name, _)| name == target)
			.map(|(_, set)| set)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangeSet)> {
		self.sets.iter().map(|(target, set)| (target.as_str(), set))
	}

	fn ensure(&mut self, target: &str) -> &mut ChangeSet {
		let index = match self.sets.iter().position(|(name, _)| name == target) {
			Some(index) => index,
			None => {
				self.sets.push((target.to_string(), ChangeSet::default()));
				self.sets.len() - 1
			}
		};
		&mut self.sets[index].1
	}

	fn take(&mut self, target: &str) -> Option<ChangeSet> {
		let index = self.sets.iter().position(|(name, _)| name == target)?;
		Some(self.sets.remove(index).1)
	}
}

/// Kind of a live field addressed by member-keyed overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
	Sequence,
	Keyed,
}

/// Mutable view of a live document field that member overrides apply to.
enum LiveField<'a> {
	Sequence(&'a mut Vec<Value>),
	Keyed(&'a mut Map<String, Value>),
}

impl LiveField<'_> {
	fn kind(&self) -> FieldKind {
		match self {
			Self::Sequence(_) => FieldKind::Sequence,
			Self::Keyed(_) => FieldKind::Keyed,
		}
	}

	/// The override that would restore `member` to its current state.
	fn read(&self, member: &str) -> MemberOverride {
		match self {
			Self::Sequence(items) => {
				let present = items.iter().any(|item| item.as_str() == Some(member));
				MemberOverride::SequenceMembership(if present {
					Membership::Present
				} else {
					Membership::Absent
				})
			}
			Self::Keyed(map) => MemberOverride::KeyedValue(map.get(member).cloned()),
		}
	}

	fn apply(&mut self, member: &str, desired: &MemberOverride) {
		match (self, desired) {
			(Self::Sequence(items), MemberOverride::SequenceMembership(Membership::Present)) => {
				if !items.iter().any(|item| item.as_str() == Some(member)) {
					items.push(Value::from(member));
				}
			}
			(Self::Sequence(items), MemberOverride::SequenceMembership(Membership::Absent)) => {
				items.retain(|item| item.as_str() != Some(member));
			}
			(Self::Keyed(map), MemberOverride::KeyedValue(Some(value))) => {
				map.insert(member.to_string(), value.clone());
			}
			(Self::Keyed(map), MemberOverride::KeyedValue(None)) => {
				map.shift_remove(member);
			}
			(Self::Sequence(_), MemberOverride::KeyedValue(_))
			| (Self::Keyed(_), MemberOverride::SequenceMembership(_)) => {
				unreachable!("overrides are parsed against the field kind they apply to")
			}
		}
	}
}

/// Return the mapping field `name`, creating it when absent.
fn mapping_field_mut<'a>(
	root: &'a mut Map<String, Value>,
	name: &str,
) -> RetargetResult<&'a mut Map<String, Value>> {
	let value = root
		.entry(name.to_string())
		.or_insert_with(|| Value::Object(Map::new()));

	value.as_object_mut().ok_or_else(|| {
		RetargetError::FieldShape {
			field: name.to_string(),
			reason: "expected an object".to_string(),
		}
	})
}

/// Return the live field addressed by member overrides, creating it when
/// absent. An absent field becomes a sequence only if some member asks for
/// `+`.
fn live_field_mut<'a>(
	root: &'a mut Map<String, Value>,
	field: &str,
	members: &Map<String, Value>,
) -> RetargetResult<LiveField<'a>> {
	if !root.contains_key(field) {
		let wants_sequence = members.values().any(|value| value.as_str() == Some(PRESENT));
		let empty = if wants_sequence {
			Value::Array(Vec::new())
		} else {
			Value::Object(Map::new())
		};
		root.insert(field.to_string(), empty);
	}

	match root.get_mut(field) {
		Some(Value::Array(items)) => Ok(LiveField::Sequence(items)),
		Some(Value::Object(map)) => Ok(LiveField::Keyed(map)),
		_ => {
			Err(RetargetError::FieldShape {
				field: field.to_string(),
				reason: "member overrides need an object or an array".to_string(),
			})
		}
	}
}

fn sort_mapping(map: &mut Map<String, Value>) {
	let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
	entries.sort_by(|a, b| a.0.cmp(&b.0));
	map.extend(entries);
}

/// The config overlay engine.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
	targets: &'a TargetSet,
	primary: &'a str,
	secondary: &'a str,
}

impl<'a> Overlay<'a> {
	/// `primary` and `secondary` name the two mapping fields that dependency
	/// moves relocate members between.
	pub fn new(targets: &'a TargetSet, primary: &'a str, secondary: &'a str) -> Self {
		Self {
			targets,
			primary,
			secondary,
		}
	}

	fn endpoints(&self, direction: MoveDirection) -> (&'a str, &'a str) {
		match direction {
			MoveDirection::ToPrimary => (self.secondary, self.primary),
			MoveDirection::ToSecondary => (self.primary, self.secondary),
		}
	}

	/// Switch `document` to `new_target`, returning the target that was active
	/// before. Nothing is touched when `new_target` is already active.
	pub fn switch_target(
		&self,
		document: &mut ConfigDocument,
		new_target: &Target,
	) -> RetargetResult<Target> {
		let new_target = self.targets.resolve(new_target.as_str())?;
		let old_target = self.targets.resolve(document.current_target()?)?;

		if old_target == new_target {
			debug!(selected = %new_target, "config document already on target");
			return Ok(new_target);
		}

		let mut changes = TargetChanges::from_document(document)?;
		if changes.get(old_target.as_str()).is_some() {
			return Err(RetargetError::MetadataInvariant(format!(
				"`{TARGET_CHANGES_KEY}` holds an entry for the active target `{old_target}`"
			)));
		}

		for other in self.targets.others(&new_target) {
			changes.ensure(other.as_str());
		}

		let incoming = changes.take(new_target.as_str()).unwrap_or_else(|| {
			warn!(selected = %new_target, "no recorded changes for target, treating as empty");
			ChangeSet::default()
		});

		let metadata_key = document.metadata_key().to_string();
		let root = document.root_mut();
		mapping_field_mut(root, self.primary)?;
		mapping_field_mut(root, self.secondary)?;

		let moved_to_primary =
			self.move_members(root, MoveDirection::ToPrimary, incoming.moves(MoveDirection::ToPrimary))?;

		let mut touched = vec![self.primary.to_string(), self.secondary.to_string()];
		for (field, entry) in incoming.entries() {
			if field == metadata_key {
				return Err(RetargetError::UnsupportedOverride {
					target: new_target.to_string(),
					field: field.to_string(),
					reason: "the metadata node cannot be overridden".to_string(),
				});
			}

			match entry {
				ChangeEntry::Moves(_) => {}
				ChangeEntry::Members(members) => {
					self.apply_members(root, &mut changes, &new_target, field, members)?;
					if !touched.iter().any(|name| name == field) {
						touched.push(field.to_string());
					}
				}
				ChangeEntry::Replace(value) => {
					self.apply_replacement(root, &mut changes, &new_target, field, value)?;
				}
			}
		}

		let moved_to_secondary = self.move_members(
			root,
			MoveDirection::ToSecondary,
			incoming.moves(MoveDirection::ToSecondary),
		)?;

		for other in self.targets.others(&new_target) {
			let set = changes.ensure(other.as_str());
			let to_primary =
				self.movable_back(root, set, MoveDirection::ToPrimary, &moved_to_primary);
			let to_secondary =
				self.movable_back(root, set, MoveDirection::ToSecondary, &moved_to_secondary);
			set.record_inverse_moves(MoveDirection::ToPrimary, &to_primary);
			set.record_inverse_moves(MoveDirection::ToSecondary, &to_secondary);
			set.prune_empty();
		}

		for field in &touched {
			let emptied = match root.get_mut(field) {
				Some(Value::Object(map)) => {
					sort_mapping(map);
					map.is_empty()
				}
				Some(Value::Array(items)) => items.is_empty(),
				_ => false,
			};
			if emptied {
				root.shift_remove(field);
			}
		}

		let metadata = document.metadata_mut()?;
		metadata.insert(TARGET_CHANGES_KEY.to_string(), changes.to_value());
		metadata.insert(
			CURRENT_TARGET_KEY.to_string(),
			Value::from(new_target.as_str()),
		);

		info!(from = %old_target, to = %new_target, "switched config document");
		Ok(old_target)
	}

	/// Move `keys` in `direction`, skipping members missing from the source
	/// field. Returns the members actually moved.
	fn move_members(
		&self,
		root: &mut Map<String, Value>,
		direction: MoveDirection,
		keys: &[String],
	) -> RetargetResult<Vec<String>> {
		let (source, destination) = self.endpoints(direction);
		let mut moved = Vec::new();

		for key in keys {
			let Some(value) = mapping_field_mut(root, source)?.shift_remove(key) else {
				debug!(member = %key, from = source, "dropping stale move entry");
				continue;
			};
			mapping_field_mut(root, destination)?.insert(key.clone(), value);
			moved.push(key.clone());
		}

		Ok(moved)
	}

	/// Members moved in `direction` that `set` can move back: those still at
	/// the destination, or put back there by one of its own member overrides
	/// before its moves run.
	fn movable_back(
		&self,
		root: &Map<String, Value>,
		set: &ChangeSet,
		direction: MoveDirection,
		moved: &[String],
	) -> Vec<String> {
		let (_, destination) = self.endpoints(direction);
		let live = root.get(destination).and_then(Value::as_object);
		let restored = match set.get(destination) {
			Some(ChangeEntry::Members(members)) => Some(members),
			_ => None,
		};

		moved
			.iter()
			.filter(|key| {
				live.is_some_and(|map| map.contains_key(key.as_str()))
					|| restored
						.and_then(|members| members.get(key.as_str()))
						.is_some_and(|value| value.as_str() != Some(ABSENT))
			})
			.cloned()
			.collect()
	}

	fn apply_members(
		&self,
		root: &mut Map<String, Value>,
		changes: &mut TargetChanges,
		new_target: &Target,
		field: &str,
		members: &Map<String, Value>,
	) -> RetargetResult<()> {
		let mut live = live_field_mut(root, field, members)?;
		let kind = live.kind();

		for (member, raw) in members {
			let desired = MemberOverride::parse(kind, raw).map_err(|reason| {
				RetargetError::UnsupportedOverride {
					target: new_target.to_string(),
					field: field.to_string(),
					reason,
				}
			})?;

			for other in self.targets.others(new_target) {
				let set = changes.ensure(other.as_str());
				let entry = set.get_or_insert(field, ChangeEntry::Members(Map::new()));
				let ChangeEntry::Members(recorded) = entry else {
					return Err(RetargetError::FieldShape {
						field: field.to_string(),
						reason: format!("`{other}` records a whole-field replacement for it"),
					});
				};

				if !recorded.contains_key(member) {
					recorded.insert(member.clone(), live.read(member).to_value());
				}

				// The other target already expects the incoming value.
				if recorded.get(member) == Some(raw) {
					recorded.shift_remove(member);
				}
			}

			debug!(field, member = %member, value = %raw, "applying member override");
			live.apply(member, &desired);
		}

		Ok(())
	}

	fn apply_replacement(
		&self,
		root: &mut Map<String, Value>,
		changes: &mut TargetChanges,
		new_target: &Target,
		field: &str,
		raw: &Value,
	) -> RetargetResult<()> {
		let current = root.get(field);
		if matches!(current, Some(Value::Object(_) | Value::Array(_))) {
			return Err(RetargetError::FieldShape {
				field: field.to_string(),
				reason: "scalar replacements cannot overwrite an object or an array".to_string(),
			});
		}
		let captured = FieldReplacement::capture(current);

		for other in self.targets.others(new_target) {
			let set = changes.ensure(other.as_str());
			let entry = set.get_or_insert(field, ChangeEntry::Replace(captured.clone()));
			let ChangeEntry::Replace(recorded) = entry else {
				return Err(RetargetError::FieldShape {
					field: field.to_string(),
					reason: format!("`{other}` records member overrides for it"),
				});
			};

			if recorded == raw {
				set.remove(field);
			}
		}

		debug!(field, value = %raw, "applying field replacement");
		match FieldReplacement::parse(raw) {
			FieldReplacement::Set(value) => {
				root.insert(field.to_string(), value);
			}
			FieldReplacement::Remove => {
				root.shift_remove(field);
			}
		}

		Ok(())
	}
}
