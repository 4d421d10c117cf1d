use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of evaluating one path for one sync operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncVerdict {
	Included,
	Ignored,
	Excluded,
	ExcludedByIgnoreFile,
	DeletedFromRemote,
}

impl SyncVerdict {
	/// Numeric code used on the wire
	pub fn code(self) -> i8 {
		match self {
			SyncVerdict::Included => 1,
			SyncVerdict::Ignored => 0,
			SyncVerdict::Excluded => -1,
			SyncVerdict::ExcludedByIgnoreFile => -2,
			SyncVerdict::DeletedFromRemote => -3,
		}
	}

	pub fn from_code(code: i8) -> Option<Self> {
		match code {
			1 => Some(SyncVerdict::Included),
			0 => Some(SyncVerdict::Ignored),
			-1 => Some(SyncVerdict::Excluded),
			-2 => Some(SyncVerdict::ExcludedByIgnoreFile),
			-3 => Some(SyncVerdict::DeletedFromRemote),
			_ => None,
		}
	}

	/// True when the path travelled (or was removed) during the sync
	pub fn is_synced(self) -> bool {
		matches!(self, SyncVerdict::Included | SyncVerdict::DeletedFromRemote)
	}
}

impl fmt::Display for SyncVerdict {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			SyncVerdict::Included => "included",
			SyncVerdict::Ignored => "ignored",
			SyncVerdict::Excluded => "excluded",
			SyncVerdict::ExcludedByIgnoreFile => "excluded-by-ignore",
			SyncVerdict::DeletedFromRemote => "deleted-from-remote",
		};
		write!(f, "{}", s)
	}
}

impl Serialize for SyncVerdict {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i8(self.code())
	}
}

impl<'de> Deserialize<'de> for SyncVerdict {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let code = i8::deserialize(deserializer)?;
		SyncVerdict::from_code(code)
			.ok_or_else(|| de::Error::custom(format!("unknown sync verdict code {}", code)))
	}
}

/// Verdict of one path plus the index of the filter that decided it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
	pub verdict: SyncVerdict,
	pub owner: Option<usize>,
}

impl StatusEntry {
	pub fn new(verdict: SyncVerdict, owner: Option<usize>) -> Self {
		StatusEntry { verdict, owner }
	}
}

/// Remote path -> verdict, rebuilt for every operation
pub type FileSyncStatus = BTreeMap<String, StatusEntry>;

/// One `{path, result}` pair handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEntry {
	pub path: String,
	pub verdict: SyncVerdict,
}

impl Serialize for SyncEntry {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut state = serializer.serialize_struct("SyncEntry", 2)?;
		state.serialize_field("path", &self.path)?;
		state.serialize_field("result", &self.verdict)?;
		state.end()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncAction {
	Push,
	Pull,
}

impl fmt::Display for SyncAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncAction::Push => write!(f, "push"),
			SyncAction::Pull => write!(f, "pull"),
		}
	}
}

/// States of the push and pull pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
	/// Request accepted, nothing started yet
	Idle,
	ParsingFilters,
	Staging,
	Archiving,
	Uploading,
	Installing,
	Building,
	Downloading,
	Extracting,
	Reconciling,
	CleaningUp,
	Done,
	Failed,
}

impl fmt::Display for SyncPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			SyncPhase::Idle => "idle",
			SyncPhase::ParsingFilters => "parsing filters",
			SyncPhase::Staging => "staging",
			SyncPhase::Archiving => "archiving",
			SyncPhase::Uploading => "uploading",
			SyncPhase::Installing => "installing",
			SyncPhase::Building => "building",
			SyncPhase::Downloading => "downloading",
			SyncPhase::Extracting => "extracting",
			SyncPhase::Reconciling => "reconciling",
			SyncPhase::CleaningUp => "cleaning up",
			SyncPhase::Done => "done",
			SyncPhase::Failed => "failed",
		};
		write!(f, "{}", s)
	}
}

/// How much of a sync request actually travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSummary {
	None,
	Partial,
	Full,
}

impl SyncSummary {
	pub fn from_entries(entries: &[SyncEntry]) -> Self {
		let synced = entries.iter().filter(|e| e.verdict.is_synced()).count();
		if synced == 0 {
			SyncSummary::None
		} else if synced == entries.len() {
			SyncSummary::Full
		} else {
			SyncSummary::Partial
		}
	}
}

/// Flatten a status map into `{path, verdict}` pairs, ordered by path
pub fn to_entries(status: &FileSyncStatus) -> Vec<SyncEntry> {
	status
		.iter()
		.map(|(path, entry)| SyncEntry { path: path.clone(), verdict: entry.verdict })
		.collect()
}


// vim: ts=4
