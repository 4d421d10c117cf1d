//! Workspace filters
//!
//! A filter governs one repository root and decides, by an ordered list of
//! include/exclude regular expressions, which paths below it travel in a
//! content package.

mod xml;

pub use xml::{default_filter_file, parse_filter_file, parse_filter_xml, write_filter_xml};

use regex::Regex;

use crate::types::SyncVerdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
	Include,
	Exclude,
}

impl RuleKind {
	fn verdict(self) -> SyncVerdict {
		match self {
			RuleKind::Include => SyncVerdict::Included,
			RuleKind::Exclude => SyncVerdict::Excluded,
		}
	}

	fn opposite(self) -> Self {
		match self {
			RuleKind::Include => RuleKind::Exclude,
			RuleKind::Exclude => RuleKind::Include,
		}
	}

	pub(crate) fn element_name(self) -> &'static str {
		match self {
			RuleKind::Include => "include",
			RuleKind::Exclude => "exclude",
		}
	}
}

/// One include or exclude rule; the pattern is searched, not anchored
#[derive(Debug, Clone)]
pub struct FilterRule {
	pub kind: RuleKind,
	pub pattern: Regex,
}

impl FilterRule {
	pub fn new(kind: RuleKind, pattern: &str) -> Result<Self, regex::Error> {
		Ok(FilterRule { kind, pattern: Regex::new(pattern)? })
	}

	pub fn include(pattern: &str) -> Result<Self, regex::Error> {
		Self::new(RuleKind::Include, pattern)
	}

	pub fn exclude(pattern: &str) -> Result<Self, regex::Error> {
		Self::new(RuleKind::Exclude, pattern)
	}

	pub fn matches(&self, path: &str) -> bool {
		self.pattern.is_match(path)
	}
}

impl PartialEq for FilterRule {
	fn eq(&self, other: &Self) -> bool {
		self.kind == other.kind && self.pattern.as_str() == other.pattern.as_str()
	}
}

/// Root path plus ordered rules
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
	root: String,
	rules: Vec<FilterRule>,
	default_action: RuleKind,
}

impl Filter {
	/// Build a filter; the default action is the opposite of the first rule
	/// (include when there are no rules)
	pub fn new(root: impl Into<String>, rules: Vec<FilterRule>) -> Self {
		let default_action = rules.first().map(|r| r.kind.opposite()).unwrap_or(RuleKind::Include);
		Filter { root: normalize_root(root.into()), rules, default_action }
	}

	pub fn root(&self) -> &str {
		&self.root
	}

	pub fn rules(&self) -> &[FilterRule] {
		&self.rules
	}

	pub fn default_action(&self) -> RuleKind {
		self.default_action
	}

	/// True when `path` is the root itself or lies below it
	pub fn covers(&self, path: &str) -> bool {
		is_same_or_descendant(path, &self.root)
	}

	/// True when the filter has something to say about a sync of `remote_path`:
	/// either the path lies under the root or the root lies under the path
	pub fn is_relevant_to(&self, remote_path: &str) -> bool {
		self.covers(remote_path) || is_same_or_descendant(&self.root, remote_path)
	}

	/// Evaluate `path`; later matching rules override earlier ones
	pub fn get_sync_status(&self, path: &str) -> SyncVerdict {
		if !self.covers(path) {
			return SyncVerdict::Ignored;
		}
		self.rules
			.iter()
			.rev()
			.find(|rule| rule.matches(path))
			.map(|rule| rule.kind.verdict())
			.unwrap_or_else(|| self.default_action.verdict())
	}
}

fn normalize_root(root: String) -> String {
	let trimmed = root.trim_end_matches('/');
	if trimmed.is_empty() {
		"/".to_string()
	} else {
		trimmed.to_string()
	}
}

/// Component-aware prefix test on POSIX-style repository paths
pub(crate) fn is_same_or_descendant(path: &str, ancestor: &str) -> bool {
	if ancestor == "/" {
		return path.starts_with('/');
	}
	match path.strip_prefix(ancestor) {
		Some(rest) => rest.is_empty() || rest.starts_with('/'),
		None => false,
	}
}


// vim: ts=4
