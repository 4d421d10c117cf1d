//! Ignore-file pattern compiler
//!
//! Translates `.vltignore` lines into two anchored alternation regexes, one
//! for ignore rules and one for `!` negations.

use regex::Regex;

use super::ExclusionError;

/// Compiled accept/deny predicates over paths relative to the sync root
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
	/// Paths to leave out
	positive: Option<Regex>,

	/// Paths to keep even when a positive rule matches
	negative: Option<Regex>,
}

impl IgnoreRuleSet {
	/// A rule set that accepts everything
	pub fn empty() -> Self {
		Self::default()
	}

	/// Compile ignore-file text
	pub fn parse(text: &str) -> Result<Self, ExclusionError> {
		let mut positives = Vec::new();
		let mut negatives = Vec::new();
		for line in text.lines().map(str::trim) {
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			match line.strip_prefix('!') {
				Some(negated) => {
					let negated = negated.trim();
					if !negated.is_empty() {
						negatives.push(negated.to_string());
					}
				}
				None => positives.push(line.to_string()),
			}
		}
		positives.sort();
		negatives.sort();
		Ok(IgnoreRuleSet {
			positive: compile_alternation(&positives)?,
			negative: compile_alternation(&negatives)?,
		})
	}

	/// True if the path survives the rules; negations always win
	pub fn accepts(&self, path: &str) -> bool {
		let path = path.trim_start_matches('/');
		if let Some(ref negative) = self.negative {
			if negative.is_match(path) {
				return true;
			}
		}
		match self.positive {
			Some(ref positive) => !positive.is_match(path),
			None => true,
		}
	}

	pub fn denies(&self, path: &str) -> bool {
		!self.accepts(path)
	}
}

fn compile_alternation(patterns: &[String]) -> Result<Option<Regex>, ExclusionError> {
	if patterns.is_empty() {
		return Ok(None);
	}
	let alternation: Vec<String> =
		patterns.iter().map(|p| format!("({})", glob_to_regex(p))).collect();
	let source = format!("^({})$", alternation.join("|"));
	Regex::new(&source)
		.map(Some)
		.map_err(|e| ExclusionError::InvalidPattern(format!("{}: {}", source, e)))
}

/// Translate one glob-like line into a regex fragment
pub(crate) fn glob_to_regex(pattern: &str) -> String {
	let anchored = pattern.starts_with('/');
	let mut body = pattern.trim_start_matches('/');
	let dir_only = body.len() > 1 && body.ends_with('/');
	if dir_only {
		body = body.trim_end_matches('/');
	}

	let mut prefix = "";
	let mut suffix = "";
	if let Some(rest) = body.strip_prefix("**/") {
		body = rest;
		prefix = "(.*/)?";
	} else if body.starts_with("*.") {
		// extension patterns match files at any depth, never a folder's content
		prefix = "(.*/)?";
	} else if !anchored && !body.contains('/') {
		// bare names match at any depth, including whole subtrees
		prefix = "(.*/)?";
		suffix = "(/.*)?";
	}
	if anchored || dir_only || (suffix.is_empty() && body.contains('/') && prefix.is_empty()) {
		suffix = "(/.*)?";
	}

	format!("{}{}{}", prefix, translate_wildcards(body), suffix)
}

fn translate_wildcards(body: &str) -> String {
	let mut out = String::with_capacity(body.len() * 2);
	let chars: Vec<char> = body.chars().collect();
	let mut i = 0;
	while i < chars.len() {
		if chars[i] == '*' {
			if chars.get(i + 1) == Some(&'*') {
				let slash_before = i > 0 && chars[i - 1] == '/';
				let slash_after = chars.get(i + 2) == Some(&'/');
				if slash_before && slash_after {
					// `a/**/b` also matches `a/b`
					out.push_str("(.*/)?");
					i += 3;
				} else {
					out.push_str("(.+)");
					i += 2;
				}
			} else {
				out.push_str("([^/]*)");
				i += 1;
			}
		} else {
			let mut buf = [0u8; 4];
			out.push_str(&regex::escape(chars[i].encode_utf8(&mut buf)));
			i += 1;
		}
	}
	out
}


// vim: ts=4
