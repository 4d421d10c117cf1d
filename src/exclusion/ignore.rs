//! Aggregation of `.vltignore` files
//!
//! The effective ignore text for a sync is the fixed exclusion list, the
//! `.vltignore` next to `jcr_root`, and every `.vltignore` found below the
//! sync root with its lines re-anchored to the directory it lives in.

use std::fs;
use std::path::{Path, PathBuf};

use super::{ExclusionError, IgnoreRuleSet, BASIC_EXCLUDES};
use crate::logging::*;
use crate::paths::to_slash;

pub const IGNORE_FILE_NAME: &str = ".vltignore";

fn read_ignore_file(path: &Path) -> Result<String, ExclusionError> {
	fs::read_to_string(path)
		.map_err(|e| ExclusionError::IgnoreFileError(format!("{}: {}", path.display(), e)))
}

/// Rewrite a line of a nested ignore file so it applies relative to the sync root
fn rebase_line(dir: &str, line: &str) -> Option<String> {
	let line = line.trim();
	if line.is_empty() || line.starts_with('#') {
		return None;
	}
	if dir.is_empty() {
		return Some(line.to_string());
	}
	let (bang, body) = match line.strip_prefix('!') {
		Some(rest) => ("!", rest.trim()),
		None => ("", line),
	};
	let rebased = if let Some(anchored) = body.strip_prefix('/') {
		format!("/{}/{}", dir, anchored)
	} else if body.contains('/') {
		format!("/{}/{}", dir, body)
	} else {
		format!("/{}/**/{}", dir, body)
	};
	Some(format!("{}{}", bang, rebased))
}

/// Build the aggregated ignore text for a sync of `sync_root`
pub fn build_ignore_text(content_root: &Path, sync_root: &Path) -> Result<String, ExclusionError> {
	let mut text = String::new();
	for exclude in BASIC_EXCLUDES {
		text.push_str(exclude);
		text.push('\n');
	}

	let checkout_file = content_root.join(IGNORE_FILE_NAME);
	if checkout_file.is_file() {
		text.push_str(&read_ignore_file(&checkout_file)?);
		text.push('\n');
	}

	if !sync_root.is_dir() {
		return Ok(text);
	}

	let pattern = format!(
		"{}/**/{}",
		glob::Pattern::escape(&sync_root.to_string_lossy()),
		IGNORE_FILE_NAME
	);
	let entries = glob::glob(&pattern)
		.map_err(|e| ExclusionError::InvalidPattern(format!("{}: {}", pattern, e)))?;
	let mut files: Vec<PathBuf> = entries
		.filter_map(|entry| match entry {
			Ok(path) => Some(path),
			Err(e) => {
				warn!("Cannot read {} while collecting ignore files: {}", e.path().display(), e);
				None
			}
		})
		.filter(|path| *path != checkout_file)
		.collect();
	files.sort();

	for file in files {
		let dir = file
			.parent()
			.and_then(|parent| parent.strip_prefix(sync_root).ok())
			.map(to_slash)
			.unwrap_or_default();
		debug!("Including ignore file {}", file.display());
		for line in read_ignore_file(&file)?.lines() {
			if let Some(rebased) = rebase_line(&dir, line) {
				text.push_str(&rebased);
				text.push('\n');
			}
		}
	}
	Ok(text)
}

/// Build and compile the ignore rules for a sync of `sync_root`
pub fn load_ignore_rules(
	content_root: &Path,
	sync_root: &Path,
) -> Result<IgnoreRuleSet, ExclusionError> {
	let text = build_ignore_text(content_root, sync_root)?;
	IgnoreRuleSet::parse(&text)
}


// vim: ts=4
