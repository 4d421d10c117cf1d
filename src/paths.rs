//! Mapping between local checkout paths and repository paths

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{SyncError, SyncResult};

/// Folder that mirrors the repository root in a checkout and in a package
pub const JCR_ROOT: &str = "jcr_root";

/// Marker file carrying folder-level properties
pub const CONTENT_XML: &str = ".content.xml";

/// Where a local path sits inside its checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPath {
	/// Folder holding `jcr_root` and `META-INF`
	pub content_root: PathBuf,
	/// The `jcr_root` folder itself
	pub jcr_root: PathBuf,
	/// Repository path, `/` for `jcr_root` itself
	pub remote_path: String,
}

impl CheckoutPath {
	/// Locate `path` by its first `jcr_root` component
	pub fn locate(path: &Path) -> SyncResult<Self> {
		let mut content_root = PathBuf::new();
		let mut components = path.components();
		loop {
			match components.next() {
				Some(Component::Normal(name)) if name == JCR_ROOT => break,
				Some(c) => content_root.push(c),
				None => {
					return Err(SyncError::NotInCheckout { path: path.display().to_string() })
				}
			}
		}
		let rest: PathBuf = components.collect();
		let jcr_root = content_root.join(JCR_ROOT);
		Ok(CheckoutPath { content_root, jcr_root, remote_path: to_remote(&rest) })
	}

	/// Local file or folder for a repository path
	pub fn local_path(&self, remote_path: &str) -> PathBuf {
		local_path(&self.jcr_root, remote_path)
	}
}

/// Join path components with `/`, dropping roots and `.`
pub fn to_slash(path: &Path) -> String {
	path.components()
		.filter_map(|c| match c {
			Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
			_ => None,
		})
		.collect::<Vec<_>>()
		.join("/")
}

fn to_remote(relative: &Path) -> String {
	format!("/{}", to_slash(relative))
}

/// Repository path of `file`, which must live under `jcr_root`
pub fn remote_path(jcr_root: &Path, file: &Path) -> Option<String> {
	file.strip_prefix(jcr_root).ok().map(to_remote)
}

/// Local path of `remote_path` under `jcr_root`
pub fn local_path(jcr_root: &Path, remote_path: &str) -> PathBuf {
	let mut path = jcr_root.to_path_buf();
	for segment in remote_path.split('/').filter(|s| !s.is_empty()) {
		path.push(segment);
	}
	path
}

/// Parent repository path (`/` is its own parent)
pub fn remote_parent(remote_path: &str) -> &str {
	match remote_path.rfind('/') {
		Some(0) | None => "/",
		Some(i) => &remote_path[..i],
	}
}

pub fn is_content_xml(remote_path: &str) -> bool {
	remote_path.rsplit('/').next() == Some(CONTENT_XML)
}

/// `repo_` plus the path with separators turned into `_`, no doubled underscores
pub fn package_name(remote_path: &str) -> String {
	let mut name = format!("repo_{}", remote_path.replace(['/', '\\'], "_"));
	while name.contains("__") {
		name = name.replace("__", "_");
	}
	name
}

/// Package version: current epoch milliseconds
pub fn package_version() -> String {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis())
		.unwrap_or(0)
		.to_string()
}

/// Filter root used when only a sub-tree of a filter root is synced
///
/// Serialized node names are mapped back to repository names.
pub fn narrowed_root(remote_path: &str) -> String {
	let trimmed = if let Some(folder) = remote_path.strip_suffix("/.content.xml") {
		folder
	} else if let Some(node) = remote_path.strip_suffix("_cq_editConfig.xml") {
		return format!("{}_cq_editConfig", node).replace("/_cq_", "/cq:");
	} else {
		remote_path
	};
	let root = trimmed.replace("/_cq_", "/cq:");
	if root.is_empty() {
		"/".to_string()
	} else {
		root
	}
}

/// Browser URL of a repository path on the server
///
/// `.content.xml` maps to its folder and folders render as `<folder>.html`.
pub fn remote_url(server_url: &str, remote_path: &str, is_dir: bool) -> String {
	let server = server_url.trim_end_matches('/');
	let mut path = match remote_path.strip_suffix(CONTENT_XML) {
		Some(folder) => folder.to_string(),
		None => remote_path.to_string(),
	};
	if is_dir && !path.ends_with('/') {
		path.push('/');
	}
	if path.ends_with('/') && path != "/" {
		path = format!("{}.html", path.trim_end_matches('/'));
	}
	format!("{}{}", server, path)
}


// vim: ts=4
