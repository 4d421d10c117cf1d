//! META-INF/vault generation

use quick_xml::escape::escape;
use std::fs;

use super::TempWorkspace;
use crate::error::SyncResult;
use crate::filter::{write_filter_xml, Filter};
use crate::paths::{narrowed_root, package_name, package_version};

/// Name, group and version of a temporary package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
	pub name: String,
	pub group: String,
	pub version: String,
}

impl PackageInfo {
	/// Package for a sync of `remote_path`, versioned with the current time
	pub fn new(remote_path: &str, group: &str) -> Self {
		PackageInfo {
			name: package_name(remote_path),
			group: group.trim_matches('/').to_string(),
			version: package_version(),
		}
	}

	pub fn file_name(&self) -> String {
		format!("{}-{}.zip", self.name, self.version)
	}

	/// Path below `/etc/packages` once uploaded
	pub fn package_path(&self) -> String {
		if self.group.is_empty() {
			self.file_name()
		} else {
			format!("{}/{}", self.group, self.file_name())
		}
	}
}

/// properties.xml in the java properties XML layout
pub fn properties_xml(info: &PackageInfo) -> String {
	format!(
		"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n\
		 <!DOCTYPE properties SYSTEM \"http://java.sun.com/dtd/properties.dtd\">\n\
		 <properties>\n\
		 <entry key=\"name\">{}</entry>\n\
		 <entry key=\"version\">{}</entry>\n\
		 <entry key=\"group\">{}</entry>\n\
		 </properties>\n",
		escape(info.name.as_str()),
		escape(info.version.as_str()),
		escape(info.group.as_str())
	)
}

/// Filters to write into a package for a sync of `remote_path`
///
/// `selected` indexes into `filters`. When the sync targets something
/// strictly below a filter root, that filter is replaced by a rule-less
/// filter rooted at the synced node.
pub fn package_filters(filters: &[Filter], selected: &[usize], remote_path: &str) -> Vec<Filter> {
	let mut out: Vec<Filter> = Vec::new();
	for &index in selected {
		let filter = match filters.get(index) {
			Some(filter) => filter,
			None => continue,
		};
		let candidate = if remote_path != "/"
			&& filter.covers(remote_path)
			&& remote_path != filter.root()
		{
			Filter::new(narrowed_root(remote_path), Vec::new())
		} else {
			filter.clone()
		};
		if !out.iter().any(|f| f.root() == candidate.root()) {
			out.push(candidate);
		}
	}
	out
}

/// Write filter.xml and properties.xml into the workspace
pub fn write_meta_inf(
	workspace: &TempWorkspace,
	info: &PackageInfo,
	filters: &[Filter],
) -> SyncResult<()> {
	let vault = workspace.vault_dir();
	fs::create_dir_all(&vault)?;
	fs::create_dir_all(workspace.jcr_root())?;
	fs::write(vault.join("filter.xml"), write_filter_xml(filters))?;
	fs::write(vault.join("properties.xml"), properties_xml(info))?;
	Ok(())
}


// vim: ts=4
