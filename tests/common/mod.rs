//! Shared fixtures: a content checkout on disk and an in-memory package manager
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use vaultsync::error::{SyncError, SyncResult};
use vaultsync::filter::parse_filter_file;
use vaultsync::package::{create_archive, extract_archive};
use vaultsync::paths::local_path;
use vaultsync::PackageManager;

pub const FILTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workspaceFilter version="1.0">
	<filter root="/apps/myproj">
		<include pattern="/apps/myproj(/.*)?"/>
	</filter>
</workspaceFilter>
"#;

pub fn write(path: &Path, content: &str) {
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, content).unwrap();
}

/// Checkout with the given filter.xml; returns (tempdir, content root)
pub fn checkout(filter_xml: &str) -> (TempDir, PathBuf) {
	let tmp = TempDir::new().unwrap();
	let root = tmp.path().join("ui.apps");
	write(&root.join("META-INF/vault/filter.xml"), filter_xml);
	fs::create_dir_all(root.join("jcr_root")).unwrap();
	(tmp, root)
}

pub fn copy_tree(source: &Path, target: &Path) {
	if source.is_dir() {
		fs::create_dir_all(target).unwrap();
		for entry in fs::read_dir(source).unwrap() {
			let entry = entry.unwrap();
			copy_tree(&entry.path(), &target.join(entry.file_name()));
		}
	} else {
		fs::create_dir_all(target.parent().unwrap()).unwrap();
		fs::copy(source, target).unwrap();
	}
}

fn remove_any(path: &Path) {
	if path.is_dir() {
		fs::remove_dir_all(path).unwrap();
	} else if path.exists() {
		fs::remove_file(path).unwrap();
	}
}

#[derive(Default)]
struct FakeState {
	/// file name -> stored archive
	packages: HashMap<String, PathBuf>,
	calls: Vec<String>,
	/// Folders uploaded archives were read from
	upload_dirs: Vec<PathBuf>,
	posted: Vec<(String, String)>,
}

/// Package manager backed by a folder acting as the repository
///
/// Installing a package replaces every filter root with the package content;
/// building fills the package with the repository content below its roots.
pub struct FakePackageManager {
	dir: TempDir,
	state: Mutex<FakeState>,
	fail_on: Mutex<Option<String>>,
}

impl FakePackageManager {
	pub fn new() -> Self {
		let dir = TempDir::new().unwrap();
		fs::create_dir_all(dir.path().join("repo/jcr_root")).unwrap();
		fs::create_dir_all(dir.path().join("store")).unwrap();
		FakePackageManager { dir, state: Mutex::new(FakeState::default()), fail_on: Mutex::new(None) }
	}

	/// `jcr_root` of the simulated repository
	pub fn repo(&self) -> PathBuf {
		self.dir.path().join("repo/jcr_root")
	}

	/// Make the given command (`upload`, `install`, ...) fail
	pub fn fail_on(&self, command: &str) {
		*self.fail_on.lock().unwrap() = Some(command.to_string());
	}

	/// Commands received so far, e.g. `install tmp/repo/repo_apps_myproj-1.zip`
	pub fn calls(&self) -> Vec<String> {
		self.state.lock().unwrap().calls.clone()
	}

	pub fn commands(&self) -> Vec<String> {
		self.calls().iter().map(|c| c.split(' ').next().unwrap().to_string()).collect()
	}

	pub fn upload_dirs(&self) -> Vec<PathBuf> {
		self.state.lock().unwrap().upload_dirs.clone()
	}

	pub fn posted(&self) -> Vec<(String, String)> {
		self.state.lock().unwrap().posted.clone()
	}

	pub fn stored_packages(&self) -> usize {
		self.state.lock().unwrap().packages.len()
	}

	fn record(&self, command: &str, arg: &str) -> SyncResult<()> {
		self.state.lock().unwrap().calls.push(format!("{} {}", command, arg));
		if self.fail_on.lock().unwrap().as_deref() == Some(command) {
			return Err(SyncError::RemoteProtocol {
				url: format!("fake:{}", command),
				status: Some(500),
				message: String::new(),
			});
		}
		Ok(())
	}

	fn stored(&self, package_path: &str) -> SyncResult<PathBuf> {
		let name = package_path.rsplit('/').next().unwrap_or(package_path);
		self.state.lock().unwrap().packages.get(name).cloned().ok_or_else(|| {
			SyncError::RemoteProtocol {
				url: format!("fake:{}", package_path),
				status: Some(404),
				message: String::new(),
			}
		})
	}

	fn unpack(&self, package_path: &str) -> SyncResult<TempDir> {
		let archive = self.stored(package_path)?;
		let unpacked = TempDir::new()?;
		extract_archive(&archive, unpacked.path())?;
		Ok(unpacked)
	}
}

#[async_trait]
impl PackageManager for FakePackageManager {
	fn server_url(&self) -> &str {
		"http://fake:4502"
	}

	async fn upload(&self, archive: &Path) -> SyncResult<()> {
		let name = archive.file_name().unwrap().to_string_lossy().into_owned();
		self.record("upload", &name)?;
		let stored = self.dir.path().join("store").join(&name);
		fs::copy(archive, &stored)?;
		let mut state = self.state.lock().unwrap();
		state.upload_dirs.push(archive.parent().unwrap().to_path_buf());
		state.packages.insert(name, stored);
		Ok(())
	}

	async fn install(&self, package_path: &str) -> SyncResult<()> {
		self.record("install", package_path)?;
		let unpacked = self.unpack(package_path)?;
		let filters = parse_filter_file(&unpacked.path().join("META-INF/vault/filter.xml"))?;
		for filter in &filters {
			let target = local_path(&self.repo(), filter.root());
			remove_any(&target);
			let source = local_path(&unpacked.path().join("jcr_root"), filter.root());
			if source.exists() {
				copy_tree(&source, &target);
			}
		}
		Ok(())
	}

	async fn build(&self, package_path: &str) -> SyncResult<()> {
		self.record("build", package_path)?;
		let unpacked = self.unpack(package_path)?;
		let filters = parse_filter_file(&unpacked.path().join("META-INF/vault/filter.xml"))?;
		let jcr_root = unpacked.path().join("jcr_root");
		remove_any(&jcr_root);
		fs::create_dir_all(&jcr_root)?;
		for filter in &filters {
			let source = local_path(&self.repo(), filter.root());
			if source.exists() {
				copy_tree(&source, &local_path(&jcr_root, filter.root()));
			}
		}
		let stored = self.stored(package_path)?;
		fs::remove_file(&stored)?;
		create_archive(unpacked.path(), &stored)?;
		Ok(())
	}

	async fn delete(&self, package_path: &str) -> SyncResult<()> {
		self.record("delete", package_path)?;
		let name = package_path.rsplit('/').next().unwrap_or(package_path).to_string();
		self.state.lock().unwrap().packages.remove(&name);
		Ok(())
	}

	async fn download(&self, package_path: &str, dest: &Path) -> SyncResult<()> {
		self.record("download", package_path)?;
		fs::copy(self.stored(package_path)?, dest)?;
		Ok(())
	}

	async fn post_file(&self, parent_path: &str, file: &Path) -> SyncResult<()> {
		let name = file.file_name().unwrap().to_string_lossy().into_owned();
		self.record("post", &name)?;
		self.state.lock().unwrap().posted.push((parent_path.to_string(), name));
		Ok(())
	}
}

// vim: ts=4
