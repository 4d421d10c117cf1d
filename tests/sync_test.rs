//! Push and pull pipelines against an in-memory package manager

mod common;

use common::{checkout, write, FakePackageManager, FILTER_XML};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use vaultsync::{
	Config, NoStatusSink, SinkBuilder, SyncEntry, SyncError, SyncPhase, SyncVerdict, VaultSync,
};

fn engine(fake: &Arc<FakePackageManager>, config: Config) -> VaultSync {
	VaultSync::builder()
		.config(config)
		.package_manager(fake.clone())
		.sink(Box::new(NoStatusSink))
		.build()
		.unwrap()
}

fn verdict(entries: &[SyncEntry], path: &str) -> Option<SyncVerdict> {
	entries.iter().find(|e| e.path == path).map(|e| e.verdict)
}

fn mtime(path: &Path) -> FileTime {
	FileTime::from_last_modification_time(&fs::metadata(path).unwrap())
}

/// Checkout with /apps/myproj/{a.html, sub/.content.xml, sub/b.html}
fn project() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
	let (tmp, root) = checkout(FILTER_XML);
	let app = root.join("jcr_root/apps/myproj");
	write(&app.join("a.html"), "<p>a</p>");
	write(&app.join("sub/.content.xml"), "<jcr:root/>");
	write(&app.join("sub/b.html"), "<p>b</p>");
	(tmp, root, app)
}

#[tokio::test]
async fn test_status_includes_files_under_filter_root() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let entries = engine(&fake, Config::default()).status(&app).await.unwrap();
	assert_eq!(verdict(&entries, "/apps/myproj/a.html"), Some(SyncVerdict::Included));
	assert_eq!(verdict(&entries, "/apps/myproj/sub/b.html"), Some(SyncVerdict::Included));
	assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_status_applies_ignore_files() {
	let (_tmp, root, app) = project();
	write(&root.join(".vltignore"), "**/*.log\n");
	write(&app.join("x.log"), "log");
	write(&app.join("sub/deep/y.log"), "log");
	write(&app.join("sub/.vltignore"), "*.tmp\n");
	write(&app.join("sub/z.tmp"), "tmp");
	write(&app.join("top.tmp"), "tmp");

	let fake = Arc::new(FakePackageManager::new());
	let entries = engine(&fake, Config::default()).status(&app).await.unwrap();
	assert_eq!(verdict(&entries, "/apps/myproj/x.log"), Some(SyncVerdict::ExcludedByIgnoreFile));
	assert_eq!(
		verdict(&entries, "/apps/myproj/sub/deep/y.log"),
		Some(SyncVerdict::ExcludedByIgnoreFile)
	);
	assert_eq!(verdict(&entries, "/apps/myproj/sub/z.tmp"), Some(SyncVerdict::ExcludedByIgnoreFile));
	assert_eq!(verdict(&entries, "/apps/myproj/top.tmp"), Some(SyncVerdict::Included));
	assert_eq!(
		verdict(&entries, "/apps/myproj/sub/.vltignore"),
		Some(SyncVerdict::ExcludedByIgnoreFile)
	);
}

#[tokio::test]
async fn test_filter_override() {
	let (tmp, _root, app) = project();
	let other = tmp.path().join("other-filter.xml");
	write(
		&other,
		r#"<workspaceFilter version="1.0"><filter root="/apps/myproj"><exclude pattern=".*\.html"/></filter></workspaceFilter>"#,
	);
	let fake = Arc::new(FakePackageManager::new());
	let sync = VaultSync::builder()
		.package_manager(fake.clone())
		.sink(Box::new(NoStatusSink))
		.filter_file(&other)
		.build()
		.unwrap();
	let entries = sync.status(&app).await.unwrap();
	assert_eq!(verdict(&entries, "/apps/myproj/a.html"), Some(SyncVerdict::Excluded));
	assert_eq!(verdict(&entries, "/apps/myproj/sub/.content.xml"), Some(SyncVerdict::Included));
}

#[tokio::test]
async fn test_push_installs_content() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let entries = engine(&fake, Config::default()).push(&app).await.unwrap();

	assert_eq!(entries.len(), 3);
	assert!(entries.iter().all(|e| e.verdict == SyncVerdict::Included));
	assert_eq!(fs::read_to_string(fake.repo().join("apps/myproj/sub/b.html")).unwrap(), "<p>b</p>");
	assert_eq!(fake.commands(), vec!["upload", "install", "delete"]);
	assert!(fake.calls()[1].starts_with("install tmp/repo/repo_apps_myproj-"));
	assert_eq!(fake.stored_packages(), 0);
	assert!(fake.upload_dirs().iter().all(|d| !d.exists()));
}

#[tokio::test]
async fn test_push_is_idempotent() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	let first = sync.push(&app).await.unwrap();
	let second = sync.push(&app).await.unwrap();
	assert_eq!(first, second);
}

#[tokio::test]
async fn test_push_below_filter_root_narrows_package() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	write(&fake.repo().join("apps/myproj/a.html"), "remote a");
	write(&fake.repo().join("apps/myproj/sub/old.html"), "stale");

	let entries = engine(&fake, Config::default()).push(&app.join("sub")).await.unwrap();
	assert_eq!(entries.len(), 2);
	assert!(!fake.repo().join("apps/myproj/sub/old.html").exists());
	assert!(fake.repo().join("apps/myproj/sub/b.html").exists());
	assert_eq!(fs::read_to_string(fake.repo().join("apps/myproj/a.html")).unwrap(), "remote a");
}

#[tokio::test]
async fn test_push_then_pull_changes_nothing() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	sync.push(&app).await.unwrap();

	let old = FileTime::from_unix_time(1_000_000, 0);
	let files = [app.join("a.html"), app.join("sub/.content.xml"), app.join("sub/b.html")];
	for file in &files {
		filetime::set_file_mtime(file, old).unwrap();
	}

	let entries = sync.pull(&app).await.unwrap();
	assert!(entries.iter().all(|e| e.verdict != SyncVerdict::DeletedFromRemote));
	for file in &files {
		assert!(file.exists());
		assert_eq!(mtime(file), old, "{} was rewritten", file.display());
	}
	assert_eq!(fake.commands(), vec!["upload", "install", "delete", "upload", "build", "download", "delete"]);
}

#[tokio::test]
async fn test_pull_applies_remote_changes_and_deletions() {
	let (_tmp, root, app) = project();
	write(&app.join("notes.tmp"), "local only");
	write(&root.join(".vltignore"), "*.tmp\n");
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	sync.push(&app).await.unwrap();

	write(&fake.repo().join("apps/myproj/sub/b.html"), "<p>changed</p>");
	write(&fake.repo().join("apps/myproj/new.html"), "<p>new</p>");
	fs::remove_file(fake.repo().join("apps/myproj/a.html")).unwrap();

	let entries = sync.pull(&app).await.unwrap();
	assert_eq!(verdict(&entries, "/apps/myproj/a.html"), Some(SyncVerdict::DeletedFromRemote));
	assert!(!app.join("a.html").exists());
	assert_eq!(fs::read_to_string(app.join("sub/b.html")).unwrap(), "<p>changed</p>");
	assert_eq!(fs::read_to_string(app.join("new.html")).unwrap(), "<p>new</p>");
	assert!(app.join("notes.tmp").exists());
}

#[tokio::test]
async fn test_pull_removes_folder_of_deleted_marker() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	sync.push(&app).await.unwrap();

	fs::remove_dir_all(fake.repo().join("apps/myproj/sub")).unwrap();
	let entries = sync.pull(&app).await.unwrap();
	assert_eq!(
		verdict(&entries, "/apps/myproj/sub/.content.xml"),
		Some(SyncVerdict::DeletedFromRemote)
	);
	assert!(!app.join("sub").exists());
	assert!(app.join("a.html").exists());
}

#[tokio::test]
async fn test_pull_creates_missing_local_tree() {
	let (_tmp, root) = checkout(FILTER_XML);
	let app = root.join("jcr_root/apps/myproj");
	let fake = Arc::new(FakePackageManager::new());
	write(&fake.repo().join("apps/myproj/a.html"), "remote");

	let entries = engine(&fake, Config::default()).pull(&app).await.unwrap();
	assert_eq!(verdict(&entries, "/apps/myproj/a.html"), Some(SyncVerdict::Included));
	assert_eq!(fs::read_to_string(app.join("a.html")).unwrap(), "remote");
}

#[tokio::test]
async fn test_phases_reported_in_order() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let phases = Arc::new(Mutex::new(Vec::new()));
	let results = Arc::new(Mutex::new(0));
	let sink = {
		let phases = Arc::clone(&phases);
		let results = Arc::clone(&results);
		SinkBuilder::new()
			.on_progress(move |p| phases.lock().unwrap().push(p))
			.on_result(move |e| *results.lock().unwrap() += e.len())
			.build()
	};
	let sync = VaultSync::builder().package_manager(fake.clone()).sink(sink).build().unwrap();

	sync.push(&app).await.unwrap();
	assert_eq!(
		*phases.lock().unwrap(),
		vec![
			SyncPhase::Idle,
			SyncPhase::ParsingFilters,
			SyncPhase::Staging,
			SyncPhase::Archiving,
			SyncPhase::Uploading,
			SyncPhase::Installing,
			SyncPhase::CleaningUp,
			SyncPhase::Done,
		]
	);
	phases.lock().unwrap().clear();

	sync.pull(&app).await.unwrap();
	assert_eq!(
		*phases.lock().unwrap(),
		vec![
			SyncPhase::Idle,
			SyncPhase::ParsingFilters,
			SyncPhase::Staging,
			SyncPhase::Archiving,
			SyncPhase::Uploading,
			SyncPhase::Building,
			SyncPhase::Downloading,
			SyncPhase::Extracting,
			SyncPhase::Reconciling,
			SyncPhase::CleaningUp,
			SyncPhase::Done,
		]
	);
	assert_eq!(*results.lock().unwrap(), 6);
}

#[tokio::test]
async fn test_failure_still_cleans_up() {
	let (_tmp, root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	fake.fail_on("install");
	let phases = Arc::new(Mutex::new(Vec::new()));
	let failures = Arc::new(Mutex::new(Vec::new()));
	let sink = {
		let phases = Arc::clone(&phases);
		let failures = Arc::clone(&failures);
		SinkBuilder::new()
			.on_progress(move |p| phases.lock().unwrap().push(p))
			.on_failure(move |e| failures.lock().unwrap().push(e.to_string()))
			.build()
	};
	let sync = VaultSync::builder().package_manager(fake.clone()).sink(sink).build().unwrap();

	let err = sync.push(&app).await.unwrap_err();
	assert!(matches!(err, SyncError::RemoteProtocol { status: Some(500), .. }));
	assert_eq!(fake.commands(), vec!["upload", "install", "delete"]);
	assert!(fake.upload_dirs().iter().all(|d| !d.exists()));
	let phases = phases.lock().unwrap();
	assert_eq!(phases[0], SyncPhase::Idle);
	assert_eq!(&phases[phases.len() - 2..], &[SyncPhase::CleaningUp, SyncPhase::Failed]);
	assert_eq!(failures.lock().unwrap().len(), 1);
	assert!(!sync.locks().is_locked(&root, "http://fake:4502"));
}

#[tokio::test]
async fn test_malformed_filter_fails_before_network() {
	let (_tmp, root) = checkout("<workspaceFilter version=\"1.0\"><filter/></workspaceFilter>");
	let app = root.join("jcr_root/apps/myproj");
	write(&app.join("a.html"), "a");
	let fake = Arc::new(FakePackageManager::new());
	let err = engine(&fake, Config::default()).push(&app).await.unwrap_err();
	assert!(matches!(err, SyncError::MalformedFilter { .. }));
	assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_missing_filter_file() {
	let (_tmp, root) = checkout(FILTER_XML);
	fs::remove_file(root.join("META-INF/vault/filter.xml")).unwrap();
	let app = root.join("jcr_root/apps/myproj");
	write(&app.join("a.html"), "a");
	let fake = Arc::new(FakePackageManager::new());
	let err = engine(&fake, Config::default()).push(&app).await.unwrap_err();
	assert!(matches!(err, SyncError::PathNotFound { .. }));
}

#[tokio::test]
async fn test_nothing_included_skips_network() {
	let (_tmp, root) = checkout(
		r#"<workspaceFilter version="1.0"><filter root="/content/site"/></workspaceFilter>"#,
	);
	let app = root.join("jcr_root/apps/myproj");
	write(&app.join("a.html"), "a");
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());

	let entries = sync.push(&app).await.unwrap();
	assert_eq!(verdict(&entries, "/apps/myproj/a.html"), Some(SyncVerdict::Ignored));
	assert!(sync.pull(&app).await.unwrap().is_empty());
	assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_path_outside_checkout() {
	let tmp = tempfile::TempDir::new().unwrap();
	let fake = Arc::new(FakePackageManager::new());
	let err = engine(&fake, Config::default()).push(tmp.path()).await.unwrap_err();
	assert!(matches!(err, SyncError::NotInCheckout { .. }));
}

#[tokio::test]
async fn test_concurrent_sync_rejected() {
	let (_tmp, root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	let guard = sync.locks().acquire(&root, "http://fake:4502").unwrap();

	let err = sync.push(&app).await.unwrap_err();
	assert!(matches!(err, SyncError::LockFailed { .. }));
	assert!(fake.calls().is_empty());

	drop(guard);
	assert!(sync.push(&app).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_sync_rejected_through_aliased_path() {
	let (_tmp, root, _app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	let _guard = sync.locks().acquire(&root, "http://fake:4502").unwrap();

	let aliased = root.join("../ui.apps/jcr_root/apps/myproj");
	let err = sync.push(&aliased).await.unwrap_err();
	assert!(matches!(err, SyncError::LockFailed { .. }));
	assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_install_dependencies() {
	let tmp = tempfile::TempDir::new().unwrap();
	write(&tmp.path().join("core.jar"), "jar");
	write(&tmp.path().join("api.jar"), "jar");
	write(&tmp.path().join(".DS_Store"), "junk");
	fs::create_dir_all(tmp.path().join("nested")).unwrap();

	let fake = Arc::new(FakePackageManager::new());
	let count = engine(&fake, Config::default()).install_dependencies(tmp.path()).await.unwrap();
	assert_eq!(count, 2);
	let mut posted = fake.posted();
	posted.sort();
	assert_eq!(
		posted,
		vec![
			("/apps/system/install".to_string(), "api.jar".to_string()),
			("/apps/system/install".to_string(), "core.jar".to_string()),
		]
	);
}

#[tokio::test]
async fn test_install_dependencies_first_error_wins() {
	let tmp = tempfile::TempDir::new().unwrap();
	write(&tmp.path().join("core.jar"), "jar");
	let fake = Arc::new(FakePackageManager::new());
	fake.fail_on("post");
	let sync = engine(&fake, Config::default());
	assert!(sync.install_dependencies(tmp.path()).await.is_err());
	let missing = sync.install_dependencies(&tmp.path().join("nope")).await.unwrap_err();
	assert!(matches!(missing, SyncError::PathNotFound { .. }));
}

#[tokio::test]
async fn test_on_change_respects_auto_sync_and_cache() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());

	let disabled = engine(&fake, Config { auto_sync: false, ..Config::default() });
	assert!(disabled.on_change(&app.join("a.html")).await.unwrap().is_none());
	assert!(fake.calls().is_empty());

	let sync = engine(&fake, Config::default());
	let pushed = sync.on_change(&app.join("a.html")).await.unwrap().unwrap();
	assert_eq!(pushed.len(), 1);
	assert!(sync.on_change(&app.join("a.html")).await.unwrap().is_none());

	filetime::set_file_mtime(app.join("a.html"), FileTime::from_unix_time(2_000_000, 0)).unwrap();
	assert!(sync.on_change(&app.join("a.html")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_on_change_content_xml_pushes_folder() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	let entries = sync.on_change(&app.join("sub/.content.xml")).await.unwrap().unwrap();
	assert_eq!(verdict(&entries, "/apps/myproj/sub/b.html"), Some(SyncVerdict::Included));
	assert_eq!(verdict(&entries, "/apps/myproj/a.html"), None);
}

#[tokio::test]
async fn test_on_change_deleted_file_pushes_parent() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	sync.push(&app).await.unwrap();
	assert!(fake.repo().join("apps/myproj/a.html").exists());

	fs::remove_file(app.join("a.html")).unwrap();
	sync.on_change(&app.join("a.html")).await.unwrap().unwrap();
	assert!(!fake.repo().join("apps/myproj/a.html").exists());
	assert!(fake.repo().join("apps/myproj/sub/b.html").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_commands_replace_pipeline() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());

	let ok = engine(&fake, Config { push_command: Some("true".to_string()), ..Config::default() });
	assert!(ok.push(&app).await.unwrap().is_empty());

	let failing = engine(&fake, Config { pull_command: Some("false".to_string()), ..Config::default() });
	let err = failing.pull(&app).await.unwrap_err();
	assert!(matches!(err, SyncError::CommandFailed { .. }));
	assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_remote_url() {
	let (_tmp, _root, app) = project();
	let fake = Arc::new(FakePackageManager::new());
	let sync = engine(&fake, Config::default());
	assert_eq!(sync.remote_url(&app).unwrap(), "http://fake:4502/apps/myproj.html");
	assert_eq!(sync.remote_url(&app.join("a.html")).unwrap(), "http://fake:4502/apps/myproj/a.html");
	assert_eq!(
		sync.remote_url(&app.join("sub/.content.xml")).unwrap(),
		"http://fake:4502/apps/myproj/sub.html"
	);
}

// vim: ts=4
