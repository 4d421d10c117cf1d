//! ZIP packing and unpacking of a workspace

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{SyncError, SyncResult};
use crate::exclusion::is_basic_exclude;
use crate::logging::*;
use crate::paths::{to_slash, JCR_ROOT};
use crate::validation::validate_archive_entry;

/// Top-level folders of a workspace that go into the archive
const ARCHIVED_ROOTS: &[&str] = &[JCR_ROOT, "META-INF"];

fn add_tree<W: io::Write + io::Seek>(
	zip: &mut ZipWriter<W>,
	base: &Path,
	dir: &Path,
	options: SimpleFileOptions,
	files: &mut usize,
) -> SyncResult<()> {
	let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
	entries.sort_by_key(|e| e.file_name());
	for entry in entries {
		let path = entry.path();
		let relative = path.strip_prefix(base).map_err(|e| SyncError::Packaging {
			message: format!("{} escapes {}: {}", path.display(), base.display(), e),
		})?;
		if is_basic_exclude(relative) {
			continue;
		}
		let name = to_slash(relative);
		if entry.file_type()?.is_dir() {
			zip.add_directory(format!("{}/", name), options)?;
			add_tree(zip, base, &path, options, files)?;
		} else {
			zip.start_file(name, options)?;
			let mut reader = BufReader::new(File::open(&path)?);
			io::copy(&mut reader, zip)?;
			*files += 1;
		}
	}
	Ok(())
}

/// Zip `jcr_root/**` and `META-INF/**` of `workspace` into `dest`
///
/// Returns the number of files written.
pub fn create_archive(workspace: &Path, dest: &Path) -> SyncResult<usize> {
	let file = File::create(dest).map_err(|e| SyncError::Packaging {
		message: format!("cannot create {}: {}", dest.display(), e),
	})?;
	let mut zip = ZipWriter::new(BufWriter::new(file));
	let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
	let mut files = 0;
	for root in ARCHIVED_ROOTS {
		let dir = workspace.join(root);
		if !dir.is_dir() {
			continue;
		}
		zip.add_directory(format!("{}/", root), options)?;
		add_tree(&mut zip, workspace, &dir, options, &mut files).map_err(|e| match e {
			SyncError::Io(e) => SyncError::Packaging { message: e.to_string() },
			other => other,
		})?;
	}
	zip.finish()?;
	debug!("Archived {} file(s) into {}", files, dest.display());
	Ok(files)
}

/// Unpack `archive` into `dest`, refusing entries that would land outside it
///
/// Returns the number of files extracted.
pub fn extract_archive(archive: &Path, dest: &Path) -> SyncResult<usize> {
	let file = File::open(archive).map_err(|e| SyncError::Packaging {
		message: format!("cannot open {}: {}", archive.display(), e),
	})?;
	let mut zip = ZipArchive::new(BufReader::new(file))?;
	let mut files = 0;
	for i in 0..zip.len() {
		let mut entry = zip.by_index(i)?;
		let name = entry.enclosed_name().ok_or_else(|| SyncError::Packaging {
			message: format!("unsafe entry name in archive: {}", entry.name()),
		})?;
		validate_archive_entry(&name)?;
		let target = dest.join(&name);
		if entry.is_dir() {
			fs::create_dir_all(&target)?;
			continue;
		}
		if let Some(parent) = target.parent() {
			fs::create_dir_all(parent)?;
		}
		let mut out = BufWriter::new(File::create(&target)?);
		io::copy(&mut entry, &mut out)?;
		files += 1;
	}
	debug!("Extracted {} file(s) from {}", files, archive.display());
	Ok(files)
}


// vim: ts=4
