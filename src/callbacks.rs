//! Status reporting for sync operations

use crate::error::SyncError;
use crate::logging::*;
use crate::types::{SyncEntry, SyncPhase, SyncSummary};

// Type aliases to reduce complexity
type ProgressFn = dyn Fn(SyncPhase) + Send + Sync;
type ResultFn = dyn Fn(&[SyncEntry]) + Send + Sync;
type FailureFn = dyn Fn(&SyncError) + Send + Sync;

/// Receives phase changes and the outcome of a sync
pub trait StatusSink: Send + Sync {
	/// Called on every state transition
	fn report_progress(&self, phase: SyncPhase);

	/// Called once with the `{path, verdict}` list of a successful sync
	fn report_result(&self, entries: &[SyncEntry]);

	/// Called once when a sync fails, after cleanup
	fn report_failure(&self, _error: &SyncError) {}
}

/// Sink that ignores everything
pub struct NoStatusSink;

impl StatusSink for NoStatusSink {
	fn report_progress(&self, _phase: SyncPhase) {}
	fn report_result(&self, _entries: &[SyncEntry]) {}
}

/// Sink that writes to the log
pub struct LoggingSink;

impl StatusSink for LoggingSink {
	fn report_progress(&self, phase: SyncPhase) {
		debug!("Phase: {}", phase);
	}

	fn report_result(&self, entries: &[SyncEntry]) {
		for entry in entries {
			debug!("{} {}", entry.verdict, entry.path);
		}
		let synced = entries.iter().filter(|e| e.verdict.is_synced()).count();
		match SyncSummary::from_entries(entries) {
			SyncSummary::Full => info!("Synced all {} path(s)", synced),
			SyncSummary::Partial => info!("Synced {} of {} path(s)", synced, entries.len()),
			SyncSummary::None => info!("Nothing synced"),
		}
	}

	fn report_failure(&self, error: &SyncError) {
		error!("{}", error);
	}
}

/// Builder for a sink made of closures
#[derive(Default)]
pub struct SinkBuilder {
	progress: Option<Box<ProgressFn>>,
	result: Option<Box<ResultFn>>,
	failure: Option<Box<FailureFn>>,
}

impl SinkBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_progress<F>(mut self, callback: F) -> Self
	where
		F: Fn(SyncPhase) + Send + Sync + 'static,
	{
		self.progress = Some(Box::new(callback));
		self
	}

	pub fn on_result<F>(mut self, callback: F) -> Self
	where
		F: Fn(&[SyncEntry]) + Send + Sync + 'static,
	{
		self.result = Some(Box::new(callback));
		self
	}

	pub fn on_failure<F>(mut self, callback: F) -> Self
	where
		F: Fn(&SyncError) + Send + Sync + 'static,
	{
		self.failure = Some(Box::new(callback));
		self
	}

	pub fn build(self) -> Box<dyn StatusSink> {
		Box::new(CompositeSink { progress: self.progress, result: self.result, failure: self.failure })
	}
}

struct CompositeSink {
	progress: Option<Box<ProgressFn>>,
	result: Option<Box<ResultFn>>,
	failure: Option<Box<FailureFn>>,
}

impl StatusSink for CompositeSink {
	fn report_progress(&self, phase: SyncPhase) {
		if let Some(ref callback) = self.progress {
			callback(phase);
		}
	}

	fn report_result(&self, entries: &[SyncEntry]) {
		if let Some(ref callback) = self.result {
			callback(entries);
		}
	}

	fn report_failure(&self, error: &SyncError) {
		if let Some(ref callback) = self.failure {
			callback(error);
		}
	}
}


// vim: ts=4
