//! Error types for vaultsync operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::validation::ValidationError;

/// Main error type for sync operations
#[derive(Debug)]
pub enum SyncError {
	/// Filter descriptor could not be parsed
	MalformedFilter { message: String },

	/// Sync target does not exist
	PathNotFound { path: String },

	/// Package staging or archiving failed
	Packaging { message: String },

	/// Remote rejected the credentials (HTTP 401)
	Authentication { url: String },

	/// Remote answered with an unexpected status or a failure body
	RemoteProtocol { url: String, status: Option<u16>, message: String },

	/// Remote could not be reached
	Connection { url: String, reason: String },

	/// Path is not inside a content checkout (no jcr_root component)
	NotInCheckout { path: String },

	/// External push/pull command failed
	CommandFailed { command: String, message: String },

	/// I/O error
	Io(io::Error),

	/// Invalid configuration
	InvalidConfig { message: String },

	/// Another sync holds the checkout
	LockFailed { message: String },

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::MalformedFilter { message } => write!(f, "Invalid filter: {}", message),
			SyncError::PathNotFound { path } => write!(f, "Path not found: {}", path),
			SyncError::Packaging { message } => write!(f, "Packaging failed: {}", message),
			SyncError::Authentication { url } => {
				write!(f, "Invalid user name or password for server {}.", url)
			}
			SyncError::RemoteProtocol { url, status: Some(status), message } => {
				write!(f, "Received status code {} from {}. Expected 200. {}", status, url, message)
			}
			SyncError::RemoteProtocol { url, status: None, message } => {
				write!(f, "Request to {} failed: {}", url, message)
			}
			SyncError::Connection { url, reason } => {
				write!(f, "Cannot establish a connection to server {}: {}", url, reason)
			}
			SyncError::NotInCheckout { path } => {
				write!(f, "{} is not inside a jcr_root folder", path)
			}
			SyncError::CommandFailed { command, message } => {
				write!(f, "Command '{}' failed: {}", command, message)
			}
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::LockFailed { message } => {
				write!(f, "Lock acquisition failed: {}", message)
			}
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<String> for SyncError {
	fn from(e: String) -> Self {
		SyncError::Other { message: e }
	}
}

impl From<ValidationError> for SyncError {
	fn from(e: ValidationError) -> Self {
		match e {
			ValidationError::Config { .. } => SyncError::InvalidConfig { message: e.to_string() },
			ValidationError::UnsafePath(_) => SyncError::Packaging { message: e.to_string() },
		}
	}
}

impl From<zip::result::ZipError> for SyncError {
	fn from(e: zip::result::ZipError) -> Self {
		SyncError::Packaging { message: e.to_string() }
	}
}

impl From<tokio::task::JoinError> for SyncError {
	fn from(e: tokio::task::JoinError) -> Self {
		SyncError::Other { message: format!("Background task failed: {}", e) }
	}
}

impl SyncError {
	/// Wrap an error with the action and path it happened on
	pub fn during(self, action: &str, path: &str) -> Self {
		match self {
			SyncError::Other { message } => SyncError::Other {
				message: format!("Unable to {} content for {}: {}", action, path, message),
			},
			other => other,
		}
	}

	/// True for errors raised by the remote package manager
	pub fn is_remote(&self) -> bool {
		matches!(
			self,
			SyncError::Authentication { .. }
				| SyncError::RemoteProtocol { .. }
				| SyncError::Connection { .. }
		)
	}
}

/// Result alias used across the crate
pub type SyncResult<T> = Result<T, SyncError>;


// vim: ts=4
