//! Input checks for configuration values and archive contents

use std::error::Error;
use std::fmt;

pub mod config;
pub mod path;

pub use config::*;
pub use path::*;

/// Why a value was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	/// A configuration setting is unusable
	Config { field: &'static str, message: String },

	/// A path would escape the folder it is resolved against
	UnsafePath(String),
}

impl ValidationError {
	pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
		ValidationError::Config { field, message: message.into() }
	}
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidationError::Config { field, message } => write!(f, "{}: {}", field, message),
			ValidationError::UnsafePath(path) => write!(f, "unsafe path: {}", path),
		}
	}
}

impl Error for ValidationError {}

/// Types that can check their own consistency
pub trait Validator {
	fn validate(&self) -> Result<(), ValidationError>;
}


// vim: ts=4
