//! Configuration validation functions

use super::ValidationError;

/// Characters that are never accepted in a server URL
const FORBIDDEN_URL_CHARS: &[char] = &[' ', '^', '[', ']', '{', '}', '<', '>', '\\', '"', '?'];

/// Validate the remote server URL
///
/// The URL must use the `http` or `https` scheme, carry a host and contain
/// none of the characters the package manager endpoints choke on.
pub fn validate_server_url(url: &str) -> Result<(), ValidationError> {
	if url.trim().is_empty() {
		return Err(ValidationError::config("serverUrl", "must not be empty"));
	}
	if let Some(c) = url.chars().find(|c| FORBIDDEN_URL_CHARS.contains(c)) {
		return Err(ValidationError::config(
			"serverUrl",
			format!("forbidden character '{}' in {}", c, url),
		));
	}
	let rest = url
		.strip_prefix("http://")
		.or_else(|| url.strip_prefix("https://"))
		.ok_or_else(|| {
			ValidationError::config("serverUrl", format!("{} must start with http:// or https://", url))
		})?;
	if rest.is_empty() || rest.starts_with('/') {
		return Err(ValidationError::config("serverUrl", format!("no host in {}", url)));
	}
	Ok(())
}

/// Validate that user name and password are both present
pub fn validate_credentials(username: &str, password: &str) -> Result<(), ValidationError> {
	if username.is_empty() {
		return Err(ValidationError::config("username", "must not be empty"));
	}
	if password.is_empty() {
		return Err(ValidationError::config("password", "must not be empty"));
	}
	Ok(())
}

/// HTTP request timeout, 1 to 3600 seconds
pub fn validate_timeout_secs(timeout_secs: u64) -> Result<(), ValidationError> {
	if !(1..=3600).contains(&timeout_secs) {
		return Err(ValidationError::config(
			"requestTimeoutSecs",
			format!("{} is outside 1..=3600", timeout_secs),
		));
	}
	Ok(())
}

/// Validate a repository path used as an upload target (`/apps/system/install`)
pub fn validate_repository_path(path: &str) -> Result<(), ValidationError> {
	if !path.starts_with('/') {
		return Err(ValidationError::config(
			"dependencyInstallPath",
			format!("{} is not an absolute repository path", path),
		));
	}
	Ok(())
}


// vim: ts=4
