//! Package manager client over HTTP

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::{CommandResponse, PackageManager, PACKAGES_PATH, SERVICE_PATH};
use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::logging::*;

/// Package manager reached through the JSON service with basic auth
#[derive(Debug, Clone)]
pub struct HttpPackageManager {
	client: Client,
	server_url: String,
	username: String,
	password: String,
}

/// Display an error together with its sources
fn error_chain(e: &dyn Error) -> String {
	let mut message = e.to_string();
	let mut source = e.source();
	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}
	message
}

impl HttpPackageManager {
	pub fn new(
		server_url: &str,
		username: &str,
		password: &str,
		accept_self_signed: bool,
		timeout: Duration,
	) -> SyncResult<Self> {
		let client = Client::builder()
			.connect_timeout(timeout)
			.timeout(timeout)
			.danger_accept_invalid_certs(accept_self_signed)
			.build()
			.map_err(|e| SyncError::InvalidConfig { message: error_chain(&e) })?;
		Ok(HttpPackageManager {
			client,
			server_url: server_url.trim_end_matches('/').to_string(),
			username: username.to_string(),
			password: password.to_string(),
		})
	}

	pub fn from_config(config: &Config) -> SyncResult<Self> {
		Self::new(
			&config.server_url,
			&config.username,
			&config.password,
			config.accept_self_signed_certificates,
			Duration::from_secs(config.request_timeout_secs),
		)
	}

	fn command_url(&self, package_path: &str, command: &str) -> String {
		format!(
			"{}{}{}/{}?cmd={}",
			self.server_url,
			SERVICE_PATH,
			PACKAGES_PATH,
			package_path.trim_start_matches('/'),
			command
		)
	}

	/// Send with credentials and map transport and status failures
	async fn send(&self, request: RequestBuilder, url: &str) -> SyncResult<Response> {
		let response = request
			.basic_auth(&self.username, Some(&self.password))
			.send()
			.await
			.map_err(|e| SyncError::Connection { url: self.server_url.clone(), reason: error_chain(&e) })?;
		match response.status() {
			StatusCode::UNAUTHORIZED => Err(SyncError::Authentication { url: self.server_url.clone() }),
			status if status.is_success() => Ok(response),
			status => Err(SyncError::RemoteProtocol {
				url: url.to_string(),
				status: Some(status.as_u16()),
				message: String::new(),
			}),
		}
	}

	/// POST a command and require `{"success": true}`
	async fn command(&self, url: String, form: Option<Form>) -> SyncResult<()> {
		debug!("POST {}", url);
		let mut request = self.client.post(&url);
		if let Some(form) = form {
			request = request.multipart(form);
		}
		let response = require_ok(self.send(request, &url).await?, &url)?;
		let body: CommandResponse = response.json().await.map_err(|e| SyncError::RemoteProtocol {
			url: url.clone(),
			status: None,
			message: format!("unexpected response: {}", error_chain(&e)),
		})?;
		if !body.success {
			return Err(SyncError::RemoteProtocol { url, status: None, message: body.msg });
		}
		trace!("{}: {}", url, body.msg);
		Ok(())
	}

	async fn file_part(file: &Path) -> SyncResult<Part> {
		let bytes = tokio::fs::read(file).await?;
		let name = file
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| "file".to_string());
		Ok(Part::bytes(bytes).file_name(name))
	}
}

#[async_trait]
impl PackageManager for HttpPackageManager {
	fn server_url(&self) -> &str {
		&self.server_url
	}

	async fn upload(&self, archive: &Path) -> SyncResult<()> {
		let url = format!("{}{}?cmd=upload", self.server_url, SERVICE_PATH);
		let part = Self::file_part(archive)
			.await?
			.mime_str("application/zip")
			.map_err(|e| SyncError::Other { message: error_chain(&e) })?;
		let form = Form::new().text("force", "true").part("package", part);
		self.command(url, Some(form)).await
	}

	async fn install(&self, package_path: &str) -> SyncResult<()> {
		self.command(self.command_url(package_path, "install"), None).await
	}

	async fn build(&self, package_path: &str) -> SyncResult<()> {
		self.command(self.command_url(package_path, "build"), None).await
	}

	async fn delete(&self, package_path: &str) -> SyncResult<()> {
		self.command(self.command_url(package_path, "delete"), None).await
	}

	async fn download(&self, package_path: &str, dest: &Path) -> SyncResult<()> {
		let url = format!(
			"{}{}/{}",
			self.server_url,
			PACKAGES_PATH,
			package_path.trim_start_matches('/')
		);
		debug!("GET {}", url);
		let response = require_ok(self.send(self.client.get(&url), &url).await?, &url)?;
		let mut file = tokio::fs::File::create(dest).await?;
		let mut stream = response.bytes_stream();
		let mut written: u64 = 0;
		while let Some(chunk) = stream.next().await {
			let chunk = chunk.map_err(|e| SyncError::Connection {
				url: self.server_url.clone(),
				reason: error_chain(&e),
			})?;
			file.write_all(&chunk).await?;
			written += chunk.len() as u64;
		}
		file.flush().await?;
		debug!("Downloaded {} bytes to {}", written, dest.display());
		Ok(())
	}

	async fn post_file(&self, parent_path: &str, file: &Path) -> SyncResult<()> {
		let url = format!("{}{}", self.server_url, parent_path);
		let mut form = Form::new().text("_charset_", "utf-8");
		if parent_path.trim_end_matches('/').ends_with("/install") {
			form = form.text("jcr:primaryType", "nt:folder");
		}
		form = form.part("*", Self::file_part(file).await?);
		debug!("POST {} -> {}", file.display(), url);
		self.send(self.client.post(&url).multipart(form), &url).await?;
		Ok(())
	}
}

/// Package manager replies other than 200 are protocol errors
fn require_ok(response: Response, url: &str) -> SyncResult<Response> {
	if response.status() != StatusCode::OK {
		return Err(SyncError::RemoteProtocol {
			url: url.to_string(),
			status: Some(response.status().as_u16()),
			message: String::new(),
		});
	}
	Ok(response)
}


// vim: ts=4
