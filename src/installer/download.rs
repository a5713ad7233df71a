// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! HTTP download handling.
//!
//! Download servers rarely agree on how to name what they send. The final
//! file name is inferred from the response in this order:
//!
//! 1. File name in `Content-Disposition` header, which replaces the target
//!    file name outright.
//! 2. Extension implied by `Content-Type` header.
//! 3. Extension found in final URL after redirects.
//!
//! An inferred extension is only appended when the target file name has no
//! extension of its own.

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use reqwest::{
    blocking::Client,
    header::{HeaderMap, ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT},
    redirect::Policy,
    StatusCode,
};
use std::{
    ffi::OsStr,
    fs::File,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};
use tracing::{debug, info, instrument};

const DOWNLOAD_TIMEOUT_SECS: u64 = 900;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = concat!("mac-install/", env!("CARGO_PKG_VERSION"));

static QUOTED_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="([^"]+)""#).unwrap());
static BARE_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"filename=([^;\s]+)").unwrap());

/// Blocking HTTP downloader.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Construct new downloader.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Client`] if HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, USER_AGENT_STRING.parse()?);
        headers.insert(ACCEPT, "*/*".parse()?);

        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .default_headers(headers)
            .redirect(Policy::limited(10))
            .build()
            .map_err(Error::Client)?;

        Ok(Self { client })
    }

    /// Download URL to target path.
    ///
    /// Returns actual path written to, which may differ from target path
    /// based on what the server reports about the file.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Request`] if request fails.
    /// - Return [`Error::Status`] if server does not respond with success.
    /// - Return [`Error::CreateFile`] if output file cannot be created.
    /// - Return [`Error::Stream`] if response body cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn fetch(&self, url: &str, target: &Path) -> Result<PathBuf> {
        let mut response = self.client.get(url).send().map_err(|err| Error::Request {
            source: err,
            url: url.to_string(),
        })?;

        // INVARIANT: Never create output file for unsuccessful response.
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        let headers = response.headers();
        let path = resolve_target_path(
            target,
            header_text(headers, CONTENT_DISPOSITION),
            header_text(headers, CONTENT_TYPE),
            response.url().as_str(),
        );
        debug!("download {url} to {:?}", path.display());

        let file = File::create(&path).map_err(|err| Error::CreateFile {
            source: err,
            path: path.clone(),
        })?;

        let bar = match response.content_length() {
            Some(length) => ProgressBar::new(length),
            None => ProgressBar::no_length(),
        };
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<40}  [{wide_bar:.yellow/blue}] {bytes}/{total_bytes}",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(file_label(&path));

        let mut writer = bar.wrap_write(file);
        let written = response.copy_to(&mut writer).map_err(|err| Error::Stream {
            source: err,
            path: path.clone(),
        })?;
        bar.finish_and_clear();
        info!("downloaded {written} bytes to {:?}", path.display());

        Ok(path)
    }
}

/// Decide final download path from response metadata.
pub fn resolve_target_path(
    target: &Path,
    content_disposition: Option<&str>,
    content_type: Option<&str>,
    final_url: &str,
) -> PathBuf {
    if let Some(filename) = content_disposition.and_then(disposition_filename) {
        return target.with_file_name(filename);
    }

    let extension = content_type
        .and_then(extension_from_content_type)
        .or_else(|| extension_from_url(final_url));

    let has_extension = target
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains('.'));

    match extension {
        Some(extension) if !has_extension => {
            let mut path = target.as_os_str().to_owned();
            path.push(extension);
            PathBuf::from(path)
        }
        _ => target.to_path_buf(),
    }
}

// INVARIANT: Only the final path component of the server's name is used, so
// the download never leaves the target's directory.
fn disposition_filename(disposition: &str) -> Option<&OsStr> {
    QUOTED_FILENAME
        .captures(disposition)
        .or_else(|| BARE_FILENAME.captures(disposition))
        .and_then(|captures| captures.get(1))
        .and_then(|name| Path::new(name.as_str()).file_name())
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("application/zip") {
        Some(".zip")
    } else if content_type.contains("application/x-apple-diskimage") {
        Some(".dmg")
    } else if content_type.contains("application/gzip") || content_type.contains("application/x-gzip") {
        Some(".tar.gz")
    } else if content_type.contains("application/x-tar") {
        Some(".tar")
    } else {
        None
    }
}

fn extension_from_url(url: &str) -> Option<&'static str> {
    let url = url.to_ascii_lowercase();
    if url.contains(".zip") {
        Some(".zip")
    } else if url.contains(".dmg") {
        Some(".dmg")
    } else if url.contains(".tar.gz") || url.contains(".tgz") {
        Some(".tar.gz")
    } else {
        None
    }
}

fn header_text(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Download error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client cannot be built.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// Default header value is malformed.
    #[error(transparent)]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    /// Request cannot be sent.
    #[error("HTTP request failed for {url}")]
    Request {
        #[source]
        source: reqwest::Error,
        url: String,
    },

    /// Server responds with non-success status.
    #[error("download failed with status: {status} ({url})")]
    Status { url: String, status: StatusCode },

    /// Output file cannot be created.
    #[error("failed to create download file at {:?}", path.display())]
    CreateFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Response body cannot be written to output file.
    #[error("failed to write download stream to {:?}", path.display())]
    Stream {
        #[source]
        source: reqwest::Error,
        path: PathBuf,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
