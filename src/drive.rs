//! Google Drive v3 client.
//!
//! Lists files and retrieves their content through the Drive REST API.
//! Implements both [`FileLister`] and [`ContentFetcher`].
//!
//! # Configuration
//!
//! ```toml
//! [drive]
//! query = "trashed = false and 'root' in parents"
//! include_globs = ["**"]
//! exclude_globs = ["Copy of *"]
//! # api_base = "http://localhost:9000/drive/v3"   # local fake
//! ```
//!
//! # Authentication
//!
//! Requests carry `Authorization: Bearer <token>`. The token is read from
//! the environment variable named by `drive.token_env`
//! (`GOOGLE_DRIVE_ACCESS_TOKEN` by default). Obtaining and refreshing it is
//! left to whatever OAuth flow the caller uses.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list | `GET files?pageSize&pageToken&q&fields` |
//! | metadata | `GET files/{id}?fields=id,name,mimeType` |
//! | media download | `GET files/{id}?alt=media` |
//! | export | `GET files/{id}/export?mimeType=<target>` |
//!
//! # Pagination
//!
//! Listing follows `nextPageToken` until the API stops returning one.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use tracing::debug;

use crate::config::DriveConfig;
use crate::error::FetchError;
use crate::formats::{fetch_plan, Category, FetchPlan};
use crate::models::{FetchResult, FileReference, ResponseBody, ResponseEncoding};
use crate::traits::{ContentFetcher, FileLister};

const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";
const FILE_FIELDS: &str = "id,name,mimeType";

/// OAuth bearer token loaded from the environment.
#[derive(Clone)]
struct DriveCredentials {
    access_token: String,
}

impl DriveCredentials {
    fn from_env(var: &str) -> Result<Self> {
        let access_token = std::env::var(var)
            .with_context(|| format!("{} environment variable not set", var))?;
        if access_token.trim().is_empty() {
            bail!("{} environment variable is empty", var);
        }
        Ok(Self { access_token })
    }
}

/// Authenticated handle to the Drive API.
pub struct DriveClient {
    http: reqwest::Client,
    api_base: String,
    credentials: DriveCredentials,
    page_size: u32,
    query: Option<String>,
    include_set: GlobSet,
    exclude_set: GlobSet,
}

impl DriveClient {
    /// Build a client using the token from `drive.token_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token variable is unset or empty, a glob
    /// pattern is invalid, or the HTTP client cannot be built.
    pub fn from_config(config: &DriveConfig) -> Result<Self> {
        let credentials = DriveCredentials::from_env(&config.token_env)?;
        Self::with_token(config, credentials.access_token)
    }

    /// Build a client with an explicit access token.
    pub fn with_token(config: &DriveConfig, access_token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            credentials: DriveCredentials {
                access_token: access_token.into(),
            },
            page_size: config.page_size,
            query: config.query.clone().filter(|q| !q.trim().is_empty()),
            include_set: build_globset(&config.include_globs)?,
            exclude_set: build_globset(&config.exclude_globs)?,
        })
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_base, uri_encode(file_id))
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(&self.credentials.access_token)
    }

    /// Send a request and turn transport errors and non-2xx statuses into
    /// [`FetchError`]s.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
        file_id: &str,
    ) -> Result<reqwest::Response, FetchError> {
        let resp = request.send().await.map_err(|source| FetchError::Transport {
            file_id: file_id.to_string(),
            source,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                operation,
                file_id: file_id.to_string(),
                status,
                body: body.chars().take(500).collect(),
            });
        }
        Ok(resp)
    }

    async fn export(&self, file_id: &str, target_mime: &str) -> Result<FetchResult, FetchError> {
        let url = format!("{}/export", self.file_url(file_id));
        let resp = self
            .send(
                self.get(&url).query(&[("mimeType", target_mime)]),
                "export",
                file_id,
            )
            .await?;

        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let value: serde_json::Value =
                resp.json().await.map_err(|source| FetchError::Transport {
                    file_id: file_id.to_string(),
                    source,
                })?;
            Ok(FetchResult {
                encoding: ResponseEncoding::ExportStructured,
                body: ResponseBody::Value(value),
            })
        } else {
            Ok(FetchResult {
                encoding: ResponseEncoding::ExportText,
                body: body_stream(resp),
            })
        }
    }

    async fn download(&self, file_id: &str, text: bool) -> Result<FetchResult, FetchError> {
        let url = self.file_url(file_id);
        let resp = self
            .send(self.get(&url).query(&[("alt", "media")]), "download", file_id)
            .await?;

        let encoding = if text {
            ResponseEncoding::MediaText
        } else {
            ResponseEncoding::MediaBinary
        };
        Ok(FetchResult {
            encoding,
            body: body_stream(resp),
        })
    }

    fn name_matches(&self, name: &str) -> bool {
        !self.exclude_set.is_match(name) && self.include_set.is_match(name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPage {
    #[serde(default)]
    files: Vec<FileReference>,
    next_page_token: Option<String>,
}

#[async_trait]
impl FileLister for DriveClient {
    async fn list_files(&self) -> Result<Vec<FileReference>> {
        let url = format!("{}/files", self.api_base);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut params = vec![
                ("pageSize", self.page_size.to_string()),
                ("fields", LIST_FIELDS.to_string()),
            ];
            if let Some(ref q) = self.query {
                params.push(("q", q.clone()));
            }
            if let Some(ref token) = page_token {
                params.push(("pageToken", token.clone()));
            }

            let resp = self
                .send(self.get(&url).query(&params), "list", "*")
                .await
                .context("Failed to list Drive files")?;
            let page: FileListPage = resp
                .json()
                .await
                .context("Failed to parse Drive file listing")?;
            pages += 1;
            debug!(page = pages, files = page.files.len(), "listed drive page");

            files.extend(page.files.into_iter().filter(|f| self.name_matches(&f.name)));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(files)
    }
}

#[async_trait]
impl ContentFetcher for DriveClient {
    async fn fetch_metadata(&self, file_id: &str) -> Result<FileReference, FetchError> {
        let url = self.file_url(file_id);
        let resp = self
            .send(
                self.get(&url).query(&[("fields", FILE_FIELDS)]),
                "metadata",
                file_id,
            )
            .await?;
        resp.json::<FileReference>()
            .await
            .map_err(|e| FetchError::InvalidResponse {
                file_id: file_id.to_string(),
                message: e.to_string(),
            })
    }

    async fn fetch_content(
        &self,
        file_id: &str,
        mime_type: &str,
    ) -> Result<FetchResult, FetchError> {
        let category =
            Category::from_mime(mime_type).ok_or_else(|| FetchError::InvalidResponse {
                file_id: file_id.to_string(),
                message: format!("no fetch plan for content-type {}", mime_type),
            })?;
        match fetch_plan(category) {
            FetchPlan::Export { target_mime } => self.export(file_id, target_mime).await,
            FetchPlan::Media { text } => self.download(file_id, text).await,
        }
    }
}

/// Hand the body over unread so the size limit applies while it arrives.
fn body_stream(resp: reqwest::Response) -> ResponseBody {
    ResponseBody::Stream(Box::pin(resp.bytes_stream().map_err(std::io::Error::other)))
}

/// Percent-encode a path segment per RFC 3986.
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Build a [`GlobSet`] from a list of glob pattern strings.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(config: DriveConfig) -> DriveClient {
        DriveClient::with_token(&config, "test-token").unwrap()
    }

    #[test]
    fn ids_are_percent_encoded() {
        assert_eq!(uri_encode("1AbC-_x.~"), "1AbC-_x.~");
        assert_eq!(uri_encode("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn file_url_joins_base_without_double_slash() {
        let c = client(DriveConfig {
            api_base: "http://localhost:9000/drive/v3/".to_string(),
            ..DriveConfig::default()
        });
        assert_eq!(c.file_url("abc"), "http://localhost:9000/drive/v3/files/abc");
    }

    #[test]
    fn name_filters_apply_exclude_first() {
        let c = client(DriveConfig {
            include_globs: vec!["*.pdf".to_string(), "Budget*".to_string()],
            exclude_globs: vec!["*draft*".to_string()],
            ..DriveConfig::default()
        });
        assert!(c.name_matches("scan.pdf"));
        assert!(c.name_matches("Budget 2024"));
        assert!(!c.name_matches("draft.pdf"));
        assert!(!c.name_matches("notes.txt"));
    }

    #[test]
    fn blank_query_is_dropped() {
        let c = client(DriveConfig {
            query: Some("  ".to_string()),
            ..DriveConfig::default()
        });
        assert!(c.query.is_none());
    }

    #[test]
    fn invalid_glob_is_an_error() {
        let config = DriveConfig {
            include_globs: vec!["[".to_string()],
            ..DriveConfig::default()
        };
        assert!(DriveClient::with_token(&config, "t").is_err());
    }

    #[test]
    fn missing_token_variable_is_an_error() {
        let config = DriveConfig {
            token_env: "DRIVE_EXTRACT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..DriveConfig::default()
        };
        let err = DriveClient::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("not set"), "{}", err);
    }

    #[test]
    fn list_page_parses_drive_shape() {
        let page: FileListPage = serde_json::from_str(
            r#"{"nextPageToken":"tok","files":[{"id":"1","name":"a.pdf","mimeType":"application/pdf"}]}"#,
        )
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
        assert_eq!(page.files[0].mime_type, "application/pdf");

        let last: FileListPage = serde_json::from_str(r#"{"files":[]}"#).unwrap();
        assert!(last.next_page_token.is_none());
    }
}
