// SPDX-License-Identifier: MIT
//!
//! RAG index service REST API wrapper
//!

use crate::error::ClientError;

/// Environment variable selecting the backend base URL
pub const BACKEND_ENV: &str = "RAG_BACKEND_URL";

/// Backend used when neither config, environment nor command line names one
pub const DEFAULT_BACKEND: &str = "http://localhost:8000";

pub struct RagService {
    base_url: String,
    http: reqwest::Client,
}

impl RagService {
    /// New client for the service at `base_url` (scheme and host, no `/rag`)
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// New client from loaded config
    pub fn with_config(config: &ClientConfig) -> Self {
        Self::new(config.backend_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current index state, `GET /rag/status`
    pub async fn status(&self) -> Result<IndexStatus, ClientError> {
        let resp = self.http.get(self.endpoint("status")).send().await?;
        read_json(resp).await
    }

    /// Upload glossary spreadsheet and rebuild the index, `POST /rag/upload`
    pub async fn upload(&self, req: &UploadRequest<'_>) -> Result<UploadResult, ClientError> {
        let form = req.to_form().await?;
        log::debug!("Upload {:?} to {}", req.file, self.endpoint("upload"));

        let resp = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        read_json(resp).await
    }

    /// Translate text with glossary retrieval, `POST /rag/query`
    pub async fn query(&self, req: &QueryRequest<'_>) -> Result<QueryResult, ClientError> {
        log::debug!(
            "Query {} ({} chars) to {}",
            req.direction,
            req.query.chars().count(),
            self.endpoint("query")
        );

        let resp = self
            .http
            .post(self.endpoint("query"))
            .json(req)
            .send()
            .await?;
        read_json(resp).await
    }

    // Service endpoint URL
    fn endpoint(&self, api: &str) -> String {
        format!("{}/rag/{}", self.base_url.trim_end_matches('/'), api)
    }
}

/// Read whole body, then classify it by HTTP status
async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    log::trace!("{} {}", status, String::from_utf8_lossy(&body));

    parse_body(status, &body)
}

fn parse_body<T: serde::de::DeserializeOwned>(
    status: reqwest::StatusCode,
    body: &[u8],
) -> Result<T, ClientError> {
    if status.is_success() {
        Ok(serde_json::from_slice(body)?)
    } else {
        Err(ClientError::Rejected {
            status,
            detail: error_detail(body),
        })
    }
}

/// `detail` of an error body such as `{"detail": "rate limited"}`
fn error_detail(body: &[u8]) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        detail: serde_json::Value,
    }

    let err_body = serde_json::from_slice::<ErrorBody>(body).ok()?;
    match err_body.detail {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s),
        // e.g. list of validation errors
        other => Some(other.to_string()),
    }
}

/// Translation direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "en2ar")]
    EnToAr,
    #[serde(rename = "ar2en")]
    ArToEn,
}

impl Direction {
    /// Token used on the wire
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::EnToAr => "en2ar",
            Self::ArToEn => "ar2en",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::EnToAr => "English → Arabic",
            Self::ArToEn => "Arabic → English",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

impl std::str::FromStr for Direction {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowcase = s.trim().to_ascii_lowercase();
        match lowcase.as_str() {
            "en2ar" => Ok(Self::EnToAr),
            "ar2en" => Ok(Self::ArToEn),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unknown direction {:?}, expected en2ar or ar2en", s),
            )),
        }
    }
}

/// Multipart upload of one glossary spreadsheet
#[derive(Clone, Copy, Debug)]
pub struct UploadRequest<'a> {
    pub file: &'a std::path::Path,
    pub sheet_name: Option<&'a str>,
    pub api_key: Option<&'a str>,
}

impl<'a> UploadRequest<'a> {
    async fn to_form(&self) -> Result<reqwest::multipart::Form, ClientError> {
        use reqwest::multipart::{Form, Part};

        let bytes = tokio::fs::read(self.file).await.map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", self.file.display(), e))
        })?;
        let file_name = self
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "glossary.xlsx".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(spreadsheet_mime(self.file))?;

        let mut form = Form::new().part("file", part);
        if let Some(sheet_name) = self.sheet_name.filter(|s| !s.is_empty()) {
            form = form.text("sheet_name", sheet_name.to_string());
        }
        if let Some(api_key) = self.api_key.filter(|s| !s.is_empty()) {
            form = form.text("api_key", api_key.to_string());
        }
        Ok(form)
    }
}

fn spreadsheet_mime(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Query request JSON
#[derive(serde::Serialize, Clone, Copy, Debug)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub direction: Direction,
    /// Always sent, empty when the caller has none
    pub api_key: &'a str,
}

impl<'a> QueryRequest<'a> {
    pub fn new(query: &'a str, direction: Direction, api_key: Option<&'a str>) -> Self {
        Self {
            query,
            direction,
            api_key: api_key.unwrap_or_default(),
        }
    }
}

/// Status response JSON
#[derive(serde::Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IndexStatus {
    #[serde(rename = "indexed", default, deserialize_with = "zero_if_null")]
    pub indexed_rows: u64,
    #[serde(default, deserialize_with = "positive_dim")]
    pub vector_dim: Option<u32>,
    /// Other fields the server reports, kept across uploads
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Upload response JSON
#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
pub struct UploadResult {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub rows_indexed: u64,
    #[serde(default, deserialize_with = "positive_dim")]
    pub vector_dim: Option<u32>,
}

/// Query response JSON
#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
pub struct QueryResult {
    /// Empty when the server sent none
    #[serde(default, deserialize_with = "empty_string_if_null")]
    pub translation: String,
    /// Relevance ranked, in server order
    #[serde(default, deserialize_with = "empty_if_null")]
    pub retrieved: Vec<RetrievedEntry>,
}

/// Glossary row the server matched for a query
#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
pub struct RetrievedEntry {
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub arabic: String,
}

fn zero_if_null<'de, D: serde::Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    use serde::Deserialize;
    Ok(Option::<u64>::deserialize(de)?.unwrap_or(0))
}

fn empty_string_if_null<'de, D: serde::Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    use serde::Deserialize;
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

fn positive_dim<'de, D: serde::Deserializer<'de>>(de: D) -> Result<Option<u32>, D::Error> {
    use serde::Deserialize;
    Ok(Option::<u32>::deserialize(de)?.filter(|dim| 0 < *dim))
}

fn empty_if_null<'de, D: serde::Deserializer<'de>>(
    de: D,
) -> Result<Vec<RetrievedEntry>, D::Error> {
    use serde::Deserialize;
    Ok(Option::<Vec<RetrievedEntry>>::deserialize(de)?.unwrap_or_default())
}

/// Client config, rag-translate.toml or ~/.rag-translate.toml
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct ClientConfig {
    backend_url: Option<String>,
    api_key: Option<String>,
    direction: Option<Direction>,
}

impl ClientConfig {
    /// Search default config file, falls back to defaults when none exists
    pub fn new() -> std::io::Result<Self> {
        use std::path::PathBuf;
        let config_files = [
            PathBuf::new().join("rag-translate.toml"),
            dirs::home_dir()
                .unwrap_or(PathBuf::new())
                .join(".rag-translate.toml"),
        ];

        for config_file in config_files {
            match Self::with_config(&config_file) {
                Ok(conf) => {
                    log::debug!("Read config file {:?}", config_file);
                    return Ok(conf);
                }
                Err(err) => {
                    if err.kind() == std::io::ErrorKind::NotFound {
                        log::debug!("Config file {:?} NOT found.", &config_file);
                    } else {
                        // Other err, stop searching
                        log::error!("Can not parse config file {:?} : {:?}", &config_file, err);
                        return Err(err);
                    }
                }
            }
        }

        log::debug!("No config file, use defaults");
        Ok(Self::default())
    }

    /// Config from specific file
    pub fn with_config<P: AsRef<std::path::Path>>(config_path: P) -> std::io::Result<Self> {
        let config = std::fs::read_to_string(&config_path)?;
        let client_config: ClientConfig = toml::from_str(&config)?;

        Ok(client_config)
    }

    /// Backend base URL: environment overrides file, file overrides default
    pub fn backend_url(&self) -> String {
        resolve_backend(
            self.backend_url.as_deref(),
            std::env::var(BACKEND_ENV).ok(),
        )
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn direction(&self) -> Direction {
        self.direction.unwrap_or_default()
    }

    /// Command line override
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }
}

fn resolve_backend(configured: Option<&str>, env: Option<String>) -> String {
    if let Some(url) = env.filter(|url| !url.trim().is_empty()) {
        log::debug!("Backend from {}: {}", BACKEND_ENV, url);
        url
    } else if let Some(url) = configured {
        url.to_string()
    } else {
        DEFAULT_BACKEND.to_string()
    }
}
