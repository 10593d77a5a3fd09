use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::model::ValidationResult;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

pub const PDF_ENDPOINT: &str = "/extract-and-validate-pdfs";
pub const JSON_ENDPOINT: &str = "/validate-json";
pub const HEALTH_ENDPOINT: &str = "/health";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw response plus the result list pulled out of it.
#[derive(Clone, Debug)]
pub struct ServiceReply {
    pub results: Vec<ValidationResult>,
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct PdfReply {
    validation_results: Vec<ValidationResult>,
}

#[derive(Deserialize)]
struct JsonReply {
    results: Vec<ValidationResult>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// The remote side of a validation session.
#[async_trait]
pub trait ValidationService: Send + Sync {
    async fn validate_pdfs(&self, files: &[PathBuf]) -> Result<ServiceReply, ServiceError>;

    async fn validate_json(&self, payload: &serde_json::Value)
        -> Result<ServiceReply, ServiceError>;

    async fn health(&self) -> Result<Health, ServiceError>;
}

#[derive(Clone, Debug)]
pub struct ServiceOptions {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            proxy: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpValidationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpValidationService {
    pub fn new(options: &ServiceOptions) -> Result<Self, ServiceError> {
        let client = build_client(options.proxy.as_deref(), options.timeout_seconds)?;
        Ok(Self {
            client,
            base_url: normalize_base_url(&options.base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_reply<T: DeserializeOwned>(
        url: &str,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<(T, serde_json::Value), ServiceError> {
        let response = response.map_err(|e| ServiceError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ServiceError::Transport {
            url: url.to_string(),
            source: e,
        })?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        let raw: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ServiceError::Decode {
                url: url.to_string(),
                source: e,
            })?;
        let typed = T::deserialize(&raw).map_err(|e| ServiceError::Decode {
            url: url.to_string(),
            source: e,
        })?;
        Ok((typed, raw))
    }
}

#[async_trait]
impl ValidationService for HttpValidationService {
    async fn validate_pdfs(&self, files: &[PathBuf]) -> Result<ServiceReply, ServiceError> {
        let mut form = Form::new();
        for path in files {
            form = form.part("files", pdf_part(path).await?);
        }

        let url = self.endpoint(PDF_ENDPOINT);
        let response = self.client.post(&url).multipart(form).send().await;
        let (reply, raw) = Self::read_reply::<PdfReply>(&url, response).await?;
        Ok(ServiceReply {
            results: reply.validation_results,
            raw,
        })
    }

    async fn validate_json(
        &self,
        payload: &serde_json::Value,
    ) -> Result<ServiceReply, ServiceError> {
        let url = self.endpoint(JSON_ENDPOINT);
        let response = self.client.post(&url).json(payload).send().await;
        let (reply, raw) = Self::read_reply::<JsonReply>(&url, response).await?;
        Ok(ServiceReply {
            results: reply.results,
            raw,
        })
    }

    async fn health(&self) -> Result<Health, ServiceError> {
        let url = self.endpoint(HEALTH_ENDPOINT);
        let response = self.client.get(&url).send().await;
        let (health, _) = Self::read_reply::<Health>(&url, response).await?;
        Ok(health)
    }
}

async fn pdf_part(path: &Path) -> Result<Part, ServiceError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ServiceError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Part::bytes(bytes)
        .file_name(filename)
        .mime_str("application/pdf")
        .map_err(|e| ServiceError::HttpClientBuild { source: e })
}

fn normalize_base_url(url: &str) -> String {
    let mut normalized = url.trim().to_string();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

fn build_client(proxy: Option<&str>, timeout_seconds: u64) -> Result<reqwest::Client, ServiceError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!("invoice-qc/", env!("CARGO_PKG_VERSION"))),
    );

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_seconds));

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| ServiceError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ServiceError::HttpClientBuild { source: e })
}
