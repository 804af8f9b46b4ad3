use std::time::Duration;

use api_types::{
    DataSourceType,
    metadata::FieldMetadata,
    report::{ExportFormat, ExportRequest, QueryResult, ReportConfiguration},
    template::{ReportTemplate, TemplateNew},
};
use reqwest::{Method, RequestBuilder, Response, Url, header};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    config::ClientConfig,
    error::{AppError, Result},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("not allowed")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rejected: {0}")]
    Validation(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// A rendered export, ready to be saved by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_http(base_url, reqwest::Client::new())
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Self::with_http(&config.base_url, http)
    }

    fn with_http(base_url: &str, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|err| AppError::InvalidUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::InvalidUrl(format!("{base_url} cannot be a base")));
        }
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn fetch_fields(
        &self,
        data_source: DataSourceType,
    ) -> std::result::Result<Vec<FieldMetadata>, ClientError> {
        let req = self.request(Method::GET, &["reports", "fields", data_source.as_str()])?;
        read_json(send(req).await?).await
    }

    pub async fn execute(
        &self,
        config: &ReportConfiguration,
    ) -> std::result::Result<QueryResult, ClientError> {
        let req = self.request(Method::POST, &["reports", "execute"])?.json(config);
        read_json(send(req).await?).await
    }

    pub async fn export(
        &self,
        request: &ExportRequest,
    ) -> std::result::Result<ExportArtifact, ClientError> {
        let req = self.request(Method::POST, &["reports", "export"])?.json(request);
        let res = send(req).await?;

        let headers = res.headers();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(request.format.content_type())
            .to_string();
        let file_name = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_name)
            .unwrap_or_else(|| {
                format!(
                    "{}-report.{}",
                    request.config.kind(),
                    request.format.extension()
                )
            });
        let bytes = res.bytes().await?.to_vec();
        tracing::debug!("downloaded {} ({} bytes)", file_name, bytes.len());

        Ok(ExportArtifact {
            format: request.format,
            file_name,
            content_type,
            bytes,
        })
    }

    pub async fn list_templates(
        &self,
        report_type: Option<DataSourceType>,
    ) -> std::result::Result<Vec<ReportTemplate>, ClientError> {
        let mut req = self.request(Method::GET, &["reports", "templates"])?;
        if let Some(report_type) = report_type {
            req = req.query(&[("reportType", report_type.as_str())]);
        }
        read_json(send(req).await?).await
    }

    pub async fn save_template(
        &self,
        template: &TemplateNew,
    ) -> std::result::Result<ReportTemplate, ClientError> {
        let req = self.request(Method::POST, &["reports", "templates"])?.json(template);
        read_json(send(req).await?).await
    }

    pub async fn load_template(
        &self,
        template_id: &str,
    ) -> std::result::Result<ReportTemplate, ClientError> {
        let req = self.request(Method::GET, &["reports", "templates", template_id])?;
        read_json(send(req).await?).await
    }

    pub async fn delete_template(&self, template_id: &str) -> std::result::Result<(), ClientError> {
        let req = self.request(Method::DELETE, &["reports", "templates", template_id])?;
        send(req).await?;
        Ok(())
    }

    /// Build a request for `segments` appended to the base path. Segments are
    /// percent-encoded, so template ids may contain any character.
    fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> std::result::Result<RequestBuilder, ClientError> {
        let mut endpoint = self.base_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|_| ClientError::Server(format!("invalid base_url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(self.http.request(method, endpoint))
    }
}

async fn send(req: RequestBuilder) -> std::result::Result<Response, ClientError> {
    let res = req.send().await?;
    if res.status().is_success() {
        return Ok(res);
    }
    Err(error_from(res).await)
}

async fn read_json<T: DeserializeOwned>(res: Response) -> std::result::Result<T, ClientError> {
    Ok(res.json::<T>().await?)
}

async fn error_from(res: Response) -> ClientError {
    let status = res.status();
    let body = res
        .json::<ErrorResponse>()
        .await
        .map(|err| err.error)
        .unwrap_or_else(|_| "unknown error".to_string());
    tracing::warn!("report backend answered {status}: {body}");

    match status.as_u16() {
        401 => ClientError::Unauthorized,
        403 => ClientError::Forbidden,
        404 => ClientError::NotFound,
        409 => ClientError::Conflict(body),
        422 => ClientError::Validation(body),
        _ => ClientError::Server(body),
    }
}

/// `filename` parameter of a `Content-Disposition` header.
fn attachment_name(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .find(|name| !name.is_empty())
}
