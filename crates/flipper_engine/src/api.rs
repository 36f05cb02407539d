use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use flipper_core::{
    AnalysisId, BatchId, BatchSummary, FileFormatInfo, JobId, JobSnapshot, JobStatusSummary,
    JobTemplate, QueueStats, TemplateId,
};
use flipper_logging::flipper_debug;

use crate::types::map_reqwest_error;
use crate::{ClientError, ClientSettings};

pub const BATCH_CONTENT: &str = "batch-content";
pub const BATCH_GET: &str = "batch/get";
pub const JOB_STATUS: &str = "job-status";
pub const JOB_NEW: &str = "job/new";
pub const UPLOAD: &str = "upload";
pub const ANALYSIS_GET: &str = "analysis/get";
pub const JOB_TEMPLATES: &str = "jobtemplate";
pub const QUEUE_STATS: &str = "jobrunner/queuestats";
pub const JOB_SUMMARY: &str = "job/summary/status";

/// Raw body chunks of a streamed response.
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// The remote transcoding service as seen by the controllers.
#[async_trait::async_trait]
pub trait ServiceApi: Send + Sync {
    /// Resolves an endpoint path plus query pairs against the service base.
    fn resolve(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError>;

    /// Issues a GET whose body is consumed incrementally.
    async fn open_stream(&self, url: Url) -> Result<ByteStream, ClientError>;

    async fn job_status(&self, job_id: JobId) -> Result<JobSnapshot, ClientError>;

    async fn create_job(&self, template_id: TemplateId) -> Result<JobId, ClientError>;

    async fn upload(&self, job_id: JobId, data: Bytes) -> Result<(), ClientError>;

    /// `Ok(None)` when the service has no result for the id yet.
    async fn analysis(&self, result_id: AnalysisId) -> Result<Option<FileFormatInfo>, ClientError>;

    async fn job_templates(&self) -> Result<Vec<JobTemplate>, ClientError>;

    async fn batch_summary(&self, batch_id: BatchId) -> Result<BatchSummary, ClientError>;

    async fn queue_stats(&self) -> Result<QueueStats, ClientError>;

    /// Job counts per status across the service.
    async fn job_summary(&self) -> Result<JobStatusSummary, ClientError>;
}

#[derive(Serialize)]
struct NewJobRequest {
    #[serde(rename = "jobTemplateId")]
    job_template_id: TemplateId,
}

#[derive(Deserialize)]
struct NewJobResponse {
    #[serde(rename = "jobContainerId")]
    job_container_id: JobId,
}

#[derive(Deserialize)]
struct AnalysisResponse {
    entry: FileFormatInfo,
}

#[derive(Deserialize)]
struct TemplateListResponse {
    #[serde(default)]
    entries: Vec<JobTemplate>,
}

#[derive(Deserialize)]
struct JobSummaryResponse {
    #[serde(default)]
    data: JobStatusSummary,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    client: reqwest::Client,
    base: Url,
    settings: ClientSettings,
}

impl ReqwestApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| ClientError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        // Without the trailing slash `join` would replace the last path segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self {
            client,
            base,
            settings,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        flipper_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode_json(ensure_success(response).await?).await
    }
}

#[async_trait::async_trait]
impl ServiceApi for ReqwestApi {
    fn resolve(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ClientError::InvalidUrl(format!("{path}: {err}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn open_stream(&self, url: Url) -> Result<ByteStream, ClientError> {
        flipper_debug!("GET (stream) {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }

    async fn job_status(&self, job_id: JobId) -> Result<JobSnapshot, ClientError> {
        let url = self.resolve(JOB_STATUS, &[("jobId", job_id.to_string())])?;
        self.get_json(url).await
    }

    async fn create_job(&self, template_id: TemplateId) -> Result<JobId, ClientError> {
        let url = self.resolve(JOB_NEW, &[])?;
        let body = serde_json::to_vec(&NewJobRequest {
            job_template_id: template_id,
        })
        .map_err(|err| ClientError::Decode(err.to_string()))?;
        flipper_debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .timeout(self.settings.request_timeout)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let created: NewJobResponse = decode_json(ensure_success(response).await?).await?;
        Ok(created.job_container_id)
    }

    async fn upload(&self, job_id: JobId, data: Bytes) -> Result<(), ClientError> {
        let url = self.resolve(UPLOAD, &[("forJob", job_id.to_string())])?;
        flipper_debug!("POST {} ({} bytes)", url, data.len());
        // No overall timeout: large media files take as long as they take.
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn analysis(&self, result_id: AnalysisId) -> Result<Option<FileFormatInfo>, ClientError> {
        let url = self.resolve(ANALYSIS_GET, &[("forId", result_id.to_string())])?;
        flipper_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let payload: AnalysisResponse = decode_json(ensure_success(response).await?).await?;
        Ok(Some(payload.entry))
    }

    async fn job_templates(&self) -> Result<Vec<JobTemplate>, ClientError> {
        let url = self.resolve(JOB_TEMPLATES, &[])?;
        let list: TemplateListResponse = self.get_json(url).await?;
        Ok(list.entries)
    }

    async fn batch_summary(&self, batch_id: BatchId) -> Result<BatchSummary, ClientError> {
        let url = self.resolve(BATCH_GET, &[("forId", batch_id.to_string())])?;
        self.get_json(url).await
    }

    async fn queue_stats(&self) -> Result<QueueStats, ClientError> {
        let url = self.resolve(QUEUE_STATS, &[])?;
        self.get_json(url).await
    }

    async fn job_summary(&self) -> Result<JobStatusSummary, ClientError> {
        let url = self.resolve(JOB_SUMMARY, &[])?;
        let response: JobSummaryResponse = self.get_json(url).await?;
        Ok(response.data)
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body).map_err(|err| ClientError::Decode(err.to_string()))
}

/// Passes 2xx responses through and turns everything else into `ClientError::Server`.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Server {
        status: status.as_u16(),
        detail: error_detail(status, &body),
    })
}

/// JSON `detail` first, then the raw body, then the status line.
pub fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.detail;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_prefers_json_field() {
        let detail = error_detail(
            StatusCode::BAD_REQUEST,
            r#"{"status":"error","detail":"Invalid file ID"}"#,
        );
        assert_eq!(detail, "Invalid file ID");
    }

    #[test]
    fn detail_falls_back_to_text_then_status_line() {
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, "upstream went away\n"),
            "upstream went away"
        );
        assert_eq!(
            error_detail(StatusCode::INTERNAL_SERVER_ERROR, "  "),
            "500 Internal Server Error"
        );
    }

    #[test]
    fn resolve_keeps_base_path_and_encodes_query() {
        let api = ReqwestApi::new(ClientSettings {
            base_url: "http://console.example/api".to_string(),
            ..ClientSettings::default()
        })
        .unwrap();
        let url = api
            .resolve(BATCH_CONTENT, &[("state", "not queued".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://console.example/api/batch-content?state=not+queued"
        );
    }
}
