use std::{fmt, str::FromStr};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    domain::TaskId,
    error::ServiceError,
    protocol::{CheckVideoResultRequest, GenerateVideoRequest, GenerateVideoResponse, StatusResponse},
};
use tracing::debug;
use url::Url;

use crate::error::ApiCallError;

/// Which endpoint shape the generation service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFlavor {
    /// `GET /check-status/{taskId}` with queue positions and progress.
    #[default]
    TaskQueue,
    /// `POST /check-video-result` with an `{id}` body.
    SyncId,
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskQueue => f.write_str("task_queue"),
            Self::SyncId => f.write_str("sync_id"),
        }
    }
}

impl FromStr for ApiFlavor {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "task_queue" | "taskqueue" => Ok(Self::TaskQueue),
            "sync_id" | "syncid" => Ok(Self::SyncId),
            _ => Err(format!(
                "unknown api flavor '{raw}', expected 'task_queue' or 'sync_id'"
            )),
        }
    }
}

#[async_trait]
pub trait VideoApi: Send + Sync {
    async fn create_task(
        &self,
        request: &GenerateVideoRequest,
    ) -> Result<GenerateVideoResponse, ApiCallError>;
    async fn check_status(&self, task_id: &TaskId) -> Result<StatusResponse, ApiCallError>;
}

pub struct HttpVideoApi {
    http: Client,
    base_url: Url,
    flavor: ApiFlavor,
}

impl HttpVideoApi {
    pub fn new(base_url: &str, flavor: ApiFlavor) -> Result<Self, ApiCallError> {
        Self::with_client(Client::new(), base_url, flavor)
    }

    pub fn with_client(http: Client, base_url: &str, flavor: ApiFlavor) -> Result<Self, ApiCallError> {
        let mut parsed = Url::parse(base_url.trim()).map_err(|err| ApiCallError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ApiCallError::InvalidUrl {
                url: base_url.to_string(),
                reason: "url cannot be used as a base".to_string(),
            });
        }
        // Url::join replaces the last segment unless the path ends in '/'.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            http,
            base_url: parsed,
            flavor,
        })
    }

    pub fn flavor(&self) -> ApiFlavor {
        self.flavor
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiCallError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiCallError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: err.to_string(),
            })
    }

    fn status_endpoint(&self, task_id: &TaskId) -> Result<Url, ApiCallError> {
        let mut url = self.endpoint("check-status/")?;
        url.path_segments_mut()
            .map_err(|_| ApiCallError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "url cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .push(task_id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl VideoApi for HttpVideoApi {
    async fn create_task(
        &self,
        request: &GenerateVideoRequest,
    ) -> Result<GenerateVideoResponse, ApiCallError> {
        let url = self.endpoint("generate-video")?;
        debug!(%url, model = %request.model, "creating generation task");
        let res = self.http.post(url).json(request).send().await?;
        decode_json(res).await
    }

    async fn check_status(&self, task_id: &TaskId) -> Result<StatusResponse, ApiCallError> {
        let res = match self.flavor {
            ApiFlavor::TaskQueue => self.http.get(self.status_endpoint(task_id)?).send().await?,
            ApiFlavor::SyncId => {
                self.http
                    .post(self.endpoint("check-video-result")?)
                    .json(&CheckVideoResultRequest {
                        id: task_id.0.clone(),
                    })
                    .send()
                    .await?
            }
        };
        decode_json(res).await
    }
}

async fn decode_json<T: DeserializeOwned>(res: Response) -> Result<T, ApiCallError> {
    let status = res.status();
    let body = res.bytes().await?;
    if !status.is_success() {
        let detail = serde_json::from_slice::<ServiceError>(&body)
            .map(|err| err.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
        return Err(ApiCallError::Status { status, detail });
    }
    serde_json::from_slice(&body).map_err(|err| ApiCallError::Decode(err.to_string()))
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
