use std::time::Duration;

use reqwest::{StatusCode, Url};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{DatasetId, Sample, SampleId};
use crate::error::SynthError;

pub const DEFAULT_CATALOG_URL: &str = "https://crucible.lbl.gov/testapi";

#[derive(Debug, Clone, Serialize)]
pub struct NewSample {
    pub sample_name: String,
    pub description: Option<String>,
    pub creation_date: String,
    pub owner_orcid: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDataset {
    pub dataset_name: String,
    pub public: bool,
    pub owner_orcid: String,
    pub project_id: String,
    pub measurement: String,
    pub session_name: Option<String>,
    pub creation_time: String,
}

/// Capabilities of the remote sample/dataset catalog.
pub trait CatalogClient: Send + Sync {
    /// Exact lookup by unique id. `Ok(None)` when the catalog has no such sample.
    fn get_sample(&self, id: &str) -> Result<Option<Sample>, SynthError>;

    /// Exact-name search, optionally scoped to a project. Order is the catalog's.
    fn list_samples(&self, name: &str, project: Option<&str>) -> Result<Vec<Sample>, SynthError>;

    fn add_sample(&self, sample: &NewSample) -> Result<Sample, SynthError>;

    fn link_samples(&self, parent: &SampleId, child: &SampleId) -> Result<(), SynthError>;

    fn create_dataset(
        &self,
        dataset: &NewDataset,
        metadata: &Value,
        keywords: &[String],
    ) -> Result<DatasetId, SynthError>;

    fn add_dataset_to_sample(&self, dataset: &DatasetId, sample: &SampleId)
    -> Result<(), SynthError>;

    /// Current time in the local timezone, RFC 3339.
    fn now(&self) -> String {
        chrono::Local::now().to_rfc3339()
    }
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct CreatedDataset {
    created_record: CreatedRecord,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    unique_id: DatasetId,
}

impl CatalogHttpClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, SynthError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("synth-upload/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SynthError::CatalogHttp(err.to_string()))?,
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| SynthError::MissingSetting("a valid catalog API key".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SynthError::CatalogHttp(err.to_string()))?;
        let base_url =
            Url::parse(base_url).map_err(|err| SynthError::CatalogHttp(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Each segment is percent-encoded, so ids holding `#`, `?` or `/` stay one segment.
    fn url(&self, segments: &[&str]) -> Result<Url, SynthError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SynthError::CatalogHttp("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, SynthError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(SynthError::CatalogHttp(err.to_string()));
                }
            }
        }
    }

    // POSTs are sent once: a retried create would duplicate the record.
    fn send_once(request: RequestBuilder) -> Result<Response, SynthError> {
        request
            .send()
            .map_err(|err| SynthError::CatalogHttp(err.to_string()))
    }

    fn handle_status(response: Response) -> Result<Response, SynthError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        Err(SynthError::CatalogStatus { status, message })
    }

    fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, SynthError> {
        response
            .json()
            .map_err(|err| SynthError::CatalogResponse(err.to_string()))
    }
}

impl CatalogClient for CatalogHttpClient {
    fn get_sample(&self, id: &str) -> Result<Option<Sample>, SynthError> {
        let url = self.url(&["samples", id])?;
        let response = self.send_with_retries(|| self.client.get(url.clone()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::handle_status(response)?;
        let value: Value = Self::parse(response)?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| SynthError::CatalogResponse(err.to_string()))
    }

    fn list_samples(&self, name: &str, project: Option<&str>) -> Result<Vec<Sample>, SynthError> {
        let url = self.url(&["samples"])?;
        let mut query = vec![("sample_name", name)];
        if let Some(project) = project {
            query.push(("project_id", project));
        }
        let response = self.send_with_retries(|| self.client.get(url.clone()).query(&query))?;
        let response = Self::handle_status(response)?;
        let samples: Vec<Sample> = Self::parse(response)?;
        debug!(name, count = samples.len(), "sample name search");
        Ok(samples)
    }

    fn add_sample(&self, sample: &NewSample) -> Result<Sample, SynthError> {
        let response = Self::send_once(self.client.post(self.url(&["samples"])?).json(sample))?;
        let response = Self::handle_status(response)?;
        Self::parse(response)
    }

    fn link_samples(&self, parent: &SampleId, child: &SampleId) -> Result<(), SynthError> {
        let url = self.url(&["samples", parent.as_str(), "children", child.as_str()])?;
        let response = Self::send_once(self.client.post(url))?;
        Self::handle_status(response)?;
        Ok(())
    }

    fn create_dataset(
        &self,
        dataset: &NewDataset,
        metadata: &Value,
        keywords: &[String],
    ) -> Result<DatasetId, SynthError> {
        let body = json!({
            "dataset": dataset,
            "scientific_metadata": metadata,
            "keywords": keywords,
        });
        let response = Self::send_once(self.client.post(self.url(&["datasets"])?).json(&body))?;
        let response = Self::handle_status(response)?;
        let created: CreatedDataset = Self::parse(response)?;
        Ok(created.created_record.unique_id)
    }

    fn add_dataset_to_sample(
        &self,
        dataset: &DatasetId,
        sample: &SampleId,
    ) -> Result<(), SynthError> {
        let url = self.url(&["samples", sample.as_str(), "datasets", dataset.as_str()])?;
        let response = Self::send_once(self.client.post(url))?;
        Self::handle_status(response)?;
        Ok(())
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

pub(crate) fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
