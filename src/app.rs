use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::catalog::CatalogClient;
use crate::domain::{BatchCandidate, MatchPolicy, Orcid, SampleId, SynthesisType};
use crate::error::SynthError;
use crate::resolver::{BatchResolution, NewBatch, create_batch, resolve_batch};
use crate::sheets::SheetMirror;
use crate::upload::{UploadJob, UploadSummary, upload_all};

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub email: Option<String>,
    pub orcid: String,
    pub user_name: String,
    pub project: String,
    pub synthesis_type: String,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub session_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub summary: Option<UploadSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResolveRequest {
    pub batch_id: String,
    pub orcid: String,
    pub project: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStatus {
    Resolved,
    MultipleMatches,
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResolveResponse {
    pub status: ResolveStatus,
    pub batch_id: Option<SampleId>,
    pub matches: Option<Vec<BatchCandidate>>,
    pub input: Option<String>,
    pub message: Option<String>,
}

impl From<BatchResolution> for BatchResolveResponse {
    fn from(resolution: BatchResolution) -> Self {
        let message = Some(resolution.message());
        match resolution {
            BatchResolution::Resolved { batch_id } => Self {
                status: ResolveStatus::Resolved,
                batch_id,
                matches: None,
                input: None,
                message,
            },
            BatchResolution::MultipleMatches { matches, input } => Self {
                status: ResolveStatus::MultipleMatches,
                batch_id: None,
                matches: Some(matches),
                input: Some(input),
                message,
            },
            BatchResolution::NotFound { input } => Self {
                status: ResolveStatus::NotFound,
                batch_id: None,
                matches: None,
                input: Some(input),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchCreateRequest {
    pub batch_name: String,
    pub batch_id: String,
    #[serde(default)]
    pub batch_description: Option<String>,
    pub orcid: String,
    pub project: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchCreateResponse {
    pub success: bool,
    pub unique_id: SampleId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldsResponse {
    pub fields: Map<String, Value>,
}

/// Entry point for the request/response contracts, holding the injected clients.
#[derive(Clone)]
pub struct App<C: CatalogClient, M: SheetMirror> {
    catalog: C,
    mirror: M,
    policy: MatchPolicy,
}

impl<C: CatalogClient, M: SheetMirror> App<C, M> {
    pub fn new(catalog: C, mirror: M, policy: MatchPolicy) -> Self {
        Self {
            catalog,
            mirror,
            policy,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn mirror(&self) -> &M {
        &self.mirror
    }

    pub fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, SynthError> {
        info!(
            synthesis_type = %request.synthesis_type,
            project = %request.project,
            rows = request.data.len(),
            "upload request"
        );
        if request.data.is_empty() {
            return Ok(UploadResponse {
                success: false,
                message: "No data provided for upload".to_string(),
                summary: None,
            });
        }

        let synthesis_type: SynthesisType = request.synthesis_type.parse()?;
        let owner: Orcid = request.orcid.parse()?;
        let batch_id = request
            .batch_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(SampleId::new);
        let session = request
            .session_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let job = UploadJob {
            owner: &owner,
            project: &request.project,
            synthesis_type,
            batch_id: batch_id.as_ref(),
            operator: &request.user_name,
            session,
            policy: self.policy,
        };
        let (message, summary) = upload_all(&self.catalog, &self.mirror, &job, &request.data)?;
        Ok(UploadResponse {
            success: true,
            message,
            summary: Some(summary),
        })
    }

    pub fn resolve_batch(
        &self,
        request: &BatchResolveRequest,
    ) -> Result<BatchResolveResponse, SynthError> {
        info!(batch_id = %request.batch_id, "resolving batch");
        if request.batch_id.trim().is_empty() {
            return Ok(BatchResolution::Resolved { batch_id: None }.into());
        }
        let owner: Orcid = request.orcid.parse()?;
        let resolution = resolve_batch(
            &self.catalog,
            &request.batch_id,
            &owner,
            &request.project,
            self.policy,
        )?;
        Ok(resolution.into())
    }

    pub fn create_batch(
        &self,
        request: &BatchCreateRequest,
    ) -> Result<BatchCreateResponse, SynthError> {
        info!(
            batch_name = %request.batch_name,
            batch_id = %request.batch_id,
            "creating batch"
        );
        let owner: Orcid = request.orcid.parse()?;
        let batch = NewBatch {
            batch_name: request.batch_name.clone(),
            batch_id: request.batch_id.clone(),
            description: request.batch_description.clone(),
        };
        let created = create_batch(&self.catalog, &batch, &owner, &request.project)?;
        info!(unique_id = %created.unique_id, "batch created");
        Ok(BatchCreateResponse {
            success: true,
            unique_id: created.unique_id,
            message: format!("Batch '{}' created successfully", request.batch_name),
        })
    }

    pub fn fields(&self) -> FieldsResponse {
        synthesis_fields()
    }
}

/// Field names per synthesis type, keyed by the type's label.
pub fn synthesis_fields() -> FieldsResponse {
    let fields = SynthesisType::ALL
        .into_iter()
        .map(|kind| (kind.label().to_string(), Value::from(kind.fields().to_vec())))
        .collect();
    FieldsResponse { fields }
}
