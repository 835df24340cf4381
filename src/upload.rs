//! Bulk upload of synthesis rows with per-row failure isolation.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::catalog::CatalogClient;
use crate::domain::{MatchPolicy, Orcid, SampleId, SynthesisType};
use crate::error::SynthError;
use crate::linker::link_to_parent_by_name;
use crate::publisher::publish_dataset;
use crate::registrar::register_sample;
use crate::row::{SynthesisRecord, normalize_rows};
use crate::sheets::SheetMirror;

/// Parameters shared by every row of one upload.
#[derive(Debug, Clone)]
pub struct UploadJob<'a> {
    pub owner: &'a Orcid,
    pub project: &'a str,
    pub synthesis_type: SynthesisType,
    pub batch_id: Option<&'a SampleId>,
    pub operator: &'a str,
    pub session: Option<&'a str>,
    pub policy: MatchPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    #[serde(rename = "Project")]
    pub project: String,
    #[serde(rename = "Synthesis Type")]
    pub synthesis_type: SynthesisType,
    #[serde(rename = "Samples Uploaded")]
    pub succeeded: usize,
    #[serde(rename = "Failed")]
    pub failed: usize,
    #[serde(rename = "Total Rows")]
    pub total: usize,
    #[serde(rename = "Errors", skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Parent references left unresolved on rows that still succeeded.
    #[serde(rename = "Warnings", skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl UploadSummary {
    pub fn status_message(&self) -> String {
        match (self.succeeded, self.failed) {
            (0, 0) => "No samples to upload".to_string(),
            (ok, 0) => format!(
                "Successfully uploaded {ok} samples to project '{}'",
                self.project
            ),
            (0, failed) => format!("Upload failed: All {failed} samples failed to upload"),
            (ok, failed) => format!(
                "Partial upload: {ok} samples uploaded successfully, {failed} failed"
            ),
        }
    }
}

/// Uploads every non-empty row; a failing row never stops the rows after it.
///
/// Returns `Err` only when the input is unusable before any row is processed.
pub fn upload_all<C, M>(
    catalog: &C,
    mirror: &M,
    job: &UploadJob<'_>,
    rows: &[Map<String, Value>],
) -> Result<(String, UploadSummary), SynthError>
where
    C: CatalogClient + ?Sized,
    M: SheetMirror + ?Sized,
{
    if job.project.trim().is_empty() {
        return Err(SynthError::InvalidRequest("project is required".to_string()));
    }
    let records = normalize_rows(rows)?
        .into_iter()
        .map(|row| SynthesisRecord::from_row(job.synthesis_type, row))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        rows = records.len(),
        synthesis_type = %job.synthesis_type,
        project = job.project,
        "uploading synthesis rows"
    );

    let mut summary = UploadSummary {
        project: job.project.to_string(),
        synthesis_type: job.synthesis_type,
        succeeded: 0,
        failed: 0,
        total: records.len(),
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    for record in &records {
        let sample_name = record
            .sample_name()
            .unwrap_or_else(|| "Unknown".to_string());
        match upload_row(catalog, mirror, job, record) {
            Ok(warnings) => {
                summary.succeeded += 1;
                summary.warnings.extend(
                    warnings
                        .into_iter()
                        .map(|warning| format!("Sample '{sample_name}': {warning}")),
                );
            }
            Err(err) => {
                error!(sample = %sample_name, error = %err, "dataset upload failed");
                summary.failed += 1;
                summary.errors.push(format!("Sample '{sample_name}': {err}"));
            }
        }
    }

    let message = summary.status_message();
    info!(%message, "upload finished");
    Ok((message, summary))
}

fn upload_row<C, M>(
    catalog: &C,
    mirror: &M,
    job: &UploadJob<'_>,
    record: &SynthesisRecord,
) -> Result<Vec<String>, SynthError>
where
    C: CatalogClient + ?Sized,
    M: SheetMirror + ?Sized,
{
    let name = record
        .sample_name()
        .ok_or_else(|| SynthError::InvalidRows("Sample Name is required".to_string()))?;
    let description = record.sample_description();
    let sample = register_sample(
        catalog,
        job.owner,
        job.project,
        &name,
        description.as_deref(),
        job.batch_id,
    )?;

    let mut warnings = Vec::new();
    for field in job.synthesis_type.parent_fields() {
        let outcome =
            link_to_parent_by_name(catalog, record, field, job.project, &sample.unique_id)?;
        if outcome.is_unresolved() {
            if job.policy.is_strict() {
                return Err(SynthError::ParentLink {
                    field: field.to_string(),
                    outcome: outcome.to_string(),
                });
            }
            warnings.push(format!("{field}: {outcome}"));
        }
    }

    publish_dataset(
        catalog,
        mirror,
        job.owner,
        job.project,
        record,
        &sample,
        job.operator,
        job.session,
    )?;
    Ok(warnings)
}
