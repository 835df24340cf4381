use tracing::{debug, info};

use crate::catalog::{CatalogClient, NewDataset};
use crate::domain::{DatasetId, Orcid, Sample};
use crate::error::SynthError;
use crate::row::{SampleInfo, SynthesisRecord};
use crate::sheets::SheetMirror;

pub fn dataset_name(record: &SynthesisRecord, sample_name: &str) -> String {
    format!("{} recipe for {sample_name}", record.synthesis_type())
}

/// Informational tags; absent values are dropped.
pub fn keywords(record: &SynthesisRecord, sample_name: &str, session: Option<&str>) -> Vec<String> {
    [
        Some(record.synthesis_type().label()),
        Some(sample_name),
        session,
    ]
    .into_iter()
    .flatten()
    .map(str::to_string)
    .collect()
}

/// Creates the row's dataset, links it to `sample` and mirrors the row to the sheet.
///
/// `sample` is the record the registrar created for this same row; its id is
/// the join key, so duplicate sample names in the project cannot misdirect the link.
#[allow(clippy::too_many_arguments)]
pub fn publish_dataset<C, M>(
    catalog: &C,
    mirror: &M,
    owner: &Orcid,
    project: &str,
    record: &SynthesisRecord,
    sample: &Sample,
    operator: &str,
    session: Option<&str>,
) -> Result<DatasetId, SynthError>
where
    C: CatalogClient + ?Sized,
    M: SheetMirror + ?Sized,
{
    let kind = record.synthesis_type();
    let timestamp = sample
        .created_at
        .clone()
        .ok_or_else(|| SynthError::InvalidRequest("sample has no creation timestamp".to_string()))?;

    let dataset = NewDataset {
        dataset_name: dataset_name(record, &sample.name),
        public: false,
        owner_orcid: owner.to_string(),
        project_id: project.to_string(),
        measurement: format!("{kind} synthesis"),
        session_name: session.map(str::to_string),
        creation_time: timestamp.clone(),
    };
    let metadata = record.metadata(&SampleInfo {
        unique_id: sample.unique_id.clone(),
        timestamp: timestamp.clone(),
        description: sample.description.clone(),
        project: project.to_string(),
        batch_id: sample
            .batch_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default(),
    })?;

    let dataset_id =
        catalog.create_dataset(&dataset, &metadata, &keywords(record, &sample.name, session))?;
    debug!(dataset = %dataset_id, sample = %sample.unique_id, "linking dataset to sample");
    catalog.add_dataset_to_sample(&dataset_id, &sample.unique_id)?;

    mirror.append_row(kind.sheet(), &record.sheet_row(operator, &timestamp))?;
    info!(
        sample = %sample.name,
        dataset = %dataset_id,
        sheet = kind.sheet().sheet_name,
        "published synthesis dataset"
    );
    Ok(dataset_id)
}
