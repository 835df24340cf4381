//! Batch identifier resolution and batch creation.

use tracing::debug;

use crate::catalog::{CatalogClient, NewSample};
use crate::domain::{BatchCandidate, MatchPolicy, Orcid, Sample, SampleId};
use crate::error::SynthError;

/// Outcome of resolving a user-supplied batch identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResolution {
    /// A unique batch, or `None` when no batch was requested.
    Resolved { batch_id: Option<SampleId> },
    MultipleMatches {
        matches: Vec<BatchCandidate>,
        input: String,
    },
    NotFound { input: String },
}

impl BatchResolution {
    pub fn message(&self) -> String {
        match self {
            BatchResolution::Resolved { batch_id: Some(id) } => {
                format!("Batch resolved to ID: {id}")
            }
            BatchResolution::Resolved { batch_id: None } => "No batch selected".to_string(),
            BatchResolution::MultipleMatches { input, .. } => {
                format!("Multiple batches found with name '{input}'")
            }
            BatchResolution::NotFound { input } => format!("Batch '{input}' not found"),
        }
    }
}

/// Resolves `identifier` to a batch: exact id first, then exact name.
///
/// Never mutates the catalog. Under [`MatchPolicy::Lenient`] an error from the
/// by-id lookup is indistinguishable from "no such id" and falls through to the
/// name search.
pub fn resolve_batch<C: CatalogClient + ?Sized>(
    catalog: &C,
    identifier: &str,
    owner: &Orcid,
    project: &str,
    policy: MatchPolicy,
) -> Result<BatchResolution, SynthError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(BatchResolution::Resolved { batch_id: None });
    }
    debug!(identifier, owner = %owner, project, "resolving batch id");

    match catalog.get_sample(identifier) {
        Ok(Some(batch)) => {
            debug!(unique_id = %batch.unique_id, "batch found by unique id");
            return Ok(BatchResolution::Resolved {
                batch_id: Some(SampleId::new(identifier)),
            });
        }
        Ok(None) => {}
        Err(err) if !policy.is_strict() => {
            debug!(error = %err, "batch id lookup failed, trying name search");
        }
        Err(err) => return Err(err),
    }

    let mut batches = catalog.list_samples(identifier, None)?;
    match batches.len() {
        0 => {
            debug!(identifier, "no batch found by name");
            Ok(BatchResolution::NotFound {
                input: identifier.to_string(),
            })
        }
        1 => {
            let batch = batches.remove(0);
            debug!(unique_id = %batch.unique_id, "batch resolved by name");
            Ok(BatchResolution::Resolved {
                batch_id: Some(batch.unique_id),
            })
        }
        count => {
            debug!(identifier, count, "multiple batches share the name");
            Ok(BatchResolution::MultipleMatches {
                matches: batches.into_iter().map(BatchCandidate::from).collect(),
                input: identifier.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub batch_name: String,
    pub batch_id: String,
    pub description: Option<String>,
}

/// Creates a batch sample named by its batch id.
pub fn create_batch<C: CatalogClient + ?Sized>(
    catalog: &C,
    batch: &NewBatch,
    owner: &Orcid,
    project: &str,
) -> Result<Sample, SynthError> {
    if batch.batch_name.trim().is_empty() || batch.batch_id.trim().is_empty() {
        return Err(SynthError::InvalidRequest(
            "Batch name and ID are required".to_string(),
        ));
    }
    let description = batch
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("Batch {}", batch.batch_name));

    catalog.add_sample(&NewSample {
        sample_name: batch.batch_id.clone(),
        description: Some(description),
        creation_date: catalog.now(),
        owner_orcid: owner.to_string(),
        project_id: project.to_string(),
    })
}
