use tracing::debug;

use crate::catalog::{CatalogClient, NewSample};
use crate::domain::{Orcid, Sample, SampleId};
use crate::error::SynthError;

/// Creates one sample and, when a batch is given, links it as the batch's child.
///
/// A failed link is reported as this call's error even though the sample
/// itself was already created.
pub fn register_sample<C: CatalogClient + ?Sized>(
    catalog: &C,
    owner: &Orcid,
    project: &str,
    name: &str,
    description: Option<&str>,
    parent_batch: Option<&SampleId>,
) -> Result<Sample, SynthError> {
    let timestamp = catalog.now();
    debug!(name, project, owner = %owner, "adding sample to catalog");
    let mut sample = catalog.add_sample(&NewSample {
        sample_name: name.to_string(),
        description: description.map(str::to_string),
        creation_date: timestamp.clone(),
        owner_orcid: owner.to_string(),
        project_id: project.to_string(),
    })?;

    if let Some(batch) = parent_batch.filter(|id| !id.as_str().trim().is_empty()) {
        debug!(batch = %batch, child = %sample.unique_id, "linking sample to batch");
        catalog.link_samples(batch, &sample.unique_id)?;
        sample.batch_id = Some(batch.clone());
    }

    // datasets are stamped with the submitted time, not the catalog's echo
    sample.created_at = Some(timestamp);
    if sample.name.is_empty() {
        sample.name = name.to_string();
    }
    Ok(sample)
}
