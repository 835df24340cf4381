use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::CatalogClient;
use crate::domain::SampleId;
use crate::error::SynthError;
use crate::row::SynthesisRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked { parent_id: SampleId },
    /// Several samples carry the referenced name; nothing was linked.
    AmbiguousParent { name: String, candidates: Vec<SampleId> },
    ParentNotFound { name: String },
    /// The row has no value for the reference field.
    Skipped,
}

impl LinkOutcome {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkOutcome::Linked { .. })
    }

    /// Whether the outcome left a reference unresolved.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            LinkOutcome::AmbiguousParent { .. } | LinkOutcome::ParentNotFound { .. }
        )
    }
}

impl fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkOutcome::Linked { parent_id } => write!(f, "linked to {parent_id}"),
            LinkOutcome::AmbiguousParent { name, candidates } => write!(
                f,
                "multiple parents named '{name}' found ({})",
                candidates.len()
            ),
            LinkOutcome::ParentNotFound { name } => write!(f, "parent '{name}' not found"),
            LinkOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Links `child` under the sample named by `record[field]` within `project`.
///
/// Ambiguous or missing parents are returned as outcomes, never as errors;
/// only catalog failures are errors.
pub fn link_to_parent_by_name<C: CatalogClient + ?Sized>(
    catalog: &C,
    record: &SynthesisRecord,
    field: &str,
    project: &str,
    child: &SampleId,
) -> Result<LinkOutcome, SynthError> {
    let Some(parent_name) = record.get(field).map(|cell| cell.to_string()) else {
        return Ok(LinkOutcome::Skipped);
    };

    let mut parents = catalog.list_samples(&parent_name, Some(project))?;
    match parents.len() {
        1 => {
            let parent = parents.remove(0);
            catalog.link_samples(&parent.unique_id, child)?;
            debug!(field, parent = %parent.unique_id, child = %child, "linked parent sample");
            Ok(LinkOutcome::Linked {
                parent_id: parent.unique_id,
            })
        }
        0 => {
            warn!(field, parent = %parent_name, project, "parent sample not found");
            Ok(LinkOutcome::ParentNotFound { name: parent_name })
        }
        count => {
            warn!(field, parent = %parent_name, count, "multiple parent samples found");
            Ok(LinkOutcome::AmbiguousParent {
                name: parent_name,
                candidates: parents.into_iter().map(|p| p.unique_id).collect(),
            })
        }
    }
}
