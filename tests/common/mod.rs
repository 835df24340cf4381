#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::{Map, Value};

use synth_upload::catalog::{CatalogClient, NewDataset, NewSample};
use synth_upload::domain::{DatasetId, Orcid, Sample, SampleId};
use synth_upload::error::SynthError;
use synth_upload::schema::SheetLayout;
use synth_upload::sheets::SheetMirror;

pub const NOW: &str = "2025-03-04T09:30:00-08:00";

pub fn owner() -> Orcid {
    "0000-0002-1825-0097".parse().unwrap()
}

pub fn rows(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => map,
                other => panic!("row is not an object: {other}"),
            })
            .collect(),
        other => panic!("rows are not an array: {other}"),
    }
}

#[derive(Debug, Clone)]
pub struct RecordedDataset {
    pub id: DatasetId,
    pub dataset: NewDataset,
    pub metadata: Value,
    pub keywords: Vec<String>,
}

#[derive(Default)]
pub struct CatalogState {
    pub samples: Vec<Sample>,
    pub links: Vec<(SampleId, SampleId)>,
    pub datasets: Vec<RecordedDataset>,
    pub dataset_links: Vec<(DatasetId, SampleId)>,
    pub get_calls: usize,
    pub list_calls: Vec<(String, Option<String>)>,
    pub fail_get: bool,
    pub reject_names: Vec<String>,
    pub reject_datasets_for: Vec<String>,
    next_id: usize,
}

/// In-memory catalog with exact-name search and configurable failures.
#[derive(Default)]
pub struct MockCatalog {
    pub state: Mutex<CatalogState>,
}

impl MockCatalog {
    pub fn seed(&self, name: &str, project: &str) -> SampleId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = SampleId::new(format!("seed-{:03}", state.next_id));
        state.samples.push(Sample {
            unique_id: id.clone(),
            name: name.to_string(),
            description: Some(format!("seeded {name}")),
            owner: None,
            project: Some(project.to_string()),
            batch_id: None,
            created_at: Some("2024-12-01T00:00:00+00:00".to_string()),
        });
        id
    }

    pub fn fail_id_lookups(&self) {
        self.state.lock().unwrap().fail_get = true;
    }

    pub fn reject_sample(&self, name: &str) {
        self.state.lock().unwrap().reject_names.push(name.to_string());
    }

    pub fn reject_dataset_for(&self, sample_name: &str) {
        self.state
            .lock()
            .unwrap()
            .reject_datasets_for
            .push(sample_name.to_string());
    }

    pub fn samples_named(&self, name: &str) -> Vec<Sample> {
        self.state
            .lock()
            .unwrap()
            .samples
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }
}

impl CatalogClient for MockCatalog {
    fn get_sample(&self, id: &str) -> Result<Option<Sample>, SynthError> {
        let mut state = self.state.lock().unwrap();
        state.get_calls += 1;
        if state.fail_get {
            return Err(SynthError::CatalogStatus {
                status: 500,
                message: "lookup unavailable".to_string(),
            });
        }
        Ok(state
            .samples
            .iter()
            .find(|s| s.unique_id.as_str() == id)
            .cloned())
    }

    fn list_samples(&self, name: &str, project: Option<&str>) -> Result<Vec<Sample>, SynthError> {
        let mut state = self.state.lock().unwrap();
        state
            .list_calls
            .push((name.to_string(), project.map(str::to_string)));
        Ok(state
            .samples
            .iter()
            .filter(|s| s.name == name)
            .filter(|s| project.is_none_or(|p| s.project.as_deref() == Some(p)))
            .cloned()
            .collect())
    }

    fn add_sample(&self, sample: &NewSample) -> Result<Sample, SynthError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_names.contains(&sample.sample_name) {
            return Err(SynthError::CatalogStatus {
                status: 409,
                message: format!("sample name {} already exists", sample.sample_name),
            });
        }
        state.next_id += 1;
        let created = Sample {
            unique_id: SampleId::new(format!("smp-{:03}", state.next_id)),
            name: sample.sample_name.clone(),
            description: sample.description.clone(),
            owner: Some(sample.owner_orcid.clone()),
            project: Some(sample.project_id.clone()),
            batch_id: None,
            created_at: Some(sample.creation_date.clone()),
        };
        state.samples.push(created.clone());
        Ok(created)
    }

    fn link_samples(&self, parent: &SampleId, child: &SampleId) -> Result<(), SynthError> {
        let mut state = self.state.lock().unwrap();
        if !state.samples.iter().any(|s| &s.unique_id == parent) {
            return Err(SynthError::CatalogStatus {
                status: 404,
                message: format!("sample {parent} not found"),
            });
        }
        state.links.push((parent.clone(), child.clone()));
        Ok(())
    }

    fn create_dataset(
        &self,
        dataset: &NewDataset,
        metadata: &Value,
        keywords: &[String],
    ) -> Result<DatasetId, SynthError> {
        let mut state = self.state.lock().unwrap();
        let sample_name = metadata["sample_name"].as_str().unwrap_or_default();
        if state.reject_datasets_for.iter().any(|n| n == sample_name) {
            return Err(SynthError::CatalogStatus {
                status: 422,
                message: "dataset rejected".to_string(),
            });
        }
        state.next_id += 1;
        let id = DatasetId::new(format!("ds-{:03}", state.next_id));
        state.datasets.push(RecordedDataset {
            id: id.clone(),
            dataset: dataset.clone(),
            metadata: metadata.clone(),
            keywords: keywords.to_vec(),
        });
        Ok(id)
    }

    fn add_dataset_to_sample(
        &self,
        dataset: &DatasetId,
        sample: &SampleId,
    ) -> Result<(), SynthError> {
        self.state
            .lock()
            .unwrap()
            .dataset_links
            .push((dataset.clone(), sample.clone()));
        Ok(())
    }

    fn now(&self) -> String {
        NOW.to_string()
    }
}

#[derive(Default)]
pub struct MockMirror {
    pub rows: Mutex<Vec<(String, Vec<String>)>>,
    pub unavailable: bool,
}

impl MockMirror {
    pub fn unavailable() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            unavailable: true,
        }
    }

    pub fn appended(&self) -> Vec<(String, Vec<String>)> {
        self.rows.lock().unwrap().clone()
    }
}

impl SheetMirror for MockMirror {
    fn append_row(&self, layout: &SheetLayout, values: &[String]) -> Result<(), SynthError> {
        if self.unavailable {
            return Err(SynthError::SheetsStatus {
                status: 503,
                message: "sheet unavailable".to_string(),
            });
        }
        self.rows
            .lock()
            .unwrap()
            .push((layout.sheet_name.to_string(), values.to_vec()));
        Ok(())
    }
}
