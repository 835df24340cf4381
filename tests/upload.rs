mod common;

use assert_matches::assert_matches;
use serde_json::json;

use common::{MockCatalog, MockMirror, NOW, owner, rows};
use synth_upload::domain::{MatchPolicy, Orcid, SampleId, SynthesisType};
use synth_upload::error::SynthError;
use synth_upload::upload::{UploadJob, upload_all};

fn job<'a>(
    owner: &'a Orcid,
    synthesis_type: SynthesisType,
    batch_id: Option<&'a SampleId>,
    policy: MatchPolicy,
) -> UploadJob<'a> {
    UploadJob {
        owner,
        project: "P1",
        synthesis_type,
        batch_id,
        operator: "Ada",
        session: Some("run-7"),
        policy,
    }
}

#[test]
fn blank_rows_are_dropped_and_remaining_rows_succeed() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([
        {"sample_name": "A", "sample_description": "d1"},
        {"sample_name": "", "sample_description": ""},
        {"sample_name": "B", "sample_description": "d2"},
    ]));

    let (message, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    assert_eq!(message, "Successfully uploaded 2 samples to project 'P1'");
    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert!(summary.errors.is_empty());
    assert_eq!(catalog.state.lock().unwrap().datasets.len(), 2);
    assert_eq!(mirror.appended().len(), 2);
}

#[test]
fn sheet_headers_in_row_keys_are_canonicalized() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([
        {"Sample Name": "SP-9", "Sample Description": "PbI2 lot 3", "CAS": "10101-63-0", "Vendor": "TCI"},
    ]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();
    assert_eq!(summary.succeeded, 1);

    let created = catalog.samples_named("SP-9");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].description.as_deref(), Some("PbI2 lot 3"));

    let appended = mirror.appended();
    let (sheet, values) = &appended[0];
    assert_eq!(sheet, "SolidPrecursors");
    assert_eq!(values[0], "SP-9");
    assert_eq!(values[1], "Ada");
    assert_eq!(values[2], NOW);
    assert_eq!(values[4], "10101-63-0");
    assert_eq!(values[8], "TCI");
}

#[test]
fn failing_row_is_isolated_from_its_neighbours() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    catalog.reject_sample("SP-2");
    let data = rows(json!([
        {"sample_name": "SP-1"},
        {"sample_name": "SP-2"},
        {"sample_name": "SP-3"},
    ]));

    let (message, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    assert_eq!(
        message,
        "Partial upload: 2 samples uploaded successfully, 1 failed"
    );
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("Sample 'SP-2':"));
    assert_eq!(catalog.samples_named("SP-1").len(), 1);
    assert_eq!(catalog.samples_named("SP-3").len(), 1);
    assert!(catalog.samples_named("SP-2").is_empty());
}

#[test]
fn every_row_failing_reports_total_failure() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::unavailable();
    let owner = owner();
    let data = rows(json!([{"sample_name": "SP-1"}, {"sample_name": "SP-2"}]));

    let (message, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    assert_eq!(message, "Upload failed: All 2 samples failed to upload");
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.succeeded, 0);
}

#[test]
fn rows_that_are_all_blank_upload_nothing() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([{"sample_name": " ", "notes": null}]));

    let (message, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    assert_eq!(message, "No samples to upload");
    assert_eq!(summary.total, 0);
    assert!(catalog.state.lock().unwrap().samples.is_empty());
}

#[test]
fn row_without_sample_name_fails_alone() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([
        {"notes": "forgot the name"},
        {"sample_name": "SP-2"},
    ]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].starts_with("Sample 'Unknown':"));
    assert!(summary.errors[0].contains("Sample Name is required"));
}

#[test]
fn nested_cell_values_abort_before_any_row() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([
        {"sample_name": "SP-1"},
        {"sample_name": "SP-2", "notes": {"nested": true}},
    ]));

    let err = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap_err();

    assert_matches!(err, SynthError::InvalidRows(_));
    assert!(catalog.state.lock().unwrap().samples.is_empty());
}

#[test]
fn blank_project_is_a_precondition_error() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let mut job = job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient);
    job.project = " ";

    let err = upload_all(&catalog, &mirror, &job, &rows(json!([{"sample_name": "A"}])))
        .unwrap_err();
    assert_matches!(err, SynthError::InvalidRequest(_));
}

#[test]
fn resubmitting_rows_creates_duplicates() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([{"sample_name": "SP-1"}]));
    let job = job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient);

    upload_all(&catalog, &mirror, &job, &data).unwrap();
    upload_all(&catalog, &mirror, &job, &data).unwrap();

    let samples = catalog.samples_named("SP-1");
    assert_eq!(samples.len(), 2);
    assert_ne!(samples[0].unique_id, samples[1].unique_id);
    assert_eq!(catalog.state.lock().unwrap().datasets.len(), 2);
    assert_eq!(mirror.appended().len(), 2);
}

#[test]
fn dataset_links_to_the_sample_created_for_its_row() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    // an older sample already carries the same name
    catalog.seed("SP-1", "P1");
    let data = rows(json!([{"sample_name": "SP-1", "notes": "second lot"}]));

    upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Strict),
        &data,
    )
    .unwrap();

    let state = catalog.state.lock().unwrap();
    let created = state
        .samples
        .iter()
        .find(|s| s.name == "SP-1" && s.unique_id.as_str().starts_with("smp-"))
        .unwrap();
    let dataset = &state.datasets[0];
    assert_eq!(
        state.dataset_links,
        vec![(dataset.id.clone(), created.unique_id.clone())]
    );
    assert_eq!(dataset.metadata["unique_id"], json!(created.unique_id.as_str()));
}

#[test]
fn dataset_carries_name_keywords_and_metadata() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([
        {"sample_name": "SS-1", "sample_description": "MAI 1M", "solvent": "DMF", "operator_note": "dry box"},
    ]));

    upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::StockSolution, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    let state = catalog.state.lock().unwrap();
    let recorded = &state.datasets[0];
    assert_eq!(
        recorded.dataset.dataset_name,
        "Stock Solution recipe for SS-1"
    );
    assert!(!recorded.dataset.public);
    assert_eq!(recorded.dataset.measurement, "Stock Solution synthesis");
    assert_eq!(recorded.dataset.session_name.as_deref(), Some("run-7"));
    assert_eq!(recorded.dataset.creation_time, NOW);
    assert_eq!(recorded.dataset.owner_orcid, owner.as_str());
    assert_eq!(recorded.keywords, vec!["Stock Solution", "SS-1", "run-7"]);
    assert_eq!(recorded.metadata["solvent"], json!("DMF"));
    assert_eq!(recorded.metadata["operator_note"], json!("dry box"));
    assert_eq!(recorded.metadata["timestamp"], json!(NOW));
    assert_eq!(recorded.metadata["project"], json!("P1"));
    assert_eq!(recorded.metadata["batch_id"], json!(""));
}

#[test]
fn batch_children_are_linked_and_recorded() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let batch = catalog.seed("B-2025-01", "P1");
    let data = rows(json!([{"sample_name": "SP-1"}, {"sample_name": "SP-2"}]));

    upload_all(
        &catalog,
        &mirror,
        &job(
            &owner,
            SynthesisType::SolidPrecursor,
            Some(&batch),
            MatchPolicy::Lenient,
        ),
        &data,
    )
    .unwrap();

    let state = catalog.state.lock().unwrap();
    assert_eq!(state.links.len(), 2);
    assert!(state.links.iter().all(|(parent, _)| parent == &batch));
    for recorded in &state.datasets {
        assert_eq!(recorded.metadata["batch_id"], json!(batch.as_str()));
    }
}

#[test]
fn failed_batch_link_fails_the_row() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let missing = SampleId::new("no-such-batch");

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(
            &owner,
            SynthesisType::SolidPrecursor,
            Some(&missing),
            MatchPolicy::Lenient,
        ),
        &rows(json!([{"sample_name": "SP-1"}])),
    )
    .unwrap();

    assert_eq!(summary.failed, 1);
    // the sample exists even though the row failed
    assert_eq!(catalog.samples_named("SP-1").len(), 1);
    assert!(catalog.state.lock().unwrap().datasets.is_empty());
}

#[test]
fn unique_parent_reference_is_linked() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let salt = catalog.seed("MAI-01", "P1");
    let data = rows(json!([{"sample_name": "SS-1", "Organic Salt SP-ID": "MAI-01"}]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::StockSolution, None, MatchPolicy::Strict),
        &data,
    )
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert!(summary.warnings.is_empty());
    let state = catalog.state.lock().unwrap();
    assert_eq!(state.links.len(), 1);
    assert_eq!(state.links[0].0, salt);
    assert_eq!(
        state.list_calls,
        vec![("MAI-01".to_string(), Some("P1".to_string()))]
    );
}

#[test]
fn ambiguous_parent_is_a_warning_under_lenient_policy() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    catalog.seed("MAI-01", "P1");
    catalog.seed("MAI-01", "P1");
    let data = rows(json!([{"sample_name": "SS-1", "organic_salt_sp-id": "MAI-01"}]));

    let (message, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::StockSolution, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    assert_eq!(message, "Successfully uploaded 1 samples to project 'P1'");
    assert_eq!(
        summary.warnings,
        vec!["Sample 'SS-1': organic_salt_sp-id: multiple parents named 'MAI-01' found (2)"]
    );
    let state = catalog.state.lock().unwrap();
    assert!(state.links.is_empty());
    assert_eq!(state.datasets.len(), 1);
}

#[test]
fn missing_parent_is_a_warning_under_lenient_policy() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([{"sample_name": "PS-1", "component_a_ss-id": "SS-404"}]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::PrecursorSolution, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        summary.warnings,
        vec!["Sample 'PS-1': component_a_ss-id: parent 'SS-404' not found"]
    );
}

#[test]
fn unresolved_parent_fails_the_row_under_strict_policy() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    catalog.seed("MAI-01", "P1");
    catalog.seed("MAI-01", "P1");
    let data = rows(json!([
        {"sample_name": "SS-1", "organic_salt_sp-id": "MAI-01"},
        {"sample_name": "SS-2"},
    ]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::StockSolution, None, MatchPolicy::Strict),
        &data,
    )
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].starts_with("Sample 'SS-1': parent link for organic_salt_sp-id"));
    assert!(summary.warnings.is_empty());
    assert_eq!(catalog.state.lock().unwrap().datasets.len(), 1);
}

#[test]
fn dataset_rejection_is_reported_per_row() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    catalog.reject_dataset_for("TF-1");
    let data = rows(json!([{"sample_name": "TF-1"}, {"sample_name": "TF-2"}]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::ThinFilm, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].contains("dataset rejected"));
    let appended = mirror.appended();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].0, "ThinFilms");
    assert_eq!(appended[0].1.len(), 36);
}

#[test]
fn summary_serializes_with_display_keys() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    catalog.reject_sample("SP-2");
    let data = rows(json!([{"sample_name": "SP-1"}, {"sample_name": "SP-2"}]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::SolidPrecursor, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["Project"], json!("P1"));
    assert_eq!(value["Synthesis Type"], json!("Solid Precursor"));
    assert_eq!(value["Samples Uploaded"], json!(1));
    assert_eq!(value["Failed"], json!(1));
    assert_eq!(value["Total Rows"], json!(2));
    assert_eq!(value["Errors"].as_array().map(Vec::len), Some(1));
    assert!(value.get("Warnings").is_none());
}

#[test]
fn stock_solution_links_both_salts() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let organic = catalog.seed("MAI-01", "P1");
    let metal = catalog.seed("PbI2-03", "P1");
    let data = rows(json!([{
        "sample_name": "SS-1",
        "Organic Salt SP-ID": "MAI-01",
        "Metal Salt SP-ID": "PbI2-03",
    }]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::StockSolution, None, MatchPolicy::Strict),
        &data,
    )
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert!(summary.warnings.is_empty());
    let state = catalog.state.lock().unwrap();
    let child = state
        .samples
        .iter()
        .find(|s| s.name == "SS-1")
        .map(|s| s.unique_id.clone())
        .unwrap();
    assert_eq!(
        state.links,
        vec![(organic, child.clone()), (metal, child)]
    );
}

#[test]
fn precursor_solution_links_both_components() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let component_a = catalog.seed("SS-1", "P1");
    let component_b = catalog.seed("SS-2", "P1");
    let data = rows(json!([{
        "sample_name": "PS-1",
        "component_a_ss-id": "SS-1",
        "component_b_ss-id": "SS-2",
    }]));

    let (_, summary) = upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::PrecursorSolution, None, MatchPolicy::Strict),
        &data,
    )
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    let state = catalog.state.lock().unwrap();
    let parents: Vec<SampleId> = state.links.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(parents, vec![component_a, component_b]);
    assert!(state.links.iter().all(|(_, child)| child.as_str().starts_with("smp-")));
    assert_eq!(state.datasets.len(), 1);
}

#[test]
fn thin_film_sheet_row_follows_the_layout() {
    let catalog = MockCatalog::default();
    let mirror = MockMirror::default();
    let owner = owner();
    let data = rows(json!([{
        "Sample Name": "TF-1",
        "Sample Description": "FAPbI3 on ITO",
        "Substrate": "ITO",
        "Substrate Cleaning Operator": "Grace",
        "PS ID": "PS-1",
        "Spin Atmosphere": "N2",
    }]));

    upload_all(
        &catalog,
        &mirror,
        &job(&owner, SynthesisType::ThinFilm, None, MatchPolicy::Lenient),
        &data,
    )
    .unwrap();

    let columns = SynthesisType::ThinFilm.sheet().columns;
    let column = |name: &str| columns.iter().position(|c| *c == name).unwrap();
    let appended = mirror.appended();
    let (sheet, values) = &appended[0];
    assert_eq!(sheet, "ThinFilms");
    assert_eq!(values.len(), 36);
    assert_eq!(column("DepositionOperatorName"), 6);
    assert_eq!(column("SampleDescription"), 9);
    assert_eq!(values[column("ThinFilmID")], "TF-1");
    assert_eq!(values[column("SubstrateCleaningOperator")], "Grace");
    assert_eq!(values[column("Substrate")], "ITO");
    assert_eq!(values[column("DepositionOperatorName")], "Ada");
    assert_eq!(values[column("SampleDescription")], "FAPbI3 on ITO");
    assert_eq!(values[column("PS_ID")], "PS-1");
    assert_eq!(values[column("SpinAtmosphere")], "N2");
    assert!(values[column("SpinHumidity")..].iter().all(String::is_empty));
}
