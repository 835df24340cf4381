//! Row normalisation and the typed per-type synthesis records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{SampleId, SynthesisType};
use crate::error::SynthError;
use crate::schema::canonical_key;

/// A single scalar cell as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Text(value) => f.write_str(value),
        }
    }
}

/// Row after normalisation: canonical keys, absent cells removed.
pub type RawRow = Map<String, Value>;

/// Canonicalises field names, drops blank cells and removes rows left with no cells.
///
/// Non-scalar cells are rejected before any row is processed.
pub fn normalize_rows(rows: &[Map<String, Value>]) -> Result<Vec<RawRow>, SynthError> {
    let mut normalized = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let mut out = Map::new();
        for (name, value) in row {
            let key = canonical_key(name);
            let cell = match value {
                Value::Null => None,
                Value::String(text) if text.trim().is_empty() => None,
                Value::String(_) | Value::Number(_) | Value::Bool(_) => Some(value.clone()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(SynthError::InvalidRows(format!(
                        "row {}: field '{name}' is not a scalar value",
                        index + 1
                    )));
                }
            };
            // headers that canonicalise alike keep the first non-blank cell
            if let Some(value) = cell {
                out.entry(key).or_insert(value);
            }
        }
        if !out.is_empty() {
            normalized.push(out);
        }
    }
    Ok(normalized)
}

macro_rules! synthesis_row {
    ($(#[$meta:meta])* $name:ident { $($field:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                #[serde(rename = $key, default)]
                pub $field: Option<Cell>,
            )+
            #[serde(flatten)]
            pub extra: BTreeMap<String, Cell>,
        }

        impl $name {
            pub const KEYS: &'static [&'static str] = &[$($key),+];

            pub fn get(&self, key: &str) -> Option<&Cell> {
                match key {
                    $($key => self.$field.as_ref(),)+
                    other => self.extra.get(other),
                }
            }
        }
    };
}

synthesis_row!(
    SolidPrecursorRow {
        sample_name => "sample_name",
        sample_description => "sample_description",
        notes => "notes",
        cas => "cas",
        rfid => "rfid",
        name => "name",
        abbrev => "abbrev",
        vendor => "vendor",
        opened_timestamp => "opened_timestamp",
        storage_location => "storage_location",
    }
);

synthesis_row!(
    StockSolutionRow {
        sample_name => "sample_name",
        sample_description => "sample_description",
        notes => "notes",
        organic_salt_sp_id => "organic_salt_sp-id",
        organic_salt_name => "organic_salt_name",
        organic_cation_actual_weight_mg => "organic_cation_actual_weight_mg",
        metal_salt_sp_id => "metal_salt_sp-id",
        metal_salt_name => "metal_salt_name",
        metal_cation_actual_weight_mg => "metal_cation_actual_weight_mg",
        solvent => "solvent",
        solvent_volume_ml => "solvent_volume_ml",
        target_concentration_mol => "target_concentration_mol",
        storage_location => "storage_location",
    }
);

synthesis_row!(
    PrecursorSolutionRow {
        sample_name => "sample_name",
        sample_description => "sample_description",
        notes => "notes",
        target_stoichiometry => "target_stoichiometry",
        component_a_ss_id => "component_a_ss-id",
        component_b_ss_id => "component_b_ss-id",
        mixing_ratio => "mixing_ratio",
        target_concentration_m => "target_concentration_(m)",
        storage_location => "storage_location",
        ps_autobot_recipe_filename => "ps_autobot_recipe_filename",
    }
);

synthesis_row!(
    ThinFilmRow {
        sample_name => "sample_name",
        sample_description => "sample_description",
        substrate_cleaning_operator => "substrate_cleaning_operator",
        substrate => "substrate",
        scribed => "scribed",
        substrate_cleaning => "substrate_cleaning",
        substrate_cleaning_timestamp => "substrate_cleaning_timestamp",
        substrate_prep => "substrate_prep",
        substrate_prep_timestamp => "substrate_prep_timestamp",
        ps_id => "ps_id",
        spin_atmosphere => "spin_atmosphere",
        annealing_atmosphere => "annealing_atmosphere",
    }
);

/// Sample fields merged into a dataset's scientific metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SampleInfo {
    pub unique_id: SampleId,
    pub timestamp: String,
    pub description: Option<String>,
    pub project: String,
    pub batch_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisRecord {
    SolidPrecursor(SolidPrecursorRow),
    StockSolution(StockSolutionRow),
    PrecursorSolution(PrecursorSolutionRow),
    ThinFilm(ThinFilmRow),
}

impl SynthesisRecord {
    pub fn from_row(kind: SynthesisType, row: RawRow) -> Result<Self, SynthError> {
        let value = Value::Object(row);
        let parse_err = |err: serde_json::Error| SynthError::InvalidRows(err.to_string());
        Ok(match kind {
            SynthesisType::SolidPrecursor => {
                SynthesisRecord::SolidPrecursor(serde_json::from_value(value).map_err(parse_err)?)
            }
            SynthesisType::StockSolution => {
                SynthesisRecord::StockSolution(serde_json::from_value(value).map_err(parse_err)?)
            }
            SynthesisType::PrecursorSolution => SynthesisRecord::PrecursorSolution(
                serde_json::from_value(value).map_err(parse_err)?,
            ),
            SynthesisType::ThinFilm => {
                SynthesisRecord::ThinFilm(serde_json::from_value(value).map_err(parse_err)?)
            }
        })
    }

    pub fn synthesis_type(&self) -> SynthesisType {
        match self {
            SynthesisRecord::SolidPrecursor(_) => SynthesisType::SolidPrecursor,
            SynthesisRecord::StockSolution(_) => SynthesisType::StockSolution,
            SynthesisRecord::PrecursorSolution(_) => SynthesisType::PrecursorSolution,
            SynthesisRecord::ThinFilm(_) => SynthesisType::ThinFilm,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Cell> {
        match self {
            SynthesisRecord::SolidPrecursor(row) => row.get(key),
            SynthesisRecord::StockSolution(row) => row.get(key),
            SynthesisRecord::PrecursorSolution(row) => row.get(key),
            SynthesisRecord::ThinFilm(row) => row.get(key),
        }
    }

    pub fn sample_name(&self) -> Option<String> {
        self.get("sample_name").map(|cell| cell.to_string())
    }

    pub fn sample_description(&self) -> Option<String> {
        self.get("sample_description").map(|cell| cell.to_string())
    }

    /// Row as JSON object with the assigned sample info merged in.
    pub fn metadata(&self, sample: &SampleInfo) -> Result<Value, SynthError> {
        let to_value = |value: Result<Value, serde_json::Error>| {
            value.map_err(|err| SynthError::InvalidRows(err.to_string()))
        };
        let mut value = match self {
            SynthesisRecord::SolidPrecursor(row) => to_value(serde_json::to_value(row))?,
            SynthesisRecord::StockSolution(row) => to_value(serde_json::to_value(row))?,
            SynthesisRecord::PrecursorSolution(row) => to_value(serde_json::to_value(row))?,
            SynthesisRecord::ThinFilm(row) => to_value(serde_json::to_value(row))?,
        };
        if let (Value::Object(map), Value::Object(info)) =
            (&mut value, to_value(serde_json::to_value(sample))?)
        {
            map.extend(info);
        }
        Ok(value)
    }

    /// Values for one spreadsheet row, ordered as the type's sheet columns.
    pub fn sheet_row(&self, operator: &str, timestamp: &str) -> Vec<String> {
        let operator = operator.to_string();
        let timestamp = timestamp.to_string();
        let blank = String::new;
        match self {
            SynthesisRecord::SolidPrecursor(row) => vec![
                text(&row.sample_name),
                operator,
                timestamp,
                text(&row.notes),
                text(&row.cas),
                text(&row.rfid),
                text(&row.name),
                text(&row.abbrev),
                text(&row.vendor),
                text(&row.opened_timestamp),
                text(&row.storage_location),
                blank(),
                blank(),
            ],
            SynthesisRecord::StockSolution(row) => vec![
                text(&row.sample_name),
                operator,
                timestamp,
                text(&row.notes),
                text(&row.organic_salt_sp_id),
                text(&row.organic_salt_name),
                text(&row.organic_cation_actual_weight_mg),
                text(&row.metal_salt_sp_id),
                text(&row.metal_salt_name),
                text(&row.metal_cation_actual_weight_mg),
                text(&row.solvent),
                text(&row.solvent_volume_ml),
                text(&row.target_concentration_mol),
                text(&row.storage_location),
                blank(),
            ],
            SynthesisRecord::PrecursorSolution(row) => vec![
                text(&row.sample_name),
                operator,
                timestamp,
                text(&row.notes),
                text(&row.target_stoichiometry),
                text(&row.component_a_ss_id),
                text(&row.component_b_ss_id),
                text(&row.mixing_ratio),
                text(&row.target_concentration_m),
                text(&row.storage_location),
                text(&row.ps_autobot_recipe_filename),
                blank(),
            ],
            SynthesisRecord::ThinFilm(row) => {
                let mut values = vec![
                    text(&row.sample_name),
                    text(&row.substrate_cleaning_operator),
                    text(&row.substrate),
                    text(&row.scribed),
                    text(&row.substrate_cleaning),
                    text(&row.substrate_cleaning_timestamp),
                    operator,
                    text(&row.substrate_prep),
                    text(&row.substrate_prep_timestamp),
                    text(&row.sample_description),
                    blank(),
                    blank(),
                    text(&row.ps_id),
                    text(&row.spin_atmosphere),
                    text(&row.annealing_atmosphere),
                ];
                // deposition and characterisation columns are filled in by hand
                values.resize(SynthesisType::ThinFilm.sheet().columns.len(), blank());
                values
            }
        }
    }
}

fn text(cell: &Option<Cell>) -> String {
    cell.as_ref().map(|c| c.to_string()).unwrap_or_default()
}
