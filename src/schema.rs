//! Per-type field schemas and spreadsheet tab layouts.

use crate::domain::SynthesisType;

/// A section title spanning a run of columns in the first header row.
/// Columns are 1-based and inclusive; `end: None` spans to the last column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub title: &'static str,
    pub start: usize,
    pub end: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub sheet_name: &'static str,
    pub sections: &'static [SectionHeader],
    pub columns: &'static [&'static str],
}

impl SheetLayout {
    /// First header row: blank leading cells, then each section title at its start column.
    pub fn section_row(&self) -> Vec<String> {
        let mut row = Vec::new();
        for section in self.sections {
            while row.len() + 1 < section.start {
                row.push(String::new());
            }
            row.push(section.title.to_string());
        }
        row
    }

    pub fn column_row(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.to_string()).collect()
    }

    /// Inclusive 1-based column ranges to merge in the first header row.
    pub fn merge_ranges(&self) -> Vec<(usize, usize)> {
        self.sections
            .iter()
            .map(|section| (section.start, section.end.unwrap_or(self.columns.len())))
            .collect()
    }
}

const SOLID_PRECURSOR_FIELDS: &[&str] = &[
    "Sample Name",
    "Sample Description",
    "Notes",
    "CAS",
    "RFID",
    "Name",
    "Abbrev",
    "Vendor",
    "Opened Timestamp",
    "Storage Location",
];

const STOCK_SOLUTION_FIELDS: &[&str] = &[
    "Sample Name",
    "Sample Description",
    "Notes",
    "Organic Salt SP-ID",
    "Organic Salt Name",
    "Organic Cation Actual Weight mg",
    "Metal Salt SP-ID",
    "Metal Salt Name",
    "Metal Cation Actual Weight mg",
    "Solvent",
    "Solvent Volume ml",
    "Target Concentration mol",
    "Storage Location",
];

const PRECURSOR_SOLUTION_FIELDS: &[&str] = &[
    "Sample Name",
    "Sample Description",
    "Notes",
    "Target Stoichiometry",
    "Component A SS-ID",
    "Component B SS-ID",
    "Mixing Ratio",
    "Target Concentration (M)",
    "Storage Location",
    "PS Autobot Recipe Filename",
];

const THIN_FILM_FIELDS: &[&str] = &[
    "Sample Name",
    "Sample Description",
    "Substrate Cleaning Operator",
    "Substrate",
    "Scribed",
    "Substrate Cleaning",
    "Substrate Cleaning Timestamp",
    "Substrate Prep",
    "Substrate Prep Timestamp",
    "PS ID",
    "Spin Atmosphere",
    "Annealing Atmosphere",
];

const SOLID_PRECURSOR_SHEET: SheetLayout = SheetLayout {
    sheet_name: "SolidPrecursors",
    sections: &[SectionHeader {
        title: "Solid Precursor Synthesis Dataset",
        start: 3,
        end: None,
    }],
    columns: &[
        "SolidPrecursorID",
        "OperatorName",
        "TimeStamp",
        "Notes",
        "CAS",
        "RFID",
        "Name",
        "Abbrev",
        "Vendor",
        "OpenedTimestamp",
        "StorageLocation",
        "NMR_ID",
        "PhotoID",
    ],
};

const STOCK_SOLUTION_SHEET: SheetLayout = SheetLayout {
    sheet_name: "StockSolutions",
    sections: &[SectionHeader {
        title: "Stock Solution Synthesis Dataset",
        start: 3,
        end: None,
    }],
    columns: &[
        "StockSolutionID",
        "OperatorName",
        "TimeStamp",
        "Notes",
        "OrganicSalt_SP-ID",
        "OrganicSalt_Name",
        "OrganicCation_ActualWeight_mg",
        "MetalSalt_SP-ID",
        "MetalSalt_Name",
        "MetalCation_ActualWeight_mg",
        "Solvent",
        "SolventVolume_ml",
        "TargetConcentration_mol",
        "StorageLocation",
        "Photo_ID",
    ],
};

const PRECURSOR_SOLUTION_SHEET: SheetLayout = SheetLayout {
    sheet_name: "PrecursorSolutions",
    sections: &[SectionHeader {
        title: "Precursor Solution Synthesis Dataset",
        start: 3,
        end: None,
    }],
    columns: &[
        "PrecursorSolutionID",
        "OperatorName",
        "TimeStamp",
        "Notes",
        "TargetStoichiometry",
        "ComponentA_SS-ID",
        "ComponentB_SS-ID",
        "MixingRatio",
        "TargetConcentration (M)",
        "StorageLocation",
        "PSAutobotRecipeFilename",
        "Photo_ID",
    ],
};

const THIN_FILM_SHEET: SheetLayout = SheetLayout {
    sheet_name: "ThinFilms",
    sections: &[
        SectionHeader {
            title: "Substrate Dataset",
            start: 3,
            end: Some(7),
        },
        SectionHeader {
            title: "Thin Film Deposition Dataset",
            start: 8,
            end: None,
        },
    ],
    columns: &[
        "ThinFilmID",
        "SubstrateCleaningOperator",
        "Substrate",
        "Scribed",
        "SubstrateCleaning",
        "SubstrateCleaning_Timestamp",
        "DepositionOperatorName",
        "SubstratePrep",
        "SubstratePrepTimestamp",
        "SampleDescription",
        "BatchID",
        "BatchUUID",
        "PS_ID",
        "SpinAtmosphere",
        "AnnealingAtmosphere",
        "SpinHumidity",
        "AnnealingHumidity",
        "SolutionVolume",
        "SpinSpeed",
        "SpinAcceleration",
        "SpinDuration",
        "AnnealingTemp",
        "AnnealingDuration",
        "DepositionRecipe",
        "DepositionLogfile",
        "HumidityLog",
        "Photo_File",
        "Photo_ID",
        "XRD_File",
        "XRD_ID",
        "UV-Vis_File",
        "UV-Vis_ID",
        "GIWAXS_ID",
        "GIWAXS_TFChildID",
        "RGA_ID",
        "RGA_TFChildID",
    ],
};

impl SynthesisType {
    /// Display names of the fields a row of this type carries, in form order.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            SynthesisType::SolidPrecursor => SOLID_PRECURSOR_FIELDS,
            SynthesisType::StockSolution => STOCK_SOLUTION_FIELDS,
            SynthesisType::PrecursorSolution => PRECURSOR_SOLUTION_FIELDS,
            SynthesisType::ThinFilm => THIN_FILM_FIELDS,
        }
    }

    pub fn sheet(&self) -> &'static SheetLayout {
        match self {
            SynthesisType::SolidPrecursor => &SOLID_PRECURSOR_SHEET,
            SynthesisType::StockSolution => &STOCK_SOLUTION_SHEET,
            SynthesisType::PrecursorSolution => &PRECURSOR_SOLUTION_SHEET,
            SynthesisType::ThinFilm => &THIN_FILM_SHEET,
        }
    }

    /// Canonical keys of fields that name a parent sample of the row.
    pub fn parent_fields(&self) -> &'static [&'static str] {
        match self {
            SynthesisType::StockSolution => &["organic_salt_sp-id", "metal_salt_sp-id"],
            SynthesisType::PrecursorSolution => &["component_a_ss-id", "component_b_ss-id"],
            SynthesisType::SolidPrecursor | SynthesisType::ThinFilm => &[],
        }
    }
}

/// Canonical field key: lowercase with spaces replaced by underscores.
pub fn canonical_key(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
