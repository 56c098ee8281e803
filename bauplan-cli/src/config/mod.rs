//! Filter rules and defaults
//!
//! The keyword lists driving the lean-export filter are business rules,
//! not code, so they live in a TOML file the planning team can edit
//! without touching the tool. Every field has a default matching the
//! current project conventions; the tool runs with no config present.
//!
//! Lookup order: `--config <path>` if given, otherwise
//! `<config dir>/bauplan/config.toml` if it exists, otherwise built-in
//! defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Column label for the extracted area code. The line breaks are part
/// of the label: downstream spreadsheets use a wrapped three-line
/// header cell.
pub const CODE_COLUMN: &str = "Bauweise\nBereichs-\nerkennung";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub lean: LeanRules,
    pub crossings: CrossingRules,
}

/// Stage 1 rules: lean-export filtering
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeanRules {
    /// Calendar year the report covers
    pub target_year: i32,
    /// Default upper bound for KW Start (inclusive)
    pub week_cutoff: u32,
    /// Optional default lower bound for KW Start (inclusive)
    pub week_floor: Option<u32>,
    /// Trade categories that qualify a row, matched case-insensitively
    pub trade_keywords: Vec<String>,
    /// Process-name terms at least one of which must be present
    pub include_terms: Vec<String>,
    /// Process-name terms none of which may be present
    pub exclude_terms: Vec<String>,
    pub date_column: String,
    pub week_start_column: String,
    pub process_column: String,
    pub trade_column: String,
    /// Derived column tagging each row with its source file
    pub source_column: String,
    /// Derived column holding the extracted area code
    pub code_column: String,
    /// Output schema, in export order
    pub columns: Vec<String>,
}

impl Default for LeanRules {
    fn default() -> Self {
        Self {
            target_year: 2025,
            week_cutoff: 27,
            week_floor: None,
            trade_keywords: vec![
                "HDD".into(),
                "OBW".into(),
                "offene Bauweise".into(),
                "Kurzvortrieb".into(),
                "Mikrotunnel".into(),
                "MT".into(),
            ],
            include_terms: vec!["Fertigstellung".into(), "OBW".into(), "HDD".into()],
            exclude_terms: vec![
                "Vorarbeit".into(),
                "Zuwegung".into(),
                "PE-Rohre Schweißen".into(),
                "PE-Schweißen".into(),
                "Anbindung".into(),
                "Oberboden auftragen".into(),
                "Oberbodenauftrag".into(),
                "obw baustraße".into(),
                "Deichkreuzung".into(),
                "Baustelleneinrichtung".into(),
                "Teil".into(),
            ],
            date_column: "Startdatum".into(),
            week_start_column: "KW Start".into(),
            process_column: "Prozessname".into(),
            trade_column: "Gewerk".into(),
            source_column: "NDS/NRW".into(),
            code_column: CODE_COLUMN.into(),
            columns: vec![
                "Id".into(),
                "Prozessname".into(),
                "Startdatum".into(),
                "Enddatum".into(),
                "Status".into(),
                "Dauer".into(),
                "Gewerk".into(),
                "KW Start".into(),
                "KW Ende".into(),
                "NDS/NRW".into(),
                CODE_COLUMN.into(),
            ],
        }
    }
}

/// Stage 2 rules: crossing-partner filtering
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrossingRules {
    /// Default worksheet holding the crossing register
    pub sheet: String,
    /// Default clearance-status column
    pub clearance_column: String,
    /// Text that qualifies a clearance cell, matched case-insensitively
    pub match_term: String,
    /// Fill value for columns absent from the register
    pub sentinel: String,
    /// Sheet rows occupied by headers; struck sheet row N maps to data
    /// row N minus this offset. Registers with multi-row headers need a
    /// larger offset.
    pub header_row_offset: u32,
    pub id_column: String,
    pub partner_column: String,
    pub code_column: String,
    pub object_column: String,
    /// Name of the distinct-code count in the partner summary
    pub summary_column: String,
    /// Output schema, in export order
    pub columns: Vec<String>,
}

impl Default for CrossingRules {
    fn default() -> Self {
        Self {
            sheet: "Kreuzungen".into(),
            clearance_column: "Kreuzung hergestellt".into(),
            match_term: "nein".into(),
            sentinel: "N/A".into(),
            header_row_offset: 2,
            id_column: "ID".into(),
            partner_column: "Kreuzungspartner".into(),
            code_column: CODE_COLUMN.into(),
            object_column: "Kreuzungsobjekt".into(),
            summary_column: "Anzahl Bereiche".into(),
            columns: vec![
                "ID".into(),
                "PFA".into(),
                "Kreuzungspartner".into(),
                CODE_COLUMN.into(),
                "Kreuzungsobjekt".into(),
                "Kreuzung hergestellt".into(),
            ],
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file does not exist: {}", path.display());
                }
                Self::from_file(path)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bauplan").join("config.toml"))
    }
}
