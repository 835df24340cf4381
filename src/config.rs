use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::domain::MatchPolicy;
use crate::error::SynthError;
use crate::sheets::DEFAULT_SHEETS_URL;

pub const CONFIG_FILE: &str = "synth-upload.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub sheets: Option<SheetsEntry>,
    #[serde(default)]
    pub match_policy: Option<MatchPolicy>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SheetsEntry {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsSettings {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub catalog_url: String,
    pub api_key: Option<String>,
    pub sheets_url: String,
    pub spreadsheet_id: Option<String>,
    pub sheets_token: Option<String>,
    pub match_policy: MatchPolicy,
}

impl ResolvedConfig {
    pub fn api_key(&self) -> Result<&str, SynthError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SynthError::MissingSetting("ADMIN_APIKEY".to_string()))
    }

    pub fn sheets(&self) -> Result<SheetsSettings, SynthError> {
        let spreadsheet_id = self
            .spreadsheet_id
            .clone()
            .ok_or_else(|| SynthError::MissingSetting("GOOGLE_SHEETS_ID".to_string()))?;
        let access_token = self
            .sheets_token
            .clone()
            .ok_or_else(|| SynthError::MissingSetting("GOOGLE_SHEETS_TOKEN".to_string()))?;
        Ok(SheetsSettings {
            base_url: self.sheets_url.clone(),
            spreadsheet_id,
            access_token,
        })
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the config file and applies environment overrides.
    ///
    /// Without an explicit path, `synth-upload.json` is looked up in the current
    /// directory and then in the user config directory; when neither exists the
    /// environment alone supplies the settings.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SynthError> {
        let config = match Self::locate(path) {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| SynthError::ConfigRead(config_path.clone().into()))?;
                serde_json::from_str(&content)
                    .map_err(|err| SynthError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        Self::resolve_config(config)
    }

    fn locate(path: Option<&str>) -> Option<Utf8PathBuf> {
        if let Some(path) = path {
            return Some(Utf8PathBuf::from(path));
        }
        let local = Utf8PathBuf::from(CONFIG_FILE);
        if local.as_std_path().exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "synth-upload")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .filter(|path: &PathBuf| path.exists())
            .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SynthError> {
        Self::resolve_config_with(config, |key| std::env::var(key).ok())
    }

    /// Environment values win over file values; blank values count as unset.
    ///
    /// A `SYNTH_MATCH_POLICY` that is set but names no policy is an error.
    pub fn resolve_config_with<F>(config: Config, lookup: F) -> Result<ResolvedConfig, SynthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let sheets = config.sheets.unwrap_or_default();
        let match_policy = match env("SYNTH_MATCH_POLICY") {
            Some(value) => parse_match_policy(&value)?,
            None => config.match_policy.unwrap_or_default(),
        };

        Ok(ResolvedConfig {
            catalog_url: env("CRUCIBLE_URL")
                .or(config.catalog_url)
                .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
            api_key: env("ADMIN_APIKEY").or(config.api_key),
            sheets_url: env("GOOGLE_SHEETS_URL")
                .or(sheets.base_url)
                .unwrap_or_else(|| DEFAULT_SHEETS_URL.to_string()),
            spreadsheet_id: env("GOOGLE_SHEETS_ID").or(sheets.spreadsheet_id),
            sheets_token: env("GOOGLE_SHEETS_TOKEN").or(sheets.access_token),
            match_policy,
        })
    }
}

fn parse_match_policy(value: &str) -> Result<MatchPolicy, SynthError> {
    match value.trim().to_lowercase().as_str() {
        "lenient" => Ok(MatchPolicy::Lenient),
        "strict" => Ok(MatchPolicy::Strict),
        _ => Err(SynthError::ConfigParse(format!(
            "SYNTH_MATCH_POLICY must be 'lenient' or 'strict', got '{value}'"
        ))),
    }
}
