//! Configuration handling for the expense bot.
//!
//! Configuration comes from two places. An optional file at `$EXPENSE_BOT_HOME/config.json`
//! (written by `expense-bot init`) and command line flags, each of which can also be provided as an
//! environment variable. Flags and environment variables win over the file.

use crate::args::ConfigArgs;
use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "expense-bot";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "mistral";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// The `Config` object holds everything the clients need to reach the spreadsheet web app and the
/// inference server. It is created once in `main` and handed to each client constructor.
#[derive(Debug, Clone)]
pub struct Config {
    config_path: PathBuf,
    webapp_url: Url,
    spreadsheet_id: Option<String>,
    ollama_url: Url,
    model: String,
    request_timeout: Duration,
    inference_timeout: Option<Duration>,
    temperature: Option<f32>,
}

impl Config {
    /// Creates the home directory and writes an initial `config.json` from `args`.
    ///
    /// # Errors
    /// - Returns an error if the web app URL is missing or invalid.
    /// - Returns an error if any file operations fail.
    pub async fn create(home: impl Into<PathBuf>, args: &ConfigArgs) -> Result<Self> {
        let maybe_relative = home.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the expense-bot home directory")
            .pub_result(ErrorType::Config)?;
        let root = utils::canonicalize(&maybe_relative)
            .await
            .pub_result(ErrorType::Config)?;

        let mut file = ConfigFile::default();
        file.apply(args);
        let config = Self::from_parts(root, file.clone()).pub_result(ErrorType::Config)?;
        file.save(&config.config_path)
            .await
            .pub_result(ErrorType::Config)?;
        Ok(config)
    }

    /// Loads `config.json` from `home` if it exists, then applies `args` on top of it.
    ///
    /// # Errors
    /// - Returns an error if the file exists but cannot be read or has the wrong `app_name`.
    /// - Returns an error if no web app URL is configured anywhere, or a URL is invalid.
    pub async fn load(home: impl Into<PathBuf>, args: &ConfigArgs) -> Result<Self> {
        let root = home.into();
        let config_path = root.join(CONFIG_JSON);
        let mut file = if config_path.is_file() {
            ConfigFile::load(&config_path)
                .await
                .pub_result(ErrorType::Config)?
        } else {
            ConfigFile::default()
        };
        file.apply(args);
        Self::from_parts(root, file).pub_result(ErrorType::Config)
    }

    /// Validates `file` and turns it into a `Config`.
    pub(crate) fn from_parts(root: PathBuf, file: ConfigFile) -> Res<Self> {
        let webapp_url = match file.webapp_url.as_deref() {
            Some(s) if !s.trim().is_empty() => parse_url(s, "web app")?,
            _ => bail!(
                "No web app URL is configured. Provide --webapp-url, set WEBAPP_URL, or run \
                'expense-bot init'"
            ),
        };
        let ollama_url = parse_url(
            file.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL),
            "Ollama",
        )?;
        let spreadsheet_id = match file.spreadsheet_id.as_deref() {
            Some(s) if !s.trim().is_empty() => Some(extract_spreadsheet_id(s.trim())?.to_string()),
            _ => None,
        };
        Ok(Self {
            config_path: root.join(CONFIG_JSON),
            webapp_url,
            spreadsheet_id,
            ollama_url,
            model: file.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            inference_timeout: file.inference_timeout_secs.map(Duration::from_secs),
            temperature: file.temperature,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn webapp_url(&self) -> &Url {
        &self.webapp_url
    }

    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.spreadsheet_id.as_deref()
    }

    /// The browser link to the spreadsheet, when the spreadsheet ID is known.
    pub fn sheet_url(&self) -> Option<String> {
        self.spreadsheet_id
            .as_ref()
            .map(|id| format!("https://docs.google.com/spreadsheets/d/{id}/edit"))
    }

    pub fn ollama_url(&self) -> &Url {
        &self.ollama_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "expense-bot",
///   "config_version": 1,
///   "webapp_url": "https://script.google.com/macros/s/AKfycbz.../exec",
///   "spreadsheet_id": "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "ollama_url": "http://localhost:11434",
///   "model": "mistral"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct ConfigFile {
    /// Application name, should always be "expense-bot"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// URL of the deployed Apps Script web app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    webapp_url: Option<String>,

    /// The spreadsheet ID, or its full URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spreadsheet_id: Option<String>,

    /// Base URL of the Ollama server. Defaults to http://localhost:11434
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ollama_url: Option<String>,

    /// Model name used for analysis. Defaults to mistral
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,

    /// Timeout for web app requests, in seconds. Defaults to 30
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,

    /// Timeout for a single generation request, in seconds. No timeout when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inference_timeout_secs: Option<u64>,

    /// Sampling temperature passed to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            webapp_url: None,
            spreadsheet_id: None,
            ollama_url: None,
            model: None,
            request_timeout_secs: None,
            inference_timeout_secs: None,
            temperature: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or has the wrong `app_name`.
    pub(crate) async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub(crate) async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }

    /// Overwrites fields with any values given on the command line or in the environment.
    pub(crate) fn apply(&mut self, args: &ConfigArgs) {
        fn set<T: Clone>(target: &mut Option<T>, value: Option<&T>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }
        set(&mut self.webapp_url, args.webapp_url());
        set(&mut self.spreadsheet_id, args.spreadsheet_id());
        set(&mut self.ollama_url, args.ollama_url());
        set(&mut self.model, args.model());
        set(&mut self.request_timeout_secs, args.request_timeout_secs());
        set(&mut self.inference_timeout_secs, args.inference_timeout_secs());
        set(&mut self.temperature, args.temperature());
    }

    #[cfg(test)]
    /// Creates a ConfigFile pointing at the given endpoints.
    pub(crate) fn new(webapp_url: impl Into<String>, ollama_url: impl Into<String>) -> Self {
        Self {
            webapp_url: Some(webapp_url.into()),
            ollama_url: Some(ollama_url.into()),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub(crate) fn with_spreadsheet_id(mut self, id: impl Into<String>) -> Self {
        self.spreadsheet_id = Some(id.into());
        self
    }
}

fn parse_url(s: &str, what: &str) -> Res<Url> {
    let url = Url::parse(s.trim()).with_context(|| format!("Invalid {what} URL '{s}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("The {what} URL must use http or https, got '{s}'");
    }
    Ok(url)
}

/// Accepts either a bare spreadsheet ID or a Google Sheets URL and returns the ID.
///
/// URL format: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...
/// or: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID?foo=bar
fn extract_spreadsheet_id(value: &str) -> Res<&str> {
    if !value.contains('/') {
        return Ok(value);
    }

    let parts: Vec<&str> = value.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            let id_part = parts[i + 1];
            let id = id_part
                .split(['?', '#'])
                .next()
                .unwrap_or(id_part);
            return Ok(id);
        }
    }
    Err(anyhow::anyhow!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    ))
}
