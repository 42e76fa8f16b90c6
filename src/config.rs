//! Dashboard settings.
//!
//! Values resolve in three layers: command-line flags, then an optional YAML
//! file passed with `--config`, then built-in defaults.
//!
//! ```yaml
//! key_column: product_id
//! value_column: value
//! preview_rows: 5
//! suffixes: ["_x", "_y"]
//! delimiter: ","
//! encoding: utf-8
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use serde::Deserialize;

use crate::{
    cli::{SettingsArgs, parse_delimiter},
    ingest::IngestOptions,
    io_utils,
    merge::{DEFAULT_KEY_COLUMN, DEFAULT_SUFFIXES, MergeOptions},
    summary::DEFAULT_VALUE_COLUMN,
};

pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Contents of a YAML config file. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub key_column: Option<String>,
    pub value_column: Option<String>,
    pub preview_rows: Option<usize>,
    pub suffixes: Option<(String, String)>,
    pub delimiter: Option<String>,
    pub encoding: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("Reading config file {path:?}"))?;
        Self::parse(&text).with_context(|| format!("Parsing config file {path:?}"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|err| anyhow!("{err}"))
    }
}

/// Fully resolved settings used by the dashboard.
#[derive(Debug, Clone)]
pub struct Settings {
    pub merge: MergeOptions,
    pub value_column: String,
    pub preview_rows: usize,
    /// Explicit delimiter; `None` picks one from each upload's extension.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            merge: MergeOptions::default(),
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            delimiter: None,
            encoding: encoding_rs::UTF_8,
        }
    }
}

impl Settings {
    pub fn resolve(args: &SettingsArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::layered(args, file)
    }

    fn layered(args: &SettingsArgs, file: ConfigFile) -> Result<Self> {
        let key = args
            .key
            .clone()
            .or(file.key_column)
            .unwrap_or_else(|| DEFAULT_KEY_COLUMN.to_string());
        if key.trim().is_empty() {
            return Err(anyhow!("Key column name cannot be empty"));
        }
        let suffixes = match (&args.suffixes, file.suffixes) {
            (Some(list), _) => parse_suffixes(list)?,
            (None, Some(pair)) => pair,
            (None, None) => (DEFAULT_SUFFIXES.0.to_string(), DEFAULT_SUFFIXES.1.to_string()),
        };
        if suffixes.0 == suffixes.1 {
            return Err(anyhow!(
                "Merge suffixes must differ (got '{}' twice)",
                suffixes.0
            ));
        }
        let delimiter = match (args.delimiter, file.delimiter) {
            (Some(d), _) => Some(d),
            (None, Some(text)) => Some(
                parse_delimiter(&text)
                    .map_err(|err| anyhow!("Invalid delimiter '{text}' in config: {err}"))?,
            ),
            (None, None) => None,
        };
        let encoding_label = args.input_encoding.clone().or(file.encoding);
        Ok(Self {
            merge: MergeOptions { key, suffixes },
            value_column: args
                .value_column
                .clone()
                .or(file.value_column)
                .unwrap_or_else(|| DEFAULT_VALUE_COLUMN.to_string()),
            preview_rows: args
                .preview_rows
                .or(file.preview_rows)
                .unwrap_or(DEFAULT_PREVIEW_ROWS),
            delimiter,
            encoding: io_utils::resolve_encoding(encoding_label.as_deref())?,
        })
    }

    /// Parser options for an upload, choosing a delimiter from its name when
    /// none is configured.
    pub fn ingest_options(&self, upload_name: &Path) -> IngestOptions {
        IngestOptions {
            delimiter: io_utils::resolve_input_delimiter(upload_name, self.delimiter),
            encoding: self.encoding,
        }
    }
}

fn parse_suffixes(value: &str) -> Result<(String, String)> {
    match value.split_once(',') {
        Some((first, second)) => Ok((first.trim().to_string(), second.trim().to_string())),
        None => Err(anyhow!(
            "Suffixes must be two comma-separated values such as '_x,_y'"
        )),
    }
}
