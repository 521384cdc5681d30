//! Database records read from the access file at startup.
//!
//! The document is a sequence of records, JSON by default or YAML when the
//! file ends in `.yml`/`.yaml`. Any parse or validation error is fatal for the
//! whole run.

use crate::backup::function_path;
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use crate::backup::validate::validate_valid_db_name;

use bon::Builder;
use derive_more::{Deref, Display, From};
use function_name::named;
use getset::Getters;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use validator::Validate;

pub static DEFAULT_RETENTION_COUNT: i64 = 3;

/// Maximum number of backup files kept for one database.
///
/// Zero or negative keeps nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, From, Display, Deref)]
#[serde(transparent)]
pub struct RetentionCount(i64);

impl Default for RetentionCount {
    fn default() -> Self {
        Self(DEFAULT_RETENTION_COUNT)
    }
}

impl RetentionCount {
    /// Number of files that survive pruning.
    pub fn keep(&self) -> usize {
        usize::try_from(self.0).unwrap_or(0)
    }
}

/// Connection parameters and retention policy of one database.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters)]
#[getset(get = "pub")]
pub struct ConnectionConfig {
    port: u16,
    #[builder(into)]
    host: String,
    #[builder(into)]
    user: String,
    #[builder(into)]
    password: RedactedString,
    #[validate(custom(function = validate_valid_db_name))]
    #[builder(into)]
    db_name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "number_of_backups", alias = "retention_count", default)]
    #[builder(default, into)]
    retention_count: RetentionCount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Json,
        }
    }
}

pub fn parse_connection_configs<R: Read>(
    reader: R,
    format: ConfigFormat,
) -> Result<Vec<ConnectionConfig>> {
    let configs: Vec<ConnectionConfig> = match format {
        ConfigFormat::Json => serde_json::from_reader(reader)?,
        ConfigFormat::Yaml => serde_yml::from_reader(reader)?,
    };

    let errors = configs
        .iter()
        .enumerate()
        .filter_map(|(idx, config)| {
            config
                .validate()
                .map_err(Error::from)
                .with_msg(format!("Record #{idx} ({:?}) is invalid", config.db_name))
                .err()
        })
        .collect_vec();
    convert_error_vec(errors)?;

    Ok(configs)
}

#[named]
pub fn load_connection_configs<P: AsRef<Path>>(path: P) -> Result<Vec<ConnectionConfig>> {
    let path = path.as_ref();
    let configs = File::open(path)
        .map_err(Error::from)
        .with_msg(format!("Open config file failed: {path:?}"))
        .and_then(|f| {
            parse_connection_configs(BufReader::new(f), ConfigFormat::from_path(path))
                .with_msg(format!("Parse config failed: {path:?}"))
        })
        .with_debug_object_and_fn_name(path.to_path_buf(), function_path!())?;

    tracing::info!("Loaded {} database record(s) from {:?}", configs.len(), path);
    Ok(configs)
}
