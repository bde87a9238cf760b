//! Run settings: an optional RON file overlaid by command-line values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use sms_engine::{BatchConfig, SheetOptions};
use sms_logging::{redact, sms_info, sms_warn};

use super::cli::Args;

/// Pause between two sends when neither the file nor the command line set one.
pub const DEFAULT_DELAY_SECS: u64 = 450;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub access_token: Option<String>,
    pub device_id: Option<String>,
    pub default_template: Option<String>,
    pub delay_secs: Option<u64>,
    pub raw_cells: bool,
    pub delimiter: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub sheet_path: PathBuf,
    pub batch: BatchConfig,
    pub sheet: SheetOptions,
}

pub fn load_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path:?}"))?;
    let config = ron::from_str(&text)
        .with_context(|| format!("failed to parse config file {path:?}"))?;
    sms_info!("Loaded settings from {:?}", path);
    Ok(config)
}

/// Merges command-line values over `file`.
pub fn resolve(args: &Args, file: FileConfig) -> anyhow::Result<RunSettings> {
    let Some(credential) = args.token.clone().or(file.access_token) else {
        bail!("no access token given (use --token, PUSHBULLET_TOKEN or the config file)");
    };
    let Some(device_target) = args.device.clone().or(file.device_id) else {
        bail!("no target device given (use --device, PUSHBULLET_DEVICE or the config file)");
    };

    let default_template = match args.template.clone().or(file.default_template) {
        Some(template) => template,
        None => {
            sms_warn!("No default template set; rows without TextMessage get an empty message");
            String::new()
        }
    };

    let delimiter = match args.delimiter.or(file.delimiter) {
        Some(c) if c.is_ascii() => c as u8,
        Some(c) => bail!("delimiter {c:?} is not an ASCII character"),
        None => SheetOptions::default().delimiter,
    };

    let delay_secs = args
        .delay_secs
        .or(file.delay_secs)
        .unwrap_or(DEFAULT_DELAY_SECS);

    sms_info!(
        "Settings: device={} token={} delay={}s",
        device_target,
        redact(&credential),
        delay_secs
    );

    Ok(RunSettings {
        sheet_path: args.sheet.clone(),
        batch: BatchConfig {
            credential,
            device_target,
            default_template,
            inter_send_delay: Duration::from_secs(delay_secs),
        },
        sheet: SheetOptions {
            raw_cells: args.raw_cells || file.raw_cells,
            delimiter,
        },
    })
}
