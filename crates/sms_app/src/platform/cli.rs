use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Send one SMS per spreadsheet row through a Pushbullet-paired phone.
#[derive(Debug, Parser)]
#[command(name = "sms_app")]
pub struct Args {
    /// CSV sheet with Name and PhoneNumber columns (optional TextMessage).
    pub sheet: PathBuf,
    /// Pushbullet access token
    #[arg(long, env = "PUSHBULLET_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Target device identifier that relays the SMS
    #[arg(long, env = "PUSHBULLET_DEVICE")]
    pub device: Option<String>,
    /// Message template for rows without a TextMessage, e.g. "Hi {Name}"
    #[arg(long)]
    pub template: Option<String>,
    /// Seconds to wait between two sends
    #[arg(long)]
    pub delay_secs: Option<u64>,
    /// Keep every cell as text instead of parsing numbers
    #[arg(long)]
    pub raw_cells: bool,
    /// Field delimiter of the sheet
    #[arg(long)]
    pub delimiter: Option<char>,
    /// RON file with default settings; command-line values win
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Where log output goes
    #[arg(long, value_enum, default_value = "file")]
    pub log: LogTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}
