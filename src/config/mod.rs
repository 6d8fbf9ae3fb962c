mod settings;
mod state;

pub use settings::{format_number, ApiSettings, Config, DocumentSettings, NumberingSettings};
pub use state::{Counter, Counters, Ledger};

use crate::error::{DeskError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.desk/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "desk") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        DeskError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".desk"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Create the config directory with a template config and an empty ledger
pub fn init_config_dir(config_dir: &Path) -> Result<()> {
    if config_dir.exists() {
        return Err(DeskError::AlreadyInitialized(config_dir.to_path_buf()));
    }
    fs::create_dir_all(config_dir)?;
    fs::write(config_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    save_ledger(config_dir, &Ledger::default())?;
    tracing::info!(path = %config_dir.display(), "initialized config directory");
    Ok(())
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(DeskError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    let config: Config =
        toml::from_str(&content).map_err(|e| DeskError::ConfigParse { path, source: e })?;
    config.documents.validate()?;
    Ok(config)
}

/// Load state.toml (empty ledger if missing)
pub fn load_ledger(config_dir: &Path) -> Result<Ledger> {
    let path = config_dir.join("state.toml");
    if !path.exists() {
        return Ok(Ledger::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| DeskError::ConfigParse { path, source: e })
}

/// Save state.toml. Written to a sibling file first and renamed into place.
pub fn save_ledger(config_dir: &Path, ledger: &Ledger) -> Result<()> {
    let path = config_dir.join("state.toml");
    let content = toml::to_string_pretty(ledger).map_err(|e| DeskError::StateWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let staging = config_dir.join("state.toml.tmp");
    fs::write(&staging, content)?;
    fs::rename(&staging, &path)?;
    tracing::debug!(path = %path.display(), "saved ledger");
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[organization]
name = "Your Company Name"
tax_id = "1-01-00000-0"
address = "Av. Principal 123"
city = "Santo Domingo"
phone = "809-555-0100"
email = "ventas@yourcompany.com"
# website = "https://yourcompany.com"     # optional
# logo_url = "https://.../logo.png"       # optional, printed in the header
# stamp_url = "https://.../stamp.png"     # optional, printed over the signature

[documents]
currency_symbol = "RD$"
thousands_separator = ","
decimal_separator = "."
date_format = "%d/%m/%Y"
default_tax_rate = 18.0          # percent
quotation_valid_days = 15
due_days = 0                     # invoice due date = issue date + due_days
default_payment_method = "cash"  # cash, card, transfer, check
output_dir = "~/.desk/output"

[numbering]
quotation_format = "COT-{year}-{seq:04}"
sale_format = "VEN-{year}-{seq:04}"
rental_format = "ALQ-{year}-{seq:04}"

# Uncomment to work against the REST API instead of the local ledger
# [api]
# base_url = "http://localhost:8000/api"
# token = "..."
# timeout_secs = 10
"#;
