use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::credentials::CredentialPool;
use crate::error::{Error, Result};

/// Provider section of the config file holding `"<api-key>:<cx>"` entries.
pub const PROVIDER: &str = "google";

const APP_DIR: &str = "pagode";
const CONFIG_FILE: &str = "config.yaml";

/// `<user config dir>/pagode/config.yaml`, or `./pagode/config.yaml` when the
/// platform has no config dir.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Load the credential pool from a YAML config file, creating an empty file
/// first if none exists yet.
pub fn load_credentials(path: &Path) -> Result<CredentialPool> {
    let config_err = |source| Error::Config {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(config_err)?;
        }
        fs::File::create(path).map_err(config_err)?;
        info!("Created empty config at {}", path.display());
    }

    info!("Loading config from {}", path.display());
    let raw = fs::read_to_string(path).map_err(config_err)?;
    let providers = parse_providers(&substitute_env(&raw)).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = providers
        .get(PROVIDER)
        .and_then(Option::as_deref)
        .unwrap_or_default();
    CredentialPool::from_entries(entries.iter().map(String::as_str))
}

fn parse_providers(
    raw: &str,
) -> std::result::Result<HashMap<String, Option<Vec<String>>>, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    let parsed: Option<HashMap<String, Option<Vec<String>>>> = serde_yaml::from_str(raw)?;
    Ok(parsed.unwrap_or_default())
}

/// Replace `${NAME}` with the value of environment variable `NAME`. Unknown
/// variables are left untouched.
fn substitute_env(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };

        let name = &after[..close];
        match env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(&rest[open..open + close + 3]),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}
