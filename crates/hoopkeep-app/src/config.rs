// Configuration loading and parsing (app.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `credentials.toml`'s access token.
pub const ACCESS_TOKEN_ENV: &str = "HOOPKEEP_ACCESS_TOKEN";

/// Default log filter: info for the binary and both library crates.
pub const DEFAULT_LOG_FILTER: &str = "hoopkeep=info,hoopkeep_app=info,hoopkeep_core=info,warn";

/// `app.toml` written when no `defaults/` directory ships next to `config/`.
const BUILTIN_APP_TOML: &str = include_str!("../defaults/app.toml");

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("hoopkeep config file missing: {path} (expected config/app.toml next to defaults/)")]
    FileNotFound { path: PathBuf },

    #[error("invalid TOML in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("bad value for `{field}` in config/app.toml: {message}")]
    ValidationError { field: String, message: String },

    #[error("could not set up config/ from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory `config/` was loaded from; relative log paths resolve here.
    pub base_dir: PathBuf,
    pub yahoo: YahooConfig,
    pub keepers: KeepersConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// app.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire app.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AppFile {
    yahoo: YahooConfig,
    #[serde(default)]
    keepers: KeepersConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooConfig {
    /// Base URL every resource path is joined onto.
    pub api_base: String,
    /// Yahoo game code to list leagues for (`nba`).
    pub game_code: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeepersConfig {
    /// Player status filter for keeper lookups.
    pub status_filter: String,
}

impl Default for KeepersConfig {
    fn default() -> Self {
        KeepersConfig {
            status_filter: "K".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub dir: String,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            dir: "logs".into(),
            filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub access_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/app.toml` and (optionally)
/// `config/credentials.toml`, both relative to `base_dir`.
///
/// This does not copy defaults or consult the environment; prefer
/// `load_config()`.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- app.toml (required) ---
    let app_path = config_dir.join("app.toml");
    let app_text = read_file(&app_path)?;
    let app_file: AppFile = toml::from_str(&app_text).map_err(|e| ConfigError::ParseError {
        path: app_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        base_dir: base_dir.to_path_buf(),
        yahoo: app_file.yahoo,
        keepers: app_file.keepers,
        logging: app_file.logging,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Populate `config/` under `base_dir` with any missing files from
/// `defaults/`, skipping `.example` templates. Without a `defaults/`
/// directory the built-in `app.toml` is written instead, so a fresh per-user
/// config directory works on first run. Existing files are never touched.
///
/// Returns the files that were created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot create hoopkeep config directory {}: {e}", config_dir.display()),
    })?;

    if !defaults_dir.is_dir() {
        let target = config_dir.join("app.toml");
        return Ok(write_new(&target, BUILTIN_APP_TOML.as_bytes())?
            .then_some(target)
            .into_iter()
            .collect());
    }

    let listing = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot list {}: {e}", defaults_dir.display()),
    })?;

    let mut created = Vec::new();
    for entry in listing {
        let source = entry
            .map_err(|e| ConfigError::DefaultsCopyError {
                message: format!("cannot list {}: {e}", defaults_dir.display()),
            })?
            .path();
        let Some(name) = source.file_name().filter(|_| source.is_file()) else {
            continue;
        };
        if name.to_string_lossy().ends_with(".example") {
            continue;
        }

        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let content = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("cannot read default {}: {e}", source.display()),
        })?;
        if write_new(&target, &content)? {
            created.push(target);
        }
    }

    Ok(created)
}

/// Create `target` with `content`. `false` when it already exists.
fn write_new(target: &Path, content: &[u8]) -> Result<bool, ConfigError> {
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("cannot create {}: {e}", target.display()),
            })
        }
    };
    std::io::Write::write_all(&mut file, content).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot write {}: {e}", target.display()),
    })?;
    Ok(true)
}

/// Directory config is resolved against: the working directory when it holds
/// `config/` or `defaults/`, else the per-user config directory.
fn base_dir() -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        return Ok(cwd);
    }
    Ok(directories::ProjectDirs::from("", "", "hoopkeep")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or(cwd))
}

/// Convenience wrapper: resolves the base directory, copies defaults, loads,
/// and applies the `HOOPKEEP_ACCESS_TOKEN` override.
pub fn load_config() -> Result<Config, ConfigError> {
    let base = base_dir()?;
    ensure_config_files(&base)?;
    let mut config = load_config_from(&base)?;
    apply_token_override(&mut config, std::env::var(ACCESS_TOKEN_ENV).ok());
    Ok(config)
}

/// Replace the configured access token with `token` when it is non-blank.
pub fn apply_token_override(config: &mut Config, token: Option<String>) {
    if let Some(token) = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        config.credentials.access_token = Some(token);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let required: &[(&str, &str)] = &[
        ("yahoo.api_base", &config.yahoo.api_base),
        ("yahoo.game_code", &config.yahoo.game_code),
        ("keepers.status_filter", &config.keepers.status_filter),
    ];
    for (name, val) in required {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    let base = config.yahoo.api_base.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "yahoo.api_base".into(),
            message: format!("must be an http(s) URL, got {base}"),
        });
    }

    if config.yahoo.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "yahoo.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
