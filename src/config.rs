//! Scraper configuration: service endpoints and fetch settings.
//!
//! Values are resolved from built-in defaults, then an optional
//! `key = value` file at `$XDG_CONFIG_HOME/profile-scraper/config.toml`
//! (falling back to `$HOME/.config/profile-scraper/config.toml`), then CLI
//! overrides applied by the binary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::fetch::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, DEFAULT_MAX_RETRY_DELAY, DEFAULT_RETRY_DELAY,
    MAX_RETRIES_LIMIT, READ_TIMEOUT_SECS,
};

/// Default service root. Must end with `/`.
pub const DEFAULT_BASE_URL: &str = "https://www.instagram.com/";

/// Placeholder substituted with the percent-encoded username.
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A line is not valid `key = value` syntax or names an unknown key.
    #[error("invalid config on line {line}: {message}")]
    Syntax {
        /// 1-indexed line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// A value is outside its accepted range.
    #[error("invalid config value for `{key}`: {message}")]
    Value {
        /// The offending key.
        key: &'static str,
        /// What was wrong.
        message: String,
    },
}

/// URLs of the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    /// Service root; fetched to obtain the anti-forgery cookie and sent as `Referer`.
    pub base_url: String,
    /// Credential login endpoint.
    pub login_url: String,
    /// Logout endpoint.
    pub logout_url: String,
    /// Profile document URL containing [`USERNAME_PLACEHOLDER`].
    pub profile_url_template: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self::from_base_url(DEFAULT_BASE_URL)
    }
}

impl ServiceEndpoints {
    /// Derives all endpoints from a service root.
    ///
    /// A missing trailing slash is added so relative paths join cleanly.
    #[must_use]
    pub fn from_base_url(base_url: &str) -> Self {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Self {
            login_url: format!("{base}accounts/login/ajax/"),
            logout_url: format!("{base}accounts/logout/"),
            profile_url_template: format!("{base}{USERNAME_PLACEHOLDER}/?__a=1"),
            base_url: base,
        }
    }

    /// Builds the profile document URL for `username`.
    #[must_use]
    pub fn profile_url(&self, username: &str) -> String {
        self.profile_url_template
            .replace(USERNAME_PLACEHOLDER, &urlencoding::encode(username))
    }

    /// Resolves a server-relative path (e.g. a checkpoint path) against the service root.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(path))
            .map_or_else(
                |_| format!("{}{}", self.base_url.trim_end_matches('/'), path),
                String::from,
            )
    }
}

/// Timeouts and retry policy inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Connect timeout for every request.
    pub connect_timeout: Duration,
    /// Total request timeout.
    pub read_timeout: Duration,
    /// Initial backoff delay.
    pub retry_delay: Duration,
    /// Backoff cap.
    pub max_retry_delay: Duration,
    /// Automatic retries before escalation.
    pub max_retries: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Complete scraper configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScraperConfig {
    /// Remote endpoints.
    pub endpoints: ServiceEndpoints,
    /// Fetch behavior.
    pub fetch: FetchSettings,
}

impl ScraperConfig {
    /// Resolves defaults, then `file`, then a base URL override.
    ///
    /// The override only replaces the file's `base_url`: endpoint keys the
    /// file sets explicitly still win over the ones derived from it.
    #[must_use]
    pub fn resolve(file: Option<&FileConfig>, base_url_override: Option<&str>) -> Self {
        let mut file = file.cloned().unwrap_or_default();
        if let Some(base_url) = base_url_override {
            file.base_url = Some(base_url.to_string());
        }
        let mut config = Self::default();
        file.apply_to(&mut config);
        config
    }
}

/// Values read from the config file; `None` means "keep the default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub login_url: Option<String>,
    pub logout_url: Option<String>,
    pub profile_url_template: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub retry_delay_secs: Option<u64>,
    pub max_retry_delay_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

impl FileConfig {
    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Value`] for the first out-of-range or malformed value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_secs("connect_timeout_secs", self.connect_timeout_secs, 1..=3600)?;
        validate_secs("read_timeout_secs", self.read_timeout_secs, 1..=3600)?;
        validate_secs("retry_delay_secs", self.retry_delay_secs, 0..=3600)?;
        validate_secs("max_retry_delay_secs", self.max_retry_delay_secs, 0..=3600)?;
        if let (Some(delay), Some(cap)) = (self.retry_delay_secs, self.max_retry_delay_secs)
            && delay > cap
        {
            return Err(ConfigError::Value {
                key: "retry_delay_secs",
                message: format!("{delay} exceeds max_retry_delay_secs ({cap})"),
            });
        }
        if let Some(max_retries) = self.max_retries
            && max_retries > MAX_RETRIES_LIMIT
        {
            return Err(ConfigError::Value {
                key: "max_retries",
                message: format!("{max_retries}. Expected range: 0..={MAX_RETRIES_LIMIT}"),
            });
        }
        validate_url("base_url", self.base_url.as_deref())?;
        validate_url("login_url", self.login_url.as_deref())?;
        validate_url("logout_url", self.logout_url.as_deref())?;
        if let Some(template) = self.profile_url_template.as_deref()
            && !template.contains(USERNAME_PLACEHOLDER)
        {
            return Err(ConfigError::Value {
                key: "profile_url_template",
                message: format!("must contain {USERNAME_PLACEHOLDER}"),
            });
        }
        Ok(())
    }

    /// Applies file values on top of `config`.
    ///
    /// `base_url` is applied first so explicitly configured endpoints win over
    /// the ones derived from it.
    pub fn apply_to(&self, config: &mut ScraperConfig) {
        if let Some(base_url) = &self.base_url {
            config.endpoints = ServiceEndpoints::from_base_url(base_url);
        }
        if let Some(login_url) = &self.login_url {
            config.endpoints.login_url.clone_from(login_url);
        }
        if let Some(logout_url) = &self.logout_url {
            config.endpoints.logout_url.clone_from(logout_url);
        }
        if let Some(template) = &self.profile_url_template {
            config.endpoints.profile_url_template.clone_from(template);
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.fetch.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            config.fetch.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.retry_delay_secs {
            config.fetch.retry_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = self.max_retry_delay_secs {
            config.fetch.max_retry_delay = Duration::from_secs(secs);
        }
        if let Some(max_retries) = self.max_retries {
            config.fetch.max_retries = max_retries;
        }
    }
}

fn validate_secs(
    key: &'static str,
    value: Option<u64>,
    range: std::ops::RangeInclusive<u64>,
) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !range.contains(&value) {
        return Err(ConfigError::Value {
            key,
            message: format!("{value}. Expected range: {}..={}", range.start(), range.end()),
        });
    }
    Ok(())
}

fn validate_url(key: &'static str, value: Option<&str>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    Url::parse(value).map_err(|e| ConfigError::Value {
        key,
        message: format!("{value}: {e}"),
    })?;
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/profile-scraper/config.toml`
/// 2. `$HOME/.config/profile-scraper/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("profile-scraper")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("profile-scraper")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at `path`, or `None` when it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or validated.
pub fn load_file_config(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config_str(&raw)?;
    config.validate()?;
    Ok(Some(config))
}

/// Loads the config file at the default location, if there is one.
///
/// # Errors
///
/// Returns [`ConfigError`] when a present config file is invalid.
pub fn load_default_file_config() -> Result<Option<FileConfig>, ConfigError> {
    match resolve_default_config_path() {
        Some(path) => load_file_config(&path),
        None => Ok(None),
    }
}

/// Builds a [`ScraperConfig`] from defaults plus the default config file, if any.
///
/// # Errors
///
/// Returns [`ConfigError`] when a present config file is invalid.
pub fn load_default_config() -> Result<ScraperConfig, ConfigError> {
    let file = load_default_file_config()?;
    Ok(ScraperConfig::resolve(file.as_ref(), None))
}

/// Parses `key = value` lines. `#` starts a comment outside quotes.
///
/// # Errors
///
/// Returns [`ConfigError::Syntax`] for malformed lines or unknown keys.
pub fn parse_config_str(raw: &str) -> Result<FileConfig, ConfigError> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            return Err(syntax(line_no, "expected key = value"));
        };
        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "base_url" => cfg.base_url = Some(parse_string_literal(value, line_no)?),
            "login_url" => cfg.login_url = Some(parse_string_literal(value, line_no)?),
            "logout_url" => cfg.logout_url = Some(parse_string_literal(value, line_no)?),
            "profile_url_template" => {
                cfg.profile_url_template = Some(parse_string_literal(value, line_no)?);
            }
            "connect_timeout_secs" => cfg.connect_timeout_secs = Some(parse_int(value, line_no)?),
            "read_timeout_secs" => cfg.read_timeout_secs = Some(parse_int(value, line_no)?),
            "retry_delay_secs" => cfg.retry_delay_secs = Some(parse_int(value, line_no)?),
            "max_retry_delay_secs" => cfg.max_retry_delay_secs = Some(parse_int(value, line_no)?),
            "max_retries" => cfg.max_retries = Some(parse_int(value, line_no)?),
            other => return Err(syntax(line_no, &format!("unknown key `{other}`"))),
        }
    }
    Ok(cfg)
}

fn syntax(line: usize, message: &str) -> ConfigError {
    ConfigError::Syntax {
        line,
        message: message.to_string(),
    }
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(value: &str, line: usize) -> Result<String, ConfigError> {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_string)
        .ok_or_else(|| syntax(line, "expected a double-quoted string"))
}

fn parse_int<T: std::str::FromStr>(value: &str, line: usize) -> Result<T, ConfigError> {
    value
        .replace('_', "")
        .parse::<T>()
        .map_err(|_| syntax(line, &format!("expected a non-negative integer, got `{value}`")))
}
