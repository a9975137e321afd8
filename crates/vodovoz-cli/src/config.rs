// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vodovoz_app::TabKind;
use vodovoz_client::{CatalogClient, DEFAULT_ENDPOINT, DEFAULT_IMAGE_BASE_URL};

const CONFIG_VERSION: i64 = 1;
const APP_NAME: &str = "vodovoz";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            catalog: Catalog::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    pub endpoint: Option<String>,
    pub image_base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub start_tab: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("VODOVOZ_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set VODOVOZ_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [catalog], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(timeout) = &self.catalog.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed.is_zero() {
                bail!(
                    "catalog.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(tab) = &self.ui.start_tab
            && TabKind::parse(tab).is_none()
        {
            let keys = TabKind::ALL
                .iter()
                .map(|tab| tab.key())
                .collect::<Vec<_>>()
                .join(", ");
            bail!(
                "ui.start_tab in {} must be one of {keys}, got {tab:?}",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!("log.level in {} is not a valid filter: {level:?}", path.display())
            })?;
        }

        if let Some(file) = &self.log.file
            && file.trim().is_empty()
        {
            bail!("log.file in {} must not be empty when set", path.display());
        }

        Ok(())
    }

    pub fn endpoint(&self) -> &str {
        self.catalog.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn image_base_url(&self) -> &str {
        self.catalog
            .image_base_url
            .as_deref()
            .unwrap_or(DEFAULT_IMAGE_BASE_URL)
    }

    pub fn catalog_timeout(&self) -> Result<Duration> {
        parse_duration(self.catalog.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    /// Builds the live client from `[catalog]`; URL problems surface here.
    pub fn catalog_client(&self) -> Result<CatalogClient> {
        CatalogClient::new(
            self.endpoint(),
            self.image_base_url(),
            self.catalog_timeout()?,
        )
    }

    pub fn start_tab(&self) -> TabKind {
        self.ui
            .start_tab
            .as_deref()
            .and_then(TabKind::parse)
            .unwrap_or(TabKind::Home)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log.file.as_deref().map(PathBuf::from)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# vodovoz config\n# Place this file at: {}\n\nversion = 1\n\n[catalog]\nendpoint = \"{}\"\n# Picture paths from the feed are appended to this prefix.\nimage_base_url = \"{}\"\ntimeout = \"{}\"\n\n[ui]\n# One of: home, catalog, cart, favorites, profile\nstart_tab = \"home\"\n\n[log]\nlevel = \"{}\"\n# The interactive screen owns the terminal, so logs are only written when a file is set.\n# file = \"/tmp/vodovoz.log\"\n",
            path.display(),
            DEFAULT_ENDPOINT,
            DEFAULT_IMAGE_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("timeout {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;
    use vodovoz_app::TabKind;
    use vodovoz_client::{DEFAULT_ENDPOINT, DEFAULT_IMAGE_BASE_URL};

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.image_base_url(), DEFAULT_IMAGE_BASE_URL);
        assert_eq!(config.catalog_timeout()?, Duration::from_secs(10));
        assert_eq!(config.start_tab(), TabKind::Home);
        assert_eq!(config.log_level(), "warn");
        assert_eq!(config.log_file(), None);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[catalog]\ntimeout = \"5s\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[catalog], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[catalog]\nendpoint = \"http://127.0.0.1:8080/feed\"\nimage_base_url = \"http://127.0.0.1:8080/\"\ntimeout = \"1500ms\"\n[ui]\nstart_tab = \"favorites\"\n[log]\nlevel = \"vodovoz_client=debug\"\nfile = \"/tmp/vodovoz.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.endpoint(), "http://127.0.0.1:8080/feed");
        assert_eq!(config.image_base_url(), "http://127.0.0.1:8080/");
        assert_eq!(config.catalog_timeout()?, Duration::from_millis(1500));
        assert_eq!(config.start_tab(), TabKind::Favorites);
        assert_eq!(config.log_level(), "vodovoz_client=debug");
        assert_eq!(config.log_file(), Some(PathBuf::from("/tmp/vodovoz.log")));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn unknown_start_tab_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nstart_tab = \"checkout\"\n")?;
        let error = Config::load(&path).expect_err("unknown tab should fail");
        let message = error.to_string();
        assert!(message.contains("ui.start_tab"), "unexpected message: {message}");
        assert!(message.contains("home, catalog, cart, favorites, profile"));
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[catalog]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn invalid_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"vodovoz=verbose\"\n")?;
        let error = Config::load(&path).expect_err("bad filter should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn blank_log_file_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nfile = \"  \"\n")?;
        let error = Config::load(&path).expect_err("blank log file should fail");
        assert!(error.to_string().contains("log.file"));
        Ok(())
    }

    #[test]
    fn invalid_catalog_urls_fail_client_construction() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[catalog]\nendpoint = \"ftp://vodovoz.test/feed\"\n")?;
        let config = Config::load(&path)?;
        let error = config
            .catalog_client()
            .expect_err("ftp endpoint should fail");
        assert!(error.to_string().contains("http or https"));

        let (_temp, path) = write_config(
            "version = 1\n[catalog]\nimage_base_url = \"https://vodovoz.test/img\"\n",
        )?;
        let error = Config::load(&path)?
            .catalog_client()
            .expect_err("base without trailing slash should fail");
        assert!(error.to_string().contains("must end with '/'"));
        Ok(())
    }

    #[test]
    fn default_catalog_client_uses_configured_timeout() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[catalog]\ntimeout = \"3s\"\n")?;
        let client = Config::load(&path)?.catalog_client()?;
        assert_eq!(client.timeout(), Duration::from_secs(3));
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("VODOVOZ_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("VODOVOZ_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("VODOVOZ_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("vodovoz/config.toml"));
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn oversized_minute_timeout_is_rejected() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[catalog]\ntimeout = \"307445734561825862m\"\n")?;
        let error = Config::load(&path).expect_err("overflowing timeout should fail");
        assert!(error.to_string().contains("too large"), "unexpected: {error}");

        assert_eq!(
            parse_duration("307445734561825860m")?,
            Duration::from_secs(307_445_734_561_825_860 * 60)
        );
        Ok(())
    }

    #[test]
    fn timeout_rejects_invalid_duration() {
        let error = parse_duration("soon").expect_err("invalid duration should fail");
        let message = error.to_string();
        assert!(
            message.contains("invalid duration") || message.contains("invalid timeout duration"),
            "unexpected message: {message}"
        );
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[catalog]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[log]"));

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.start_tab(), TabKind::Home);
        Ok(())
    }
}
