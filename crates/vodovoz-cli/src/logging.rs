// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// `VODOVOZ_LOG` wins over `[log].level` when set.
const LOG_ENV: &str = "VODOVOZ_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    File(PathBuf),
    Disabled,
}

impl LogSink {
    /// The interactive screen owns stdout and stderr, so it only ever logs to
    /// a file.
    pub fn resolve(interactive: bool, file: Option<PathBuf>) -> Self {
        match (interactive, file) {
            (_, Some(path)) => Self::File(path),
            (true, None) => Self::Disabled,
            (false, None) => Self::Stderr,
        }
    }
}

pub fn filter_for(level: &str) -> Result<EnvFilter> {
    if let Ok(raw) = std::env::var(LOG_ENV)
        && !raw.trim().is_empty()
    {
        return EnvFilter::try_new(&raw).with_context(|| format!("parse {LOG_ENV}={raw:?}"));
    }
    EnvFilter::try_new(level).with_context(|| format!("parse log level {level:?}"))
}

pub fn init(level: &str, sink: &LogSink) -> Result<()> {
    let installed = match sink {
        LogSink::Disabled => return Ok(()),
        LogSink::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter_for(level)?)
            .with_writer(io::stderr)
            .with_target(true)
            .try_init(),
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter_for(level)?)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
    };
    installed.map_err(|error| anyhow!("install log subscriber: {error}"))
}
