use std::{fmt, io, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

/// Console output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

/// Logging section of the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or full `EnvFilter` directive, e.g. `info` or `snsim=debug`.
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    /// Daily-rolling file output is enabled when set.
    pub log_dir: Option<PathBuf>,
    pub file_name: String,
}

impl LoggingConfig {
    /// Directive for `EnvFilter`. A bare level applies to this crate and
    /// leaves dependencies at `warn`.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("warn,snsim={level}")
        }
    }

    pub fn file_enabled(&self) -> bool {
        self.log_dir.is_some()
    }

    /// Creates the log directory if file output is enabled.
    pub fn ensure_log_dir(&self) -> io::Result<()> {
        match &self.log_dir {
            Some(dir) => std::fs::create_dir_all(dir),
            None => Ok(()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            log_dir: None,
            file_name: "snsim.log".to_string(),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_scoped_to_crate() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.build_filter_directive(), "warn,snsim=info");
    }

    #[test]
    fn test_full_directive_kept() {
        let cfg = LoggingConfig {
            level: "snsim=debug,reqwest=info".into(),
            ..Default::default()
        };
        assert_eq!(cfg.build_filter_directive(), "snsim=debug,reqwest=info");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default().to_string(), "compact");
    }

    #[test]
    fn test_file_disabled_by_default() {
        let cfg = LoggingConfig::default();
        assert!(!cfg.file_enabled());
        assert!(cfg.ensure_log_dir().is_ok());
    }
}
