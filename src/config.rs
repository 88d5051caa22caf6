// src/config.rs
//! TOML configuration with layered defaults: built-in values, then the
//! config file, then non-zero CLI flag overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::domain::Profile;

/// URL and display name for a single CT log.
#[derive(Debug, Clone, Deserialize)]
pub struct CtLogSpec {
    /// Base URL of the log, without a trailing slash.
    pub url: String,

    /// Human-readable label used in log output and stats.
    #[serde(default)]
    pub name: String,
}

/// All configurable values. Every field has a usable default, so the
/// tool runs without a config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Certificate Transparency logs to poll.
    pub ct_logs: Vec<CtLogSpec>,

    /// Profile used when --profile is not given.
    pub default_profile: String,

    /// CT log entries fetched per poll request per log.
    pub batch_size: i64,

    /// Wait between consecutive polls of each log. Accepts duration
    /// strings ("5s", "2m", "1h30m") or a plain number of seconds.
    #[serde(deserialize_with = "de_duration")]
    pub poll_interval: Duration,

    /// Path to the SQLite database file.
    pub db_path: PathBuf,

    /// Extra domain suffixes excluded from scoring, merged into every profile.
    pub skip_suffixes: Vec<String>,

    /// Entries behind the current log tip to start at. Zero starts at the tip.
    pub backtrack: i64,

    /// User-defined profiles keyed by name. A profile extends a built-in
    /// by setting its description to "extends:<name>".
    pub custom_profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ct_logs: vec![
                CtLogSpec {
                    url: "https://ct.googleapis.com/logs/us1/argon2025h1".to_string(),
                    name: "Google Argon 2025h1".to_string(),
                },
                CtLogSpec {
                    url: "https://ct.googleapis.com/logs/us1/argon2025h2".to_string(),
                    name: "Google Argon 2025h2".to_string(),
                },
                CtLogSpec {
                    url: "https://ct.googleapis.com/logs/eu1/xenon2025h1".to_string(),
                    name: "Google Xenon 2025h1".to_string(),
                },
            ],
            default_profile: "all".to_string(),
            batch_size: 256,
            poll_interval: Duration::from_secs(5),
            db_path: default_db_path(),
            skip_suffixes: Vec::new(),
            backtrack: 0,
            custom_profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from a TOML file with defaults applied for missing
    /// values. A missing file (or `None`) silently yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("reading config file {}", path.display())));
            }
        };

        let mut cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        cfg.apply_defaults();
        Ok(cfg)
    }

    /// Apply CLI flag overrides. Zero values mean "not set" and leave the
    /// config untouched.
    pub fn merge_flags(
        &mut self,
        db_path: Option<&Path>,
        batch_size: i64,
        poll_interval: Option<Duration>,
        backtrack: i64,
    ) {
        if let Some(db_path) = db_path {
            self.db_path = db_path.to_path_buf();
        }
        if batch_size > 0 {
            self.batch_size = batch_size;
        }
        if let Some(interval) = poll_interval {
            if !interval.is_zero() {
                self.poll_interval = interval;
            }
        }
        if backtrack > 0 {
            self.backtrack = backtrack;
        }
    }

    /// Fill zero-valued fields with defaults after parsing.
    fn apply_defaults(&mut self) {
        let defaults = Config::default();
        if self.batch_size <= 0 {
            self.batch_size = defaults.batch_size;
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = defaults.poll_interval;
        }
        if self.db_path.as_os_str().is_empty() {
            self.db_path = defaults.db_path;
        }
        if self.default_profile.is_empty() {
            self.default_profile = defaults.default_profile;
        }
        if self.ct_logs.is_empty() {
            self.ct_logs = defaults.ct_logs;
        }
        for log in &mut self.ct_logs {
            if log.name.is_empty() {
                log.name = log.url.clone();
            }
        }
    }
}

/// XDG-compliant default database path:
/// $XDG_DATA_HOME/certsnare/certsnare.db, falling back to
/// ~/.local/share/certsnare/certsnare.db.
fn default_db_path() -> PathBuf {
    let data_home = match std::env::var_os("XDG_DATA_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".local").join("share"),
            None => return PathBuf::from("certsnare.db"),
        },
    };
    data_home.join("certsnare").join("certsnare.db")
}

/// Parse a duration string: concatenated `<number><unit>` segments with
/// units ms, s, m, h ("90s", "5m", "1h30m"). A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("empty duration");
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut chars = s.chars().peekable();
    while chars.peek().is_some() {
        let mut digits = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(*c);
                chars.next();
            } else {
                break;
            }
        }
        let value: u64 = digits
            .parse()
            .with_context(|| format!("invalid duration {s:?}"))?;

        let mut unit = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_alphabetic() {
                unit.push(*c);
                chars.next();
            } else {
                break;
            }
        }
        total += match unit.as_str() {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            other => anyhow::bail!("invalid duration unit {other:?} in {s:?}"),
        };
    }
    Ok(total)
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Seconds(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg = Config::load(Some(Path::new("/nonexistent/certsnare.toml"))).unwrap();
        assert_eq!(cfg.batch_size, 256);
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.default_profile, "all");
        assert_eq!(cfg.ct_logs.len(), 3);
    }

    #[test]
    fn test_load_full_config() {
        let toml_content = r#"
default_profile = "crypto"
batch_size = 512
poll_interval = "10s"
db_path = "/tmp/test-certsnare.db"
skip_suffixes = ["internal.corp"]
backtrack = 1000

[[ct_logs]]
url = "https://ct.example.com/log"
name = "Example Log"

[custom_profiles.mybrand]
keywords = ["mybrand"]
suspicious_tlds = [".shop"]
description = "extends:phishing"
        "#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();
        file.flush().unwrap();

        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.default_profile, "crypto");
        assert_eq!(cfg.batch_size, 512);
        assert_eq!(cfg.poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/test-certsnare.db"));
        assert_eq!(cfg.skip_suffixes, vec!["internal.corp"]);
        assert_eq!(cfg.backtrack, 1000);
        assert_eq!(cfg.ct_logs.len(), 1);
        assert_eq!(cfg.ct_logs[0].name, "Example Log");
        let custom = &cfg.custom_profiles["mybrand"];
        assert_eq!(custom.keywords, vec!["mybrand"]);
        assert_eq!(custom.description, "extends:phishing");
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"batch_size = 64").unwrap();
        file.flush().unwrap();

        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.ct_logs.len(), 3);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"invalid toml {{{").unwrap();
        file.flush().unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_log_without_name_uses_url() {
        let toml_content = r#"
[[ct_logs]]
url = "https://ct.example.com/log"
        "#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();
        file.flush().unwrap();

        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.ct_logs[0].name, "https://ct.example.com/log");
    }

    #[test]
    fn test_merge_flags_only_non_zero() {
        let mut cfg = Config::default();
        cfg.merge_flags(None, 0, None, 0);
        assert_eq!(cfg.batch_size, 256);
        assert_eq!(cfg.backtrack, 0);

        cfg.merge_flags(
            Some(Path::new("/tmp/override.db")),
            128,
            Some(Duration::from_secs(30)),
            5000,
        );
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/override.db"));
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.backtrack, 5000);
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5fortnights").is_err());
    }

    #[test]
    fn test_poll_interval_as_integer_seconds() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"poll_interval = 7").unwrap();
        file.flush().unwrap();

        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(7));
    }
}
