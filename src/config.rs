use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::backtrace::Backtrace;
use std::path::Path;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cannot read config file {path}"))]
    ReadConfig {
        source: std::io::Error,
        path: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("invalid config"))]
    ParseConfig {
        source: toml::de::Error,
        backtrace: Option<Backtrace>,
    },
}

type Result<T> = std::result::Result<T, Error>;

pub const DEFAULT_MAX_LAG: usize = 300;
pub const DEFAULT_REGION_START: u64 = 1;
pub const DEFAULT_REGION_END: u64 = 1_000_000_000_000;

/// Parameters of one correlation run.
///
/// In a TOML file every key is optional:
///
/// ```toml
/// max_lag = 300
/// region_start = 1
/// region_end = 1000000
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CorrConfig {
    /// window width in bp; lags `0..max_lag` are computed
    pub max_lag: usize,
    /// inclusive
    pub region_start: u64,
    /// inclusive
    pub region_end: u64,
}

impl Default for CorrConfig {
    fn default() -> Self {
        Self {
            max_lag: DEFAULT_MAX_LAG,
            region_start: DEFAULT_REGION_START,
            region_end: DEFAULT_REGION_END,
        }
    }
}

impl CorrConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context(ParseConfigSnafu {})
    }

    pub fn from_toml_file(p: impl AsRef<Path>) -> Result<Self> {
        let p = p.as_ref();
        let s = std::fs::read_to_string(p).context(ReadConfigSnafu {
            path: p.to_string_lossy().to_string(),
        })?;
        Self::from_toml_str(&s)
    }

    /// Replace fields that are explicitly given, e.g. from the command line
    pub fn with_overrides(
        mut self,
        max_lag: Option<usize>,
        region_start: Option<u64>,
        region_end: Option<u64>,
    ) -> Self {
        if let Some(max_lag) = max_lag {
            self.max_lag = max_lag;
        }
        if let Some(region_start) = region_start {
            self.region_start = region_start;
        }
        if let Some(region_end) = region_end {
            self.region_end = region_end;
        }
        self
    }
}

#[test]
fn test_partial_toml_uses_defaults() {
    let cfg = CorrConfig::from_toml_str("max_lag = 50\n").unwrap();
    assert_eq!(cfg.max_lag, 50);
    assert_eq!(cfg.region_start, DEFAULT_REGION_START);
    assert_eq!(cfg.region_end, DEFAULT_REGION_END);
}

#[test]
fn test_unknown_key_rejected() {
    let res = CorrConfig::from_toml_str("max_lags = 50\n");
    assert!(matches!(res, Err(Error::ParseConfig { .. })));
}

#[test]
fn test_overrides() {
    let cfg = CorrConfig::default().with_overrides(None, Some(100), Some(200));
    assert_eq!(
        cfg,
        CorrConfig {
            max_lag: DEFAULT_MAX_LAG,
            region_start: 100,
            region_end: 200,
        }
    );
}
