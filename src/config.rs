use serde_derive::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::{Error, Result};
use crate::solver::DEFAULT_DISCRIMINANT_EPSILON;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5555";
pub const SERVER_LOG_FILE: &str = "server.log";
pub const CLIENT_LOG_FILE: &str = "client.log";

/*
    サーバ・クライアント共通の設定。
    既定値 -> 設定ファイル (JSON) -> コマンドライン引数 の順に上書きする
*/
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /* サーバの待受けアドレス (クライアントにとっては送信先) */
    pub addr: String,
    pub log_file: Option<PathBuf>,
    /* 0 はタイムアウトなし */
    pub timeout_secs: u64,
    pub verbose: bool,
    pub discriminant_epsilon: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: DEFAULT_ADDRESS.to_string(),
            log_file: None,
            timeout_secs: 0,
            verbose: false,
            discriminant_epsilon: DEFAULT_DISCRIMINANT_EPSILON,
        }
    }
}

/* コマンドラインで明示された値だけを持つ */
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub addr: Option<String>,
    pub log_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub verbose: bool,
    pub discriminant_epsilon: Option<f64>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let base = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let config = base.apply(overrides);
        config.validate(path.unwrap_or(Path::new("<command line>")))?;
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(addr) = overrides.addr {
            self.addr = addr;
        }
        if let Some(log_file) = overrides.log_file {
            self.log_file = Some(log_file);
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if let Some(epsilon) = overrides.discriminant_epsilon {
            self.discriminant_epsilon = epsilon;
        }
        self.verbose |= overrides.verbose;
        self
    }

    fn validate(&self, origin: &Path) -> Result<()> {
        if !self.discriminant_epsilon.is_finite() || self.discriminant_epsilon < 0.0 {
            return Err(Error::Config {
                path: origin.to_path_buf(),
                message: format!(
                    "discriminant_epsilon must be a non-negative number, got {}",
                    self.discriminant_epsilon
                ),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn log_file_or<'a>(&'a self, fallback: &'a str) -> &'a Path {
        self.log_file.as_deref().unwrap_or(Path::new(fallback))
    }
}
