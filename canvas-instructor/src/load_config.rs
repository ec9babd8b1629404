//! `load_config`: reads the static YAML configuration and injects secrets from
//! the environment.
//!
//! The YAML file holds everything that is safe to commit. API tokens never
//! live in it; they are read from `CANVAS_TOKEN` and `GITHUB_TOKEN` (a `.env`
//! file is honoured, see `main`).
//!
//! ```yaml
//! canvas:
//!   base_url: https://canvas.example.edu/api/v1
//!   request_timeout_secs: 30 # optional
//!   max_pages: 100           # optional
//! github:
//!   organization: acme-school
//!   team: students
//!   base_url: https://api.github.com # optional
//! server:                    # optional
//!   host: 127.0.0.1
//!   port: 3000
//! course_name: 2504-FTB-ET-WEB-PT # optional default course
//! ```
//!
//! # Errors
//! Every failure is an `anyhow::Error` naming the file or variable at fault.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use canvas_instructor_core::config::{CanvasConfig, GithubConfig};
use serde::Deserialize;
use tracing::{error, info};

pub const CANVAS_TOKEN_ENV: &str = "CANVAS_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Deserialize)]
struct CanvasSection {
    base_url: String,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    max_pages: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GithubSection {
    organization: String,
    team: String,
    #[serde(default)]
    base_url: Option<String>,
}

/// Where `serve` listens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    canvas: CanvasSection,
    github: GithubSection,
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    course_name: Option<String>,
}

/// Fully resolved configuration, secrets included.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub github: GithubConfig,
    pub server: ServerSection,
    /// Course used when a command is not given an explicit course id.
    pub course_name: Option<String>,
}

fn required_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => {
            error!(env_var = name, "Required secret missing from environment");
            Err(anyhow!("environment variable {name} must be set"))
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let mut canvas = CanvasConfig::new(raw.canvas.base_url, required_env(CANVAS_TOKEN_ENV)?);
    if let Some(secs) = raw.canvas.request_timeout_secs {
        canvas.request_timeout = Duration::from_secs(secs);
    }
    if let Some(max_pages) = raw.canvas.max_pages {
        canvas.max_pages = max_pages;
    }

    let mut github = GithubConfig::new(
        required_env(GITHUB_TOKEN_ENV)?,
        raw.github.organization,
        raw.github.team,
    );
    if let Some(base_url) = raw.github.base_url {
        github.base_url = base_url;
    }

    Ok(AppConfig {
        canvas,
        github,
        server: raw.server,
        course_name: raw.course_name,
    })
}
