use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_GITHUB_BASE_URL: &str = "https://api.github.com";

/// Connection settings for the Canvas REST API.
///
/// `base_url` includes the API root, e.g. `https://canvas.example.edu/api/v1`.
#[derive(Clone)]
pub struct CanvasConfig {
    pub base_url: String,
    pub token: String,
    pub request_timeout: Duration,
    /// Upper bound on pages followed by a single `fetch_all` call.
    pub max_pages: usize,
}

impl CanvasConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            timeout_secs = self.request_timeout.as_secs(),
            max_pages = self.max_pages,
            "Loaded Canvas config"
        );
        debug!(?self, "Canvas config loaded (full debug)");
    }
}

impl fmt::Debug for CanvasConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

/// Connection settings for the GitHub REST API, plus the team that is
/// granted pull access when a lesson is published.
#[derive(Clone)]
pub struct GithubConfig {
    pub base_url: String,
    pub token: String,
    pub organization: String,
    pub team: String,
    pub request_timeout: Duration,
}

impl GithubConfig {
    pub fn new(
        token: impl Into<String>,
        organization: impl Into<String>,
        team: impl Into<String>,
    ) -> Self {
        Self {
            base_url: DEFAULT_GITHUB_BASE_URL.to_string(),
            token: token.into(),
            organization: organization.into(),
            team: team.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            organization = %self.organization,
            team = %self.team,
            "Loaded GitHub config"
        );
        debug!(?self, "GitHub config loaded (full debug)");
    }
}

impl fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("organization", &self.organization)
            .field("team", &self.team)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
