//! Error taxonomy shared by the Canvas client, the GitHub adapter and the
//! lesson workflow.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the Canvas API.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// The server answered with a status outside the 2xx range.
    #[error("{method} {url} failed with status {status}: {body}")]
    Transport {
        method: String,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("request to {url} could not be completed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pagination still continuing after {limit} pages (next: {url})")]
    PageLimit { limit: usize, url: String },

    #[error("expected {expected} but received a differently shaped response")]
    Shape { expected: &'static str },

    /// A `Link` continuation pointed away from the configured Canvas origin.
    #[error("refusing to follow continuation to {url}: not on the Canvas origin {origin}")]
    ForeignContinuation { url: String, origin: String },

    #[error("invalid Canvas base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid Canvas configuration: {0}")]
    Config(String),
}

impl CanvasError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CanvasError::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised by the GitHub adapter. These never abort a publish run;
/// the orchestrator records them per repository and moves on.
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("repository {owner}/{repo} not found")]
    NotFound { owner: String, repo: String },

    #[error("GitHub API returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Errors surfaced by the lesson workflow to its caller.
#[derive(Debug, Error)]
pub enum LessonError {
    /// Missing or malformed input; nothing was mutated.
    #[error("{0}")]
    Validation(String),

    #[error("lesson {lesson_id} not found in module {module_id}")]
    LessonNotFound { module_id: u64, lesson_id: u64 },

    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

impl LessonError {
    pub fn is_validation(&self) -> bool {
        matches!(self, LessonError::Validation(_))
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, LessonError::LessonNotFound { .. })
    }
}
