//! Finds GitHub repository references in free text.
//!
//! Lesson material links to starter repositories either directly (an
//! `ExternalUrl` module item) or inside an assignment's HTML description.
//! Both go through the same pattern: an optional `http`/`https` scheme,
//! `github.com`, then `<owner>/<repo>` with an optional `.git` suffix.
//! Any other host never matches, including look-alikes such as
//! `notgithub.com` or `github.com.example.org`.
//!
//! Site pages that share the `<segment>/<segment>` shape, such as
//! `github.com/orgs/acme/teams` or `github.com/settings/profile`, are not
//! repositories: a first segment GitHub reserves for its own routes never
//! names an owner.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const REPO_PATTERN: &str = r"(?:^|[^A-Za-z0-9./\-])(?i:https?://)?(?i:www\.)?(?i:github\.com)/([A-Za-z0-9\-]+)/([A-Za-z0-9_.\-]+)";

/// First path segments GitHub keeps for site routes; no account can own them.
const RESERVED_OWNERS: &[&str] = &[
    "about",
    "apps",
    "codespaces",
    "collections",
    "enterprise",
    "explore",
    "features",
    "issues",
    "join",
    "login",
    "marketplace",
    "new",
    "notifications",
    "organizations",
    "orgs",
    "pricing",
    "pulls",
    "search",
    "security",
    "settings",
    "site",
    "sponsors",
    "topics",
    "trending",
    "users",
];

static REPO_REGEX: OnceLock<Regex> = OnceLock::new();

fn repo_regex() -> &'static Regex {
    REPO_REGEX.get_or_init(|| Regex::new(REPO_PATTERN).expect("repository pattern is valid"))
}

/// An `(owner, repository)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// First repository referenced in `text`, if any.
pub fn extract_repo_ref(text: &str) -> Option<RepoRef> {
    extract_repo_refs(text).into_iter().next()
}

/// Every distinct repository referenced in `text`, in order of appearance.
pub fn extract_repo_refs(text: &str) -> Vec<RepoRef> {
    let mut refs: Vec<RepoRef> = Vec::new();
    for captures in repo_regex().captures_iter(text) {
        let (Some(owner), Some(raw_name)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        if is_reserved_owner(owner.as_str()) {
            continue;
        }
        let name = raw_name.as_str().trim_end_matches('.');
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            continue;
        }
        let repo = RepoRef::new(owner.as_str(), name);
        if !refs.contains(&repo) {
            refs.push(repo);
        }
    }
    refs
}

fn is_reserved_owner(owner: &str) -> bool {
    RESERVED_OWNERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(owner))
}
