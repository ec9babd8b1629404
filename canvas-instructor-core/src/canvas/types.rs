use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Canvas course. Only the fields this crate reads are modelled; unknown
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub workflow_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub items_count: u32,
}

/// Kind of content a module item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    File,
    Page,
    Discussion,
    Assignment,
    Quiz,
    SubHeader,
    ExternalUrl,
    ExternalTool,
    #[serde(other)]
    Other,
}

/// One flat entry of a module. `indent` is the nesting depth: 0 is a lesson,
/// anything deeper belongs to the lesson above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleItem {
    pub id: u64,
    #[serde(default)]
    pub module_id: u64,
    pub position: i64,
    pub title: String,
    #[serde(default)]
    pub indent: u32,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Id of the underlying assignment, page, file, ... when there is one.
    #[serde(default)]
    pub content_id: Option<u64>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    pub name: String,
    /// HTML description; repository links are discovered in here.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: u64,
    #[serde(rename = "type")]
    pub enrollment_type: String,
    #[serde(default)]
    pub enrollment_state: Option<String>,
    #[serde(default)]
    pub grades: Option<EnrollmentGrades>,
    #[serde(default)]
    pub user: Option<EnrollmentUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentGrades {
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub current_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentUser {
    pub id: u64,
    pub name: String,
}
