//! # Lesson workflow: publish, unpublish and due dates across Canvas and GitHub
//!
//! A lesson is one node of the module tree (see [`crate::tree`]): an indent-0
//! anchor item plus the items nested under it. [`LessonOrchestrator::update_lesson`]
//! applies one [`LessonAction`] to a lesson:
//!   - `publish`: anchor and every child published, then every repository the
//!     children link to is shared read-only with the configured GitHub team
//!   - `unpublish`: anchor and every child unpublished
//!   - `setDueDate`: every assignment child gets the requested due date
//!
//! # State
//! Nothing is kept between calls. Each call re-reads the module items from
//! Canvas and rebuilds the tree, so re-running an action re-derives the lesson
//! from current remote state.
//!
//! # Failure handling
//! - A missing or unparsable due date is a [`LessonError::Validation`], raised
//!   before any remote call.
//! - An unknown lesson id is a soft [`LessonError::LessonNotFound`].
//! - Failing to read the module items or to update the anchor aborts with
//!   [`LessonError::Canvas`].
//! - Child updates and access grants are best-effort: each failure is logged and
//!   recorded in the [`LessonReport`], and the remaining items are still processed.
//! - Unknown actions are logged and do nothing, yet still report success. This
//!   differs from the due-date rule, which rejects; callers relying on strict
//!   action checking should match on [`LessonAction::Unknown`] themselves.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::canvas::{CanvasApi, ItemKind, ModuleItem};
use crate::error::LessonError;
use crate::github::{grant_pull_access, AccessGrantResult, RepoAccessGranter};
use crate::repo_ref::{extract_repo_ref, RepoRef};
use crate::tree::{ModuleNode, ModuleTree};

/// What to do with a lesson. Parsed leniently from its wire name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LessonAction {
    Publish,
    Unpublish,
    SetDueDate,
    Unknown(String),
}

impl LessonAction {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "publish" => LessonAction::Publish,
            "unpublish" => LessonAction::Unpublish,
            "setduedate" | "set_due_date" | "set-due-date" => LessonAction::SetDueDate,
            _ => LessonAction::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LessonAction::Publish => "publish",
            LessonAction::Unpublish => "unpublish",
            LessonAction::SetDueDate => "setDueDate",
            LessonAction::Unknown(raw) => raw,
        }
    }
}

impl From<String> for LessonAction {
    fn from(raw: String) -> Self {
        LessonAction::parse(&raw)
    }
}

impl From<LessonAction> for String {
    fn from(action: LessonAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for LessonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire payload: `{ "lessonId": 1, "action": "publish", "dueDate": "2025-05-01" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequest {
    pub lesson_id: u64,
    pub action: LessonAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Parses a due date given either as RFC 3339 or as `YYYY-MM-DD`; a bare date
/// means 23:59 UTC on that day.
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, LessonError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        LessonError::Validation(format!(
            "invalid dueDate {raw:?}: expected YYYY-MM-DD or an RFC 3339 timestamp"
        ))
    })?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 0)
        .ok_or_else(|| LessonError::Validation("invalid end-of-day time".into()))?;
    Ok(day.and_time(end_of_day).and_utc())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ItemStatus {
    Updated,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub item_id: u64,
    pub title: String,
    pub kind: ItemKind,
    pub status: ItemStatus,
}

impl ItemOutcome {
    fn new(item: &ModuleItem, status: ItemStatus) -> Self {
        Self {
            item_id: item.id,
            title: item.title.clone(),
            kind: item.kind,
            status,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ItemStatus::Failed(_))
    }
}

/// Per-item record of one lesson update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonReport {
    pub run_id: String,
    pub lesson_id: u64,
    pub action: String,
    /// `None` when the action does not touch the anchor item.
    pub anchor: Option<ItemOutcome>,
    pub children: Vec<ItemOutcome>,
    pub grants: Vec<AccessGrantResult>,
}

impl LessonReport {
    pub fn failures(&self) -> usize {
        let items = self
            .anchor
            .iter()
            .chain(self.children.iter())
            .filter(|outcome| outcome.is_failed())
            .count();
        items + self.grants.iter().filter(|grant| !grant.success).count()
    }
}

/// A [`LessonAction`] with its input already validated.
enum Step {
    Publish,
    Unpublish,
    SetDueDate(DateTime<Utc>),
    Ignore(String),
}

impl Step {
    fn from_request(request: &LessonRequest) -> Result<Self, LessonError> {
        Ok(match &request.action {
            LessonAction::Publish => Step::Publish,
            LessonAction::Unpublish => Step::Unpublish,
            LessonAction::SetDueDate => {
                let raw = request.due_date.as_deref().ok_or_else(|| {
                    LessonError::Validation("dueDate is required for setDueDate".into())
                })?;
                Step::SetDueDate(parse_due_date(raw)?)
            }
            LessonAction::Unknown(raw) => Step::Ignore(raw.clone()),
        })
    }
}

/// GitHub organization and team that receive pull access on publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTarget {
    pub organization: String,
    pub team: String,
}

pub struct LessonOrchestrator {
    canvas: Arc<dyn CanvasApi>,
    github: Arc<dyn RepoAccessGranter>,
    target: GrantTarget,
}

impl LessonOrchestrator {
    pub fn new(
        canvas: Arc<dyn CanvasApi>,
        github: Arc<dyn RepoAccessGranter>,
        target: GrantTarget,
    ) -> Self {
        Self {
            canvas,
            github,
            target,
        }
    }

    pub async fn update_lesson(
        &self,
        course_id: u64,
        module_id: u64,
        request: &LessonRequest,
    ) -> Result<LessonReport, LessonError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "update_lesson",
            %run_id,
            course_id,
            module_id,
            lesson_id = request.lesson_id,
            action = %request.action
        );
        self.run(run_id, course_id, module_id, request)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: String,
        course_id: u64,
        module_id: u64,
        request: &LessonRequest,
    ) -> Result<LessonReport, LessonError> {
        let step = Step::from_request(request)?;

        let items = self
            .canvas
            .list_module_items(course_id, module_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch module items");
                e
            })?;
        let tree = ModuleTree::build(items);
        let node = tree
            .find(request.lesson_id)
            .cloned()
            .ok_or(LessonError::LessonNotFound {
                module_id,
                lesson_id: request.lesson_id,
            })?;
        info!(
            title = %node.item.title,
            children = node.children.len(),
            "Located lesson"
        );

        let mut report = LessonReport {
            run_id,
            lesson_id: request.lesson_id,
            action: request.action.to_string(),
            anchor: None,
            children: Vec::new(),
            grants: Vec::new(),
        };

        match step {
            Step::Publish => {
                let anchor = self
                    .set_anchor_published(course_id, module_id, &node, true)
                    .await?;
                report.anchor = Some(anchor);
                report.children = self
                    .set_children_published(course_id, module_id, &node, true)
                    .await;
                report.grants = self.grant_lesson_repositories(course_id, &node).await;
            }
            Step::Unpublish => {
                let anchor = self
                    .set_anchor_published(course_id, module_id, &node, false)
                    .await?;
                report.anchor = Some(anchor);
                report.children = self
                    .set_children_published(course_id, module_id, &node, false)
                    .await;
            }
            Step::SetDueDate(due_at) => {
                report.children = self.set_children_due_at(course_id, &node, due_at).await;
            }
            Step::Ignore(raw) => {
                warn!(action = %raw, "Unknown lesson action, nothing to do");
            }
        }

        info!(
            failures = report.failures(),
            grants = report.grants.len(),
            "Lesson update finished"
        );
        Ok(report)
    }

    async fn set_anchor_published(
        &self,
        course_id: u64,
        module_id: u64,
        node: &ModuleNode,
        published: bool,
    ) -> Result<ItemOutcome, LessonError> {
        let anchor = &node.item;
        self.canvas
            .set_module_item_published(course_id, module_id, anchor.id, published)
            .await
            .map_err(|e| {
                error!(item_id = anchor.id, published, error = %e, "Failed to update lesson anchor");
                e
            })?;
        info!(item_id = anchor.id, published, "Updated lesson anchor");
        Ok(ItemOutcome::new(anchor, ItemStatus::Updated))
    }

    /// Children are independent remote state, so their updates run concurrently.
    async fn set_children_published(
        &self,
        course_id: u64,
        module_id: u64,
        node: &ModuleNode,
        published: bool,
    ) -> Vec<ItemOutcome> {
        let updates = node.children.iter().map(|child| async move {
            match self
                .canvas
                .set_module_item_published(course_id, module_id, child.id, published)
                .await
            {
                Ok(_) => {
                    info!(item_id = child.id, published, "Updated lesson item");
                    ItemOutcome::new(child, ItemStatus::Updated)
                }
                Err(e) => {
                    warn!(item_id = child.id, published, error = %e, "Failed to update lesson item");
                    ItemOutcome::new(child, ItemStatus::Failed(e.to_string()))
                }
            }
        });
        join_all(updates).await
    }

    async fn set_children_due_at(
        &self,
        course_id: u64,
        node: &ModuleNode,
        due_at: DateTime<Utc>,
    ) -> Vec<ItemOutcome> {
        let updates = node.children.iter().map(|child| async move {
            if child.kind != ItemKind::Assignment {
                return ItemOutcome::new(child, ItemStatus::Skipped("not an assignment".into()));
            }
            let Some(assignment_id) = child.content_id else {
                warn!(item_id = child.id, "Assignment item has no content id");
                return ItemOutcome::new(child, ItemStatus::Skipped("no assignment id".into()));
            };
            match self
                .canvas
                .set_assignment_due_at(course_id, assignment_id, due_at)
                .await
            {
                Ok(_) => {
                    info!(item_id = child.id, assignment_id, %due_at, "Set assignment due date");
                    ItemOutcome::new(child, ItemStatus::Updated)
                }
                Err(e) => {
                    warn!(item_id = child.id, assignment_id, error = %e, "Failed to set assignment due date");
                    ItemOutcome::new(child, ItemStatus::Failed(e.to_string()))
                }
            }
        });
        join_all(updates).await
    }

    /// Collects the repository linked from a child, if any. Lookup failures
    /// only mean no repository for that child.
    async fn discover_repository(&self, course_id: u64, child: &ModuleItem) -> Option<RepoRef> {
        match child.kind {
            ItemKind::ExternalUrl => child.external_url.as_deref().and_then(extract_repo_ref),
            ItemKind::Assignment => {
                let assignment_id = child.content_id?;
                match self.canvas.get_assignment(course_id, assignment_id).await {
                    Ok(assignment) => assignment.description.as_deref().and_then(extract_repo_ref),
                    Err(e) => {
                        warn!(item_id = child.id, assignment_id, error = %e, "Failed to fetch assignment for repository discovery");
                        None
                    }
                }
            }
            _ => None,
        }
    }

    async fn grant_lesson_repositories(
        &self,
        course_id: u64,
        node: &ModuleNode,
    ) -> Vec<AccessGrantResult> {
        let mut repos: Vec<RepoRef> = Vec::new();
        for child in &node.children {
            if let Some(repo) = self.discover_repository(course_id, child).await {
                info!(item_id = child.id, repo = %repo, "Discovered lesson repository");
                if !repos.contains(&repo) {
                    repos.push(repo);
                }
            }
        }

        let mut grants = Vec::with_capacity(repos.len());
        for repo in &repos {
            let grant = grant_pull_access(
                self.github.as_ref(),
                &self.target.organization,
                &self.target.team,
                repo,
            )
            .await;
            grants.push(grant);
        }
        grants
    }
}
