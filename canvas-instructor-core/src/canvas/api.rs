//! # CanvasApi: the resource seam used by the lesson workflow
//!
//! The trait lists exactly the Canvas calls the rest of the crate needs, so the
//! orchestrator can be exercised against a `mockall` mock in tests while the
//! production implementation on [`CanvasClient`] goes through
//! [`CanvasClient::fetch_all`].
//!
//! Updates are sent as bracket-style form bodies, the encoding Canvas documents
//! for its `PUT` endpoints.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::json;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use super::client::{CanvasClient, RequestBody};
use super::form::to_form_pairs;
use super::types::{Assignment, Course, Enrollment, Module, ModuleItem};
use crate::error::CanvasError;

/// Page size requested from list endpoints; Canvas defaults to 10.
const LIST_PAGE_SIZE: u32 = 100;

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CanvasApi: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, CanvasError>;

    async fn list_modules(&self, course_id: u64) -> Result<Vec<Module>, CanvasError>;

    async fn list_module_items(
        &self,
        course_id: u64,
        module_id: u64,
    ) -> Result<Vec<ModuleItem>, CanvasError>;

    async fn set_module_item_published(
        &self,
        course_id: u64,
        module_id: u64,
        item_id: u64,
        published: bool,
    ) -> Result<ModuleItem, CanvasError>;

    async fn list_assignments(&self, course_id: u64) -> Result<Vec<Assignment>, CanvasError>;

    async fn get_assignment(
        &self,
        course_id: u64,
        assignment_id: u64,
    ) -> Result<Assignment, CanvasError>;

    async fn set_assignment_due_at(
        &self,
        course_id: u64,
        assignment_id: u64,
        due_at: DateTime<Utc>,
    ) -> Result<Assignment, CanvasError>;

    async fn list_enrollments(&self, course_id: u64) -> Result<Vec<Enrollment>, CanvasError>;
}

fn list_path(path: &str) -> String {
    format!("{path}?per_page={LIST_PAGE_SIZE}")
}

#[async_trait]
impl CanvasApi for CanvasClient {
    async fn list_courses(&self) -> Result<Vec<Course>, CanvasError> {
        let payload = self
            .fetch_all(Method::GET, &list_path("courses"), None)
            .await?;
        Ok(payload.into_many())
    }

    async fn list_modules(&self, course_id: u64) -> Result<Vec<Module>, CanvasError> {
        let path = list_path(&format!("courses/{course_id}/modules"));
        Ok(self.fetch_all(Method::GET, &path, None).await?.into_many())
    }

    async fn list_module_items(
        &self,
        course_id: u64,
        module_id: u64,
    ) -> Result<Vec<ModuleItem>, CanvasError> {
        let path = list_path(&format!("courses/{course_id}/modules/{module_id}/items"));
        Ok(self.fetch_all(Method::GET, &path, None).await?.into_many())
    }

    async fn set_module_item_published(
        &self,
        course_id: u64,
        module_id: u64,
        item_id: u64,
        published: bool,
    ) -> Result<ModuleItem, CanvasError> {
        let path = format!("courses/{course_id}/modules/{module_id}/items/{item_id}");
        let form = to_form_pairs("module_item", &json!({ "published": published }));
        self.fetch_all(Method::PUT, &path, Some(RequestBody::Form(form)))
            .await?
            .into_one()
    }

    async fn list_assignments(&self, course_id: u64) -> Result<Vec<Assignment>, CanvasError> {
        let path = list_path(&format!("courses/{course_id}/assignments"));
        Ok(self.fetch_all(Method::GET, &path, None).await?.into_many())
    }

    async fn get_assignment(
        &self,
        course_id: u64,
        assignment_id: u64,
    ) -> Result<Assignment, CanvasError> {
        let path = format!("courses/{course_id}/assignments/{assignment_id}");
        self.fetch_all(Method::GET, &path, None).await?.into_one()
    }

    async fn set_assignment_due_at(
        &self,
        course_id: u64,
        assignment_id: u64,
        due_at: DateTime<Utc>,
    ) -> Result<Assignment, CanvasError> {
        let path = format!("courses/{course_id}/assignments/{assignment_id}");
        let due_at = due_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let form = to_form_pairs("assignment", &json!({ "due_at": due_at }));
        self.fetch_all(Method::PUT, &path, Some(RequestBody::Form(form)))
            .await?
            .into_one()
    }

    async fn list_enrollments(&self, course_id: u64) -> Result<Vec<Enrollment>, CanvasError> {
        let path = list_path(&format!("courses/{course_id}/enrollments"));
        Ok(self.fetch_all(Method::GET, &path, None).await?.into_many())
    }
}
