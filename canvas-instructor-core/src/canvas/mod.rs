//! Canvas LMS access: the paginated client, resource types and the
//! [`CanvasApi`] seam used by the lesson workflow.

pub mod api;
pub mod client;
pub mod form;
pub mod lookup;
pub mod types;

pub use api::CanvasApi;
#[cfg(any(test, feature = "test-export-mocks"))]
pub use api::MockCanvasApi;
pub use client::{CanvasClient, RequestBody};
pub use types::{Assignment, Course, Enrollment, ItemKind, Module, ModuleItem};
