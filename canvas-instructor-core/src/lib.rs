#![doc = "canvas-instructor-core: core logic library for canvas-instructor."]

//! This crate contains the course-publishing logic of canvas-instructor.
//! The CLI and HTTP glue live in the `canvas-instructor` crate.
//!
//! # Layout
//! - [`pagination`] and [`canvas`]: the paginated Canvas request engine and resource API
//! - [`tree`]: rebuilds the two-level lesson tree from flat module items
//! - [`schedule`]: maps curriculum blocks to due dates
//! - [`repo_ref`] and [`github`]: repository discovery and team access grants
//! - [`lesson`]: the publish / unpublish / set-due-date workflow

pub mod canvas;
pub mod config;
pub mod error;
pub mod github;
pub mod lesson;
pub mod pagination;
pub mod repo_ref;
pub mod schedule;
pub mod tree;
