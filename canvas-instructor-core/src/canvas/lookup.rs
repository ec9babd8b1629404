//! Name-based lookups over Canvas listings. Absence is `Ok(None)`, never an
//! error: callers decide whether a missing course or module is fatal.

use super::api::CanvasApi;
use super::types::{Assignment, Course, Module};
use crate::error::CanvasError;

pub async fn find_course_by_name<C>(canvas: &C, name: &str) -> Result<Option<Course>, CanvasError>
where
    C: CanvasApi + ?Sized,
{
    let courses = canvas.list_courses().await?;
    Ok(courses.into_iter().find(|course| course.name == name))
}

pub async fn find_module_by_name<C>(
    canvas: &C,
    course_id: u64,
    name: &str,
) -> Result<Option<Module>, CanvasError>
where
    C: CanvasApi + ?Sized,
{
    let modules = canvas.list_modules(course_id).await?;
    Ok(modules.into_iter().find(|module| module.name == name))
}

pub async fn find_assignment_by_name<C>(
    canvas: &C,
    course_id: u64,
    name: &str,
) -> Result<Option<Assignment>, CanvasError>
where
    C: CanvasApi + ?Sized,
{
    let assignments = canvas.list_assignments(course_id).await?;
    Ok(assignments
        .into_iter()
        .find(|assignment| assignment.name == name))
}
