use std::sync::{Arc, Mutex};

use canvas_instructor_core::canvas::{Assignment, ItemKind, MockCanvasApi, ModuleItem};
use canvas_instructor_core::error::{CanvasError, GithubError};
use canvas_instructor_core::github::{MockRepoAccessGranter, RepoDescriptor, RepoOwner};
use canvas_instructor_core::lesson::{
    parse_due_date, GrantTarget, ItemStatus, LessonAction, LessonOrchestrator, LessonRequest,
};
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;

const COURSE: u64 = 1;
const MODULE: u64 = 5;

fn item(id: u64, position: i64, indent: u32, title: &str, kind: ItemKind) -> ModuleItem {
    ModuleItem {
        id,
        module_id: MODULE,
        position,
        title: title.to_string(),
        indent,
        kind,
        content_id: None,
        html_url: None,
        external_url: None,
        published: false,
    }
}

fn assignment_item(id: u64, position: i64, content_id: u64) -> ModuleItem {
    ModuleItem {
        content_id: Some(content_id),
        ..item(id, position, 1, "Homework", ItemKind::Assignment)
    }
}

fn link_item(id: u64, position: i64, url: &str) -> ModuleItem {
    ModuleItem {
        external_url: Some(url.to_string()),
        ..item(id, position, 1, "Starter repo", ItemKind::ExternalUrl)
    }
}

fn assignment(id: u64, description: &str) -> Assignment {
    Assignment {
        id,
        name: "Homework".to_string(),
        description: Some(description.to_string()),
        due_at: None,
        published: false,
        html_url: None,
    }
}

fn server_error() -> CanvasError {
    CanvasError::Transport {
        method: "PUT".into(),
        url: "https://canvas.test/api/v1/courses/1/modules/5/items/2".into(),
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom".into(),
    }
}

fn request(lesson_id: u64, action: &str, due_date: Option<&str>) -> LessonRequest {
    LessonRequest {
        lesson_id,
        action: LessonAction::parse(action),
        due_date: due_date.map(str::to_string),
    }
}

fn target() -> GrantTarget {
    GrantTarget {
        organization: "acme-school".to_string(),
        team: "students".to_string(),
    }
}

fn orchestrator(canvas: MockCanvasApi, github: MockRepoAccessGranter) -> LessonOrchestrator {
    LessonOrchestrator::new(Arc::new(canvas), Arc::new(github), target())
}

/// Records every `(item_id, published)` update and answers with the item.
fn record_publishes(canvas: &mut MockCanvasApi, calls: Arc<Mutex<Vec<(u64, bool)>>>) {
    canvas
        .expect_set_module_item_published()
        .withf(|course, module, _, _| *course == COURSE && *module == MODULE)
        .returning(move |_, _, item_id, published| {
            calls.lock().unwrap().push((item_id, published));
            Ok(ModuleItem {
                published,
                ..item(item_id, 0, 0, "updated", ItemKind::Other)
            })
        });
}

fn accept_all_grants(github: &mut MockRepoAccessGranter, calls: Arc<Mutex<Vec<String>>>) {
    github
        .expect_resolve_repository()
        .returning(|owner, name| {
            Ok(RepoDescriptor {
                id: 1,
                name: name.to_string(),
                full_name: format!("{owner}/{name}"),
                owner: RepoOwner {
                    login: owner.to_string(),
                },
                private: false,
                html_url: None,
            })
        });
    github
        .expect_grant_team_access()
        .returning(move |org, team, owner, repo| {
            calls
                .lock()
                .unwrap()
                .push(format!("{org}/{team}:{owner}/{repo}"));
            Ok(())
        });
}

#[tokio::test]
async fn test_publish_updates_lesson_and_grants_linked_repository() {
    let mut canvas = MockCanvasApi::new();
    canvas
        .expect_list_module_items()
        .withf(|course, module| *course == COURSE && *module == MODULE)
        .times(1)
        .returning(|_, _| {
            Ok(vec![
                item(1, 1, 0, "Block 1", ItemKind::SubHeader),
                assignment_item(2, 2, 10),
            ])
        });
    canvas
        .expect_get_assignment()
        .withf(|course, id| *course == COURSE && *id == 10)
        .times(1)
        .returning(|_, id| {
            Ok(assignment(
                id,
                r#"<p>Fork <a href="https://github.com/acme/proj1">the starter</a></p>"#,
            ))
        });
    let publishes = Arc::new(Mutex::new(Vec::new()));
    record_publishes(&mut canvas, publishes.clone());

    let mut github = MockRepoAccessGranter::new();
    let grants = Arc::new(Mutex::new(Vec::new()));
    accept_all_grants(&mut github, grants.clone());

    let report = orchestrator(canvas, github)
        .update_lesson(COURSE, MODULE, &request(1, "publish", None))
        .await
        .expect("publish should succeed");

    let mut published = publishes.lock().unwrap().clone();
    published.sort();
    assert_eq!(published, vec![(1, true), (2, true)]);
    assert_eq!(
        *grants.lock().unwrap(),
        vec!["acme-school/students:acme/proj1".to_string()]
    );

    assert_eq!(report.lesson_id, 1);
    assert_eq!(report.action, "publish");
    assert!(!report.run_id.is_empty());
    assert_eq!(report.anchor.as_ref().map(|a| a.item_id), Some(1));
    assert_eq!(report.children.len(), 1);
    assert_eq!(report.children[0].status, ItemStatus::Updated);
    assert_eq!(report.grants.len(), 1);
    assert!(report.grants[0].success);
    assert_eq!(report.failures(), 0);
}

#[tokio::test]
async fn test_publish_attempts_every_grant_when_one_fails() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().returning(|_, _| {
        Ok(vec![
            item(1, 1, 0, "Block 2", ItemKind::SubHeader),
            link_item(2, 2, "https://github.com/acme/one"),
            link_item(3, 3, "https://github.com/acme/two.git"),
            // Same repository as item 2; granted once.
            link_item(4, 4, "github.com/acme/one"),
        ])
    });
    let publishes = Arc::new(Mutex::new(Vec::new()));
    record_publishes(&mut canvas, publishes.clone());

    let mut github = MockRepoAccessGranter::new();
    github.expect_resolve_repository().returning(|owner, name| {
        Ok(RepoDescriptor {
            id: 1,
            name: name.to_string(),
            full_name: format!("{owner}/{name}"),
            owner: RepoOwner {
                login: owner.to_string(),
            },
            private: true,
            html_url: None,
        })
    });
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let recorded = attempts.clone();
    github
        .expect_grant_team_access()
        .times(2)
        .returning(move |_, _, _, repo| {
            recorded.lock().unwrap().push(repo.to_string());
            if repo.to_string() == "one" {
                Err(GithubError::Api {
                    status: StatusCode::FORBIDDEN,
                    message: "Must have admin rights".into(),
                })
            } else {
                Ok(())
            }
        });

    let report = orchestrator(canvas, github)
        .update_lesson(COURSE, MODULE, &request(1, "publish", None))
        .await
        .expect("grant failures must not fail the lesson");

    assert_eq!(
        *attempts.lock().unwrap(),
        vec!["one".to_string(), "two".to_string()]
    );
    assert_eq!(publishes.lock().unwrap().len(), 4);
    assert_eq!(report.grants.len(), 2);
    assert!(!report.grants[0].success);
    assert!(report.grants[1].success);
    assert_eq!(report.failures(), 1);
}

#[tokio::test]
async fn test_assignment_fetch_failure_skips_discovery_for_that_child_only() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().returning(|_, _| {
        Ok(vec![
            item(1, 1, 0, "Block 3", ItemKind::SubHeader),
            assignment_item(2, 2, 10),
            link_item(3, 3, "https://github.com/acme/proj2"),
        ])
    });
    canvas
        .expect_get_assignment()
        .withf(|course, id| *course == COURSE && *id == 10)
        .times(1)
        .returning(|_, _| Err(server_error()));
    let publishes = Arc::new(Mutex::new(Vec::new()));
    record_publishes(&mut canvas, publishes.clone());

    let mut github = MockRepoAccessGranter::new();
    let grants = Arc::new(Mutex::new(Vec::new()));
    accept_all_grants(&mut github, grants.clone());

    let report = orchestrator(canvas, github)
        .update_lesson(COURSE, MODULE, &request(1, "publish", None))
        .await
        .expect("a failed assignment fetch must not fail the lesson");

    let mut published = publishes.lock().unwrap().clone();
    published.sort();
    assert_eq!(published, vec![(1, true), (2, true), (3, true)]);
    assert_eq!(
        *grants.lock().unwrap(),
        vec!["acme-school/students:acme/proj2".to_string()]
    );
    assert_eq!(report.children.len(), 2);
    assert!(report
        .children
        .iter()
        .all(|child| child.status == ItemStatus::Updated));
    assert_eq!(report.grants.len(), 1);
    assert_eq!(report.failures(), 0);
}

#[tokio::test]
async fn test_set_due_date_without_date_is_rejected_before_any_call() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().never();
    canvas.expect_set_module_item_published().never();
    canvas.expect_set_assignment_due_at().never();
    let mut github = MockRepoAccessGranter::new();
    github.expect_grant_team_access().never();

    let result = orchestrator(canvas, github)
        .update_lesson(COURSE, MODULE, &request(1, "setDueDate", None))
        .await;

    let err = result.expect_err("missing due date must be rejected");
    assert!(err.is_validation(), "expected validation error, got {err:?}");
}

#[tokio::test]
async fn test_set_due_date_with_malformed_date_is_rejected() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().never();

    let result = orchestrator(canvas, MockRepoAccessGranter::new())
        .update_lesson(COURSE, MODULE, &request(1, "setDueDate", Some("next friday")))
        .await;

    assert!(result.is_err_and(|err| err.is_validation()));
}

#[tokio::test]
async fn test_set_due_date_updates_assignment_children_only() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().returning(|_, _| {
        let mut loose = item(4, 4, 1, "Homework without id", ItemKind::Assignment);
        loose.content_id = None;
        Ok(vec![
            item(1, 1, 0, "Block 1", ItemKind::SubHeader),
            assignment_item(2, 2, 10),
            item(3, 3, 1, "Reading", ItemKind::Page),
            loose,
        ])
    });
    let expected = Utc.with_ymd_and_hms(2025, 5, 4, 23, 59, 0).unwrap();
    canvas
        .expect_set_assignment_due_at()
        .withf(move |course, id, due_at| *course == COURSE && *id == 10 && *due_at == expected)
        .times(1)
        .returning(|_, id, due_at| {
            let mut updated = assignment(id, "");
            updated.due_at = Some(due_at);
            Ok(updated)
        });
    canvas.expect_set_module_item_published().never();

    let report = orchestrator(canvas, MockRepoAccessGranter::new())
        .update_lesson(COURSE, MODULE, &request(1, "set_due_date", Some("2025-05-04")))
        .await
        .expect("due date update should succeed");

    assert!(report.anchor.is_none());
    let statuses: Vec<&ItemStatus> = report.children.iter().map(|c| &c.status).collect();
    assert_eq!(statuses[0], &ItemStatus::Updated);
    assert!(matches!(statuses[1], ItemStatus::Skipped(_)));
    assert!(matches!(statuses[2], ItemStatus::Skipped(_)));
    assert_eq!(report.action, "setDueDate");
}

#[tokio::test]
async fn test_unpublish_does_not_touch_github() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().returning(|_, _| {
        Ok(vec![
            item(1, 1, 0, "Block 1", ItemKind::SubHeader),
            link_item(2, 2, "https://github.com/acme/proj1"),
        ])
    });
    let publishes = Arc::new(Mutex::new(Vec::new()));
    record_publishes(&mut canvas, publishes.clone());
    let mut github = MockRepoAccessGranter::new();
    github.expect_resolve_repository().never();
    github.expect_grant_team_access().never();

    let report = orchestrator(canvas, github)
        .update_lesson(COURSE, MODULE, &request(1, "Unpublish", None))
        .await
        .expect("unpublish should succeed");

    let mut calls = publishes.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, vec![(1, false), (2, false)]);
    assert!(report.grants.is_empty());
}

#[tokio::test]
async fn test_unknown_action_is_a_no_op() {
    let mut canvas = MockCanvasApi::new();
    canvas
        .expect_list_module_items()
        .times(1)
        .returning(|_, _| Ok(vec![item(1, 1, 0, "Block 1", ItemKind::SubHeader)]));
    canvas.expect_set_module_item_published().never();
    canvas.expect_set_assignment_due_at().never();

    let report = orchestrator(canvas, MockRepoAccessGranter::new())
        .update_lesson(COURSE, MODULE, &request(1, "archive", None))
        .await
        .expect("unknown actions still succeed");

    assert_eq!(report.action, "archive");
    assert!(report.anchor.is_none());
    assert!(report.children.is_empty());
    assert_eq!(report.failures(), 0);
}

#[tokio::test]
async fn test_missing_lesson_is_a_lookup_error() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().returning(|_, _| {
        Ok(vec![
            item(1, 1, 0, "Block 1", ItemKind::SubHeader),
            item(2, 2, 1, "Reading", ItemKind::Page),
        ])
    });
    canvas.expect_set_module_item_published().never();

    let result = orchestrator(canvas, MockRepoAccessGranter::new())
        .update_lesson(COURSE, MODULE, &request(2, "publish", None))
        .await;

    let err = result.expect_err("a child id is not a lesson");
    assert!(err.is_lookup());
    assert_eq!(err.to_string(), "lesson 2 not found in module 5");
}

#[tokio::test]
async fn test_anchor_failure_aborts_before_children() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().returning(|_, _| {
        Ok(vec![
            item(1, 1, 0, "Block 1", ItemKind::SubHeader),
            item(2, 2, 1, "Reading", ItemKind::Page),
        ])
    });
    canvas
        .expect_set_module_item_published()
        .withf(|_, _, item_id, _| *item_id == 1)
        .times(1)
        .returning(|_, _, _, _| Err(server_error()));
    canvas
        .expect_set_module_item_published()
        .withf(|_, _, item_id, _| *item_id == 2)
        .never();

    let result = orchestrator(canvas, MockRepoAccessGranter::new())
        .update_lesson(COURSE, MODULE, &request(1, "publish", None))
        .await;

    let err = result.expect_err("anchor failure must abort");
    assert!(!err.is_validation() && !err.is_lookup());
}

#[tokio::test]
async fn test_child_failure_is_recorded_and_siblings_still_update() {
    let mut canvas = MockCanvasApi::new();
    canvas.expect_list_module_items().returning(|_, _| {
        Ok(vec![
            item(1, 1, 0, "Block 1", ItemKind::SubHeader),
            item(2, 2, 1, "Slides", ItemKind::File),
            item(3, 3, 1, "Reading", ItemKind::Page),
        ])
    });
    canvas
        .expect_set_module_item_published()
        .withf(|_, _, item_id, _| *item_id == 2)
        .returning(|_, _, _, _| Err(server_error()));
    canvas
        .expect_set_module_item_published()
        .withf(|_, _, item_id, _| *item_id != 2)
        .times(2)
        .returning(|_, _, item_id, published| {
            Ok(ModuleItem {
                published,
                ..item(item_id, 0, 0, "updated", ItemKind::Other)
            })
        });

    let report = orchestrator(canvas, MockRepoAccessGranter::new())
        .update_lesson(COURSE, MODULE, &request(1, "publish", None))
        .await
        .expect("child failures are best-effort");

    assert_eq!(report.children.len(), 2);
    assert!(report.children[0].is_failed());
    assert_eq!(report.children[1].status, ItemStatus::Updated);
    assert!(report.grants.is_empty());
    assert_eq!(report.failures(), 1);
}

#[tokio::test]
async fn test_module_listing_failure_is_propagated() {
    let mut canvas = MockCanvasApi::new();
    canvas
        .expect_list_module_items()
        .returning(|_, _| Err(server_error()));

    let result = orchestrator(canvas, MockRepoAccessGranter::new())
        .update_lesson(COURSE, MODULE, &request(1, "publish", None))
        .await;

    assert!(result.is_err_and(|err| !err.is_lookup() && !err.is_validation()));
}

#[test]
fn test_lesson_action_parsing_and_wire_names() {
    struct ActionCase {
        raw: &'static str,
        expected: LessonAction,
    }
    let cases = vec![
        ActionCase { raw: "publish", expected: LessonAction::Publish },
        ActionCase { raw: "PUBLISH", expected: LessonAction::Publish },
        ActionCase { raw: "unpublish", expected: LessonAction::Unpublish },
        ActionCase { raw: "setDueDate", expected: LessonAction::SetDueDate },
        ActionCase { raw: "set-due-date", expected: LessonAction::SetDueDate },
        ActionCase { raw: "archive", expected: LessonAction::Unknown("archive".into()) },
    ];
    for case in cases {
        assert_eq!(LessonAction::parse(case.raw), case.expected, "raw '{}'", case.raw);
    }

    let request: LessonRequest =
        serde_json::from_str(r#"{"lessonId": 3, "action": "setDueDate", "dueDate": "2025-05-01"}"#)
            .expect("request should deserialise");
    assert_eq!(request.lesson_id, 3);
    assert_eq!(request.action, LessonAction::SetDueDate);
    assert_eq!(request.due_date.as_deref(), Some("2025-05-01"));
    assert_eq!(
        serde_json::to_value(&request).unwrap()["action"],
        "setDueDate"
    );
}

#[test]
fn test_parse_due_date_accepts_date_and_timestamp() {
    assert_eq!(
        parse_due_date("2025-05-01").unwrap(),
        Utc.with_ymd_and_hms(2025, 5, 1, 23, 59, 0).unwrap()
    );
    assert_eq!(
        parse_due_date("2025-05-01T10:00:00+02:00").unwrap(),
        Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()
    );
    assert!(parse_due_date("01/05/2025").unwrap_err().is_validation());
}
