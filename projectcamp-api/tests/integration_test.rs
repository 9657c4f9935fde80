//! End-to-end tests through the HTTP router
//!
//! Require PostgreSQL (`DATABASE_URL`). Media goes to an in-memory store.
//!
//! Run with: `cargo test --test integration_test`

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{id_of, TestContext, TEST_PASSWORD};
use projectcamp_shared::models::subtask::Subtask;
use projectcamp_shared::models::task::Attachment;
use serde_json::json;

#[tokio::test]
async fn test_healthcheck_envelope() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.send(Method::GET, "/api/v1/healthcheck", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["statusCode"], 200);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.data()["status"], "healthy");
    assert_eq!(response.data()["database"], "connected");
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.send(Method::GET, "/api/v1/projects", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["statusCode"], 401);

    let response = ctx
        .send(Method::GET, "/api/v1/projects", Some("not-a-jwt"), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.send(Method::GET, "/api/v1/nowhere", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

/// A creates a project, adds B as a member; B cannot delete it, A can
#[tokio::test]
async fn test_only_admin_deletes_project() {
    let ctx = TestContext::new().await.unwrap();
    let a = ctx.user().await.unwrap();
    let b = ctx.user().await.unwrap();

    let project_id = ctx.project(&a, "Summer Camp").await;
    ctx.add_member(&a, project_id, &b, "member").await;

    let uri = format!("/api/v1/projects/{}", project_id);

    let response = ctx.send(Method::DELETE, &uri, Some(&b.token), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["success"], false);

    let response = ctx.send(Method::DELETE, &uri, Some(&a.token), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.send(Method::GET, &uri, Some(&a.token), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_listing_shows_role_and_member_count() {
    let ctx = TestContext::new().await.unwrap();
    let a = ctx.user().await.unwrap();
    let b = ctx.user().await.unwrap();

    let project_id = ctx.project(&a, "Listing").await;
    ctx.add_member(&a, project_id, &b, "project admin").await;

    let response = ctx.send(Method::GET, "/api/v1/projects", Some(&b.token), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let projects = response.data().as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["role"], "project admin");
    assert_eq!(projects[0]["project"]["memberCount"], 2);
}

#[tokio::test]
async fn test_non_member_cannot_read_project() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.user().await.unwrap();
    let outsider = ctx.user().await.unwrap();
    let project_id = ctx.project(&owner, "Private").await;

    for uri in [
        format!("/api/v1/projects/{}", project_id),
        format!("/api/v1/projects/{}/members", project_id),
        format!("/api/v1/tasks/{}", project_id),
        format!("/api/v1/notes/{}", project_id),
    ] {
        let response = ctx.send(Method::GET, &uri, Some(&outsider.token), None).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn test_duplicate_member_conflicts() {
    let ctx = TestContext::new().await.unwrap();
    let a = ctx.user().await.unwrap();
    let b = ctx.user().await.unwrap();
    let project_id = ctx.project(&a, "Dupes").await;
    ctx.add_member(&a, project_id, &b, "member").await;

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/projects/{}/members", project_id),
            Some(&a.token),
            Some(json!({ "email": b.user.email })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/projects/{}/members", project_id),
            Some(&a.token),
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/projects/{}/members/{}", project_id, b.id()),
            Some(&a.token),
            Some(json!({ "role": "owner" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);

    let response = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/projects/{}/members/{}", project_id, b.id()),
            Some(&a.token),
            Some(json!({ "role": "project_admin" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["role"], "project admin");
}

#[tokio::test]
async fn test_assignee_must_be_member() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.user().await.unwrap();
    let outsider = ctx.user().await.unwrap();
    let project_id = ctx.project(&owner, "Assign").await;

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            Some(&owner.token),
            Some(json!({ "title": "Pitch tents", "assignedTo": outsider.id() })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errors"][0]["field"], "assignedTo");
}

#[tokio::test]
async fn test_member_toggles_subtask_but_cannot_create_tasks() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.user().await.unwrap();
    let member = ctx.user().await.unwrap();
    let project_id = ctx.project(&admin, "Chores").await;
    ctx.add_member(&admin, project_id, &member, "member").await;

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            Some(&member.token),
            Some(json!({ "title": "Sneaky task" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            Some(&admin.token),
            Some(json!({ "title": "Build fire", "assignedTo": member.id() })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.data()["status"], "todo");
    let task_id = id_of(response.data());

    let subtasks_uri = format!("/api/v1/tasks/{}/t/{}/subtasks", project_id, task_id);
    let response = ctx
        .send(Method::POST, &subtasks_uri, Some(&member.token), Some(json!({ "title": "Wood" })))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send(Method::POST, &subtasks_uri, Some(&admin.token), Some(json!({ "title": "Wood" })))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let subtask_id = id_of(response.data());

    let response = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/tasks/{}/st/{}", project_id, subtask_id),
            Some(&member.token),
            Some(json!({ "isCompleted": true })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["isCompleted"], true);

    let response = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/tasks/{}/st/{}", project_id, subtask_id),
            Some(&member.token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_task_delete_removes_subtasks() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.user().await.unwrap();
    let project_id = ctx.project(&admin, "Cascade").await;

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            Some(&admin.token),
            Some(json!({ "title": "Pack up" })),
        )
        .await;
    let task_id = id_of(response.data());

    for title in ["Tents", "Stoves"] {
        let response = ctx
            .send(
                Method::POST,
                &format!("/api/v1/tasks/{}/t/{}/subtasks", project_id, task_id),
                Some(&admin.token),
                Some(json!({ "title": title })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }
    assert_eq!(Subtask::count_by_task(&ctx.db, task_id).await.unwrap(), 2);

    let task_uri = format!("/api/v1/tasks/{}/t/{}", project_id, task_id);
    let response = ctx.send(Method::DELETE, &task_uri, Some(&admin.token), None).await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(Subtask::count_by_task(&ctx.db, task_id).await.unwrap(), 0);

    let response = ctx.send(Method::GET, &task_uri, Some(&admin.token), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_from_another_project_is_not_found() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.user().await.unwrap();
    let first = ctx.project(&admin, "First").await;
    let second = ctx.project(&admin, "Second").await;

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/tasks/{}", first),
            Some(&admin.token),
            Some(json!({ "title": "Belongs to first" })),
        )
        .await;
    let task_id = id_of(response.data());

    let response = ctx
        .send(
            Method::GET,
            &format!("/api/v1/tasks/{}/t/{}", second, task_id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_multipart_task_attachments() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.user().await.unwrap();
    let member = ctx.user().await.unwrap();
    let project_id = ctx.project(&admin, "Files").await;
    ctx.add_member(&admin, project_id, &member, "member").await;

    let response = ctx
        .send_multipart(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            &admin.token,
            &[("title", "Map the trail"), ("status", "in_progress")],
            &[
                ("attachments", "map.png", "image/png", b"\x89PNG fake".as_slice()),
                ("attachments", "notes.txt", "text/plain", b"north then east".as_slice()),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.data()["status"], "in_progress");

    let attachments = response.data()["attachments"].as_array().unwrap().clone();
    assert_eq!(attachments.len(), 2);
    let task_id = id_of(response.data());

    let stored = ctx.media.stored_ids().await;
    for attachment in &attachments {
        let public_id = attachment["publicId"].as_str().unwrap();
        assert!(stored.iter().any(|id| id == public_id));
    }

    let attachment_id = id_of(&attachments[0]);
    let attachment_uri = format!(
        "/api/v1/tasks/{}/t/{}/attachments/{}",
        project_id, task_id, attachment_id
    );

    // Members who did not create the task may not remove its files
    let response = ctx
        .send(Method::DELETE, &attachment_uri, Some(&member.token), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send(Method::DELETE, &attachment_uri, Some(&admin.token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let deleted = ctx.media.deleted_ids().await;
    assert!(deleted
        .iter()
        .any(|id| id == attachments[0]["publicId"].as_str().unwrap()));
    assert_eq!(Attachment::list_by_task(&ctx.db, task_id).await.unwrap().len(), 1);

    // Deleting the project clears the remaining file from the media host
    let response = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/projects/{}", project_id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let deleted = ctx.media.deleted_ids().await;
    assert!(deleted
        .iter()
        .any(|id| id == attachments[1]["publicId"].as_str().unwrap()));
}

#[tokio::test]
async fn test_update_task_appends_one_attachment() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.user().await.unwrap();
    let project_id = ctx.project(&admin, "Append").await;

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            Some(&admin.token),
            Some(json!({ "title": "Plan menu" })),
        )
        .await;
    let task_id = id_of(response.data());
    let task_uri = format!("/api/v1/tasks/{}/t/{}", project_id, task_id);

    let response = ctx
        .send_multipart(
            Method::PUT,
            &task_uri,
            &admin.token,
            &[("status", "done")],
            &[("attachment", "menu.txt", "text/plain", b"beans".as_slice())],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.data()["status"], "done");
    assert_eq!(response.data()["attachments"].as_array().unwrap().len(), 1);

    let response = ctx
        .send_multipart(
            Method::PUT,
            &task_uri,
            &admin.token,
            &[],
            &[
                ("attachment", "a.txt", "text/plain", b"a".as_slice()),
                ("attachment", "b.txt", "text/plain", b"b".as_slice()),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_media_failure_creates_nothing() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.user().await.unwrap();
    let project_id = ctx.project(&admin, "Broken host").await;

    ctx.media.set_failing(true);
    let response = ctx
        .send_multipart(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            &admin.token,
            &[("title", "Doomed")],
            &[("attachments", "x.txt", "text/plain", b"x".as_slice())],
        )
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    let response = ctx
        .send(
            Method::GET,
            &format!("/api/v1/tasks/{}", project_id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.data().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_notes_are_admin_written_member_read() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.user().await.unwrap();
    let lead = ctx.user().await.unwrap();
    let project_id = ctx.project(&admin, "Notes").await;
    ctx.add_member(&admin, project_id, &lead, "project admin").await;

    let notes_uri = format!("/api/v1/notes/{}", project_id);

    let response = ctx
        .send(Method::POST, &notes_uri, Some(&lead.token), Some(json!({ "content": "Hi" })))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send(
            Method::POST,
            &notes_uri,
            Some(&admin.token),
            Some(json!({ "content": "Bring sunscreen" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = ctx.send(Method::GET, &notes_uri, Some(&lead.token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    let notes = response.data().as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["content"], "Bring sunscreen");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let ctx = TestContext::new().await.unwrap();
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let email = format!("{}@example.com", tag);

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": email,
                "username": format!("c{}", &tag[..12]),
                "password": TEST_PASSWORD,
                "fullName": "New Camper"
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert!(response.data().get("passwordHash").is_none());
    assert_eq!(response.data()["isEmailVerified"], false);

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong-password1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .set_cookies()
        .iter()
        .all(|c| c.contains("HttpOnly")));
    let access = response.cookie("accessToken").unwrap();
    let refresh = response.cookie("refreshToken").unwrap();
    assert_eq!(response.data()["refreshToken"], refresh.as_str());

    // The access cookie alone authenticates
    let request = Request::builder()
        .uri("/api/v1/auth/current-user")
        .header(header::COOKIE, format!("accessToken={}", access))
        .body(Body::empty())
        .unwrap();
    let response = ctx.call(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["email"], email.as_str());

    let refresh_with = |token: String| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/refresh-token")
            .header(header::COOKIE, format!("refreshToken={}", token))
            .body(Body::empty())
            .unwrap()
    };

    let response = ctx.call(refresh_with(refresh.clone())).await;
    assert_eq!(response.status, StatusCode::OK);
    let rotated = response.cookie("refreshToken").unwrap();
    assert_ne!(rotated, refresh);

    // The old refresh token stops working once rotated
    let response = ctx.call(refresh_with(refresh)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = ctx
        .send(Method::POST, "/api/v1/auth/logout", Some(&access), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.cookie("accessToken").as_deref(), Some(""));

    let response = ctx.call(refresh_with(rotated)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_conflict_and_validation() {
    let ctx = TestContext::new().await.unwrap();
    let existing = ctx.user().await.unwrap();

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": existing.user.email,
                "username": "freshname",
                "password": TEST_PASSWORD
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "username": "Bad Name",
                "password": "short"
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!response.body["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_outsider_gets_forbidden_before_body_is_read() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.user().await.unwrap();
    let outsider = ctx.user().await.unwrap();
    let project_id = ctx.project(&owner, "Sealed").await;

    // Bodies that would fail validation still yield 403 for a non-member
    for (method, uri) in [
        (Method::POST, format!("/api/v1/tasks/{}", project_id)),
        (Method::POST, format!("/api/v1/projects/{}/members", project_id)),
        (Method::POST, format!("/api/v1/notes/{}", project_id)),
        (Method::PUT, format!("/api/v1/projects/{}", project_id)),
    ] {
        let response = ctx
            .send(method, &uri, Some(&outsider.token), Some(json!({})))
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{}", uri);
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/tasks/{}", project_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", outsider.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = ctx.call(request).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .send_multipart(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            &outsider.token,
            &[],
            &[("attachments", "a.txt", "text/plain", b"a".as_slice())],
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(ctx.media.stored_ids().await.is_empty());
}

#[tokio::test]
async fn test_update_task_null_unassigns() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.user().await.unwrap();
    let project_id = ctx.project(&admin, "Unassign").await;

    let response = ctx
        .send(
            Method::POST,
            &format!("/api/v1/tasks/{}", project_id),
            Some(&admin.token),
            Some(json!({
                "title": "Fetch water",
                "description": "Two buckets",
                "assignedTo": admin.id()
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let task_uri = format!("/api/v1/tasks/{}/t/{}", project_id, id_of(response.data()));

    // An absent field is left alone
    let response = ctx
        .send(Method::PUT, &task_uri, Some(&admin.token), Some(json!({ "status": "done" })))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.data()["assignedTo"], admin.id().to_string());
    assert_eq!(response.data()["description"], "Two buckets");

    let response = ctx
        .send(
            Method::PUT,
            &task_uri,
            Some(&admin.token),
            Some(json!({ "assignedTo": null, "description": null })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert!(response.data()["assignedTo"].is_null());
    assert!(response.data()["description"].is_null());
    assert_eq!(response.data()["status"], "done");
}

#[tokio::test]
async fn test_change_password_ends_sessions() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.user().await.unwrap();

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": user.user.email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let access = response.cookie("accessToken").unwrap();
    let refresh = response.cookie("refreshToken").unwrap();

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(&access),
            Some(json!({ "oldPassword": TEST_PASSWORD, "newPassword": "newcampfire42" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/refresh-token")
        .header(header::COOKIE, format!("refreshToken={}", refresh))
        .body(Body::empty())
        .unwrap();
    let response = ctx.call(request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
