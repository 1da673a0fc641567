mod common;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::json;

use shifter::models::{UserProfile, UserRole};
use shifter::payments::{PaymentError, PaymentIntent, PaymentProcessor};

struct FakeProcessor;

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_intent(&self, amount: f64) -> Result<PaymentIntent, PaymentError> {
        Ok(PaymentIntent {
            client_secret: format!("secret_{amount}"),
        })
    }
}

// ── Health & identity ───────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok_with_security_headers() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers()["x-frame-options"], "DENY");
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/api/v1/clients")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    common::cleanup(app).await;
}

// ── Profile ─────────────────────────────────────────────────────

#[tokio::test]
async fn first_request_creates_freelancer_profile() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/api/v1/profile", "alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");
    assert_eq!(body["email"], "alice@test.com");
    assert_eq!(body["role"], "freelancer");
    assert_eq!(body["onboardingCompleted"], false);
    assert_eq!(body["onboardingStep"], 1);

    let (body, status) = app
        .post("/api/v1/profile/onboarding/complete", "alice", &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["onboardingCompleted"], true);
    assert_eq!(body["onboardingStep"], 5);

    let (body, _) = app.get("/api/v1/profile", "alice").await;
    assert_eq!(body["onboardingStep"], 5);

    common::cleanup(app).await;
}

#[tokio::test]
async fn profile_update_ignores_bookkeeping_fields() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .put(
            "/api/v1/profile",
            "alice",
            &json!({ "company": "Acme", "bio": "Builder", "onboardingStep": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company"], "Acme");
    assert_eq!(body["onboardingStep"], 1);

    let (_, status) = app
        .put("/api/v1/profile", "alice", &json!({ "email": "nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn role_self_assignment_excludes_admin() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .put("/api/v1/profile/role", "carol", &json!({ "role": "client" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "client");

    let (_, status) = app
        .put("/api/v1/profile/role", "carol", &json!({ "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn role_changes_persist_for_local_looking_identities() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .put("/api/v1/profile/role", "local-bob", &json!({ "role": "employee" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "employee");

    let (body, status) = app.get("/api/v1/profile", "local-bob").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "employee");
    assert!(app.state.repo::<UserProfile>().outbox().is_empty().await);

    common::cleanup(app).await;
}

#[tokio::test]
async fn avatar_upload_requires_an_image() {
    let app = common::spawn_app().await;

    let body = common::multipart_body(&[("avatar", Some("notes.txt"), Some("text/plain"), b"hi")]);
    let (_, status) = app
        .multipart(Method::PUT, "/api/v1/profile/avatar", "alice", body)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = common::multipart_body(&[("avatar", Some("me.png"), Some("image/png"), b"\x89PNG")]);
    let (profile, status) = app
        .multipart(Method::PUT, "/api/v1/profile/avatar", "alice", body)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["avatar"], "http://localhost/storage/avatars/alice");
    assert!(app.storage_dir.join("avatars/alice").exists());

    common::cleanup(app).await;
}

// ── Clients & employees ─────────────────────────────────────────

#[tokio::test]
async fn client_lifecycle() {
    let app = common::spawn_app().await;

    let client = app.create_client("alice", "Globex").await;
    let id = client["id"].as_str().unwrap();
    assert_eq!(client["status"], "request-sent");
    assert_eq!(client["ownerId"], "alice");
    assert!(
        client["portalUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://shifter.test/portal/client")
    );

    let (list, _) = app.get("/api/v1/clients", "alice").await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (updated, status) = app
        .put(
            &format!("/api/v1/clients/{id}"),
            "alice",
            &json!({ "company": "Globex Corp" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["company"], "Globex Corp");

    let (updated, status) = app
        .put(
            &format!("/api/v1/clients/{id}/status"),
            "alice",
            &json!({ "status": "active" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "active");

    let (body, status) = app.delete(&format!("/api/v1/clients/{id}"), "alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted");

    // Deleting again still succeeds.
    let (_, status) = app.delete(&format!("/api/v1/clients/{id}"), "alice").await;
    assert_eq!(status, StatusCode::OK);

    let (list, _) = app.get("/api/v1/clients", "alice").await;
    assert!(list.as_array().unwrap().is_empty());

    common::cleanup(app).await;
}

#[tokio::test]
async fn clients_are_isolated_per_owner() {
    let app = common::spawn_app().await;

    let client = app.create_client("alice", "Globex").await;
    let id = client["id"].as_str().unwrap();

    let (list, _) = app.get("/api/v1/clients", "bob").await;
    assert!(list.as_array().unwrap().is_empty());

    let (_, status) = app
        .put(&format!("/api/v1/clients/{id}"), "bob", &json!({ "name": "Mine" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app.delete(&format!("/api/v1/clients/{id}"), "bob").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (list, _) = app.get("/api/v1/clients", "alice").await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    app.with_role("root", UserRole::Admin).await;
    let (list, _) = app.get("/api/v1/clients", "root").await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn client_input_is_validated() {
    let app = common::spawn_app().await;

    let (_, status) = app
        .post("/api/v1/clients", "alice", &json!({ "name": "  ", "email": "a@b.co" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app
        .post("/api/v1/employees", "alice", &json!({ "name": "Eve", "email": "eve" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn employees_cannot_manage_people() {
    let app = common::spawn_app().await;
    app.with_role("erin", UserRole::Employee).await;

    let (_, status) = app
        .post(
            "/api/v1/employees",
            "erin",
            &json!({ "name": "Eve", "email": "eve@test.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app.get("/api/v1/employees", "erin").await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

// ── Projects & tasks ────────────────────────────────────────────

#[tokio::test]
async fn project_progress_is_validated_on_update() {
    let app = common::spawn_app().await;

    let project = app.create_project("alice", "Website", None).await;
    let id = project["id"].as_str().unwrap();
    assert_eq!(project["status"], "planning");
    assert_eq!(project["progress"], 0);

    let (_, status) = app
        .put(&format!("/api/v1/projects/{id}"), "alice", &json!({ "progress": 140 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app
        .put(&format!("/api/v1/projects/{id}"), "alice", &json!({ "progress": 40 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"], 40);

    let (body, status) = app
        .put(
            &format!("/api/v1/projects/{id}/status"),
            "alice",
            &json!({ "status": "in-progress" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in-progress");

    common::cleanup(app).await;
}

#[tokio::test]
async fn clients_see_projects_addressed_to_them() {
    let app = common::spawn_app().await;
    app.with_role("carol", UserRole::Client).await;

    app.create_project("alice", "For Carol", Some("carol")).await;
    app.create_project("alice", "Internal", None).await;

    let (list, status) = app.get("/api/v1/projects", "carol").await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "For Carol");

    let (_, status) = app
        .post("/api/v1/projects", "carol", &json!({ "name": "Nope" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn only_the_assignee_moves_a_task() {
    let app = common::spawn_app().await;
    app.with_role("erin", UserRole::Employee).await;
    app.with_role("ed", UserRole::Employee).await;

    let project = app.create_project("alice", "Website", None).await;
    let task = app
        .create_task("alice", project["id"].as_str().unwrap(), "Design", "erin")
        .await;
    let id = task["id"].as_str().unwrap();
    assert_eq!(task["status"], "todo");
    assert_eq!(task["ownerId"], "alice");

    let (list, _) = app.get("/api/v1/tasks", "erin").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    let (list, _) = app.get("/api/v1/tasks", "ed").await;
    assert!(list.as_array().unwrap().is_empty());

    let (_, status) = app
        .put(&format!("/api/v1/tasks/{id}/status"), "ed", &json!({ "status": "done" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app
        .put(&format!("/api/v1/tasks/{id}/status"), "alice", &json!({ "status": "done" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (body, status) = app
        .put(&format!("/api/v1/tasks/{id}/status"), "erin", &json!({ "status": "done" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "done");

    let (list, _) = app.get("/api/v1/tasks", "alice").await;
    assert_eq!(list[0]["status"], "done");

    common::cleanup(app).await;
}

#[tokio::test]
async fn task_assignment_notifies_the_assignee() {
    let app = common::spawn_app().await;

    let project = app.create_project("alice", "Website", None).await;
    app.create_task("alice", project["id"].as_str().unwrap(), "Design", "erin")
        .await;

    let (inbox, status) = app.get("/api/v1/notifications", "erin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["unreadCount"], 1);
    assert_eq!(inbox["notifications"][0]["title"], "New task assigned");
    assert_eq!(inbox["notifications"][0]["type"], "project");

    common::cleanup(app).await;
}

// ── Invoices & payments ─────────────────────────────────────────

#[tokio::test]
async fn invoices_cannot_be_marked_paid_directly() {
    let app = common::spawn_app().await;

    let (_, status) = app
        .post(
            "/api/v1/invoices",
            "alice",
            &json!({ "employeeId": "erin", "amount": 10.0, "invoiceNumber": "INV-1", "status": "paid" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let invoice = app.create_invoice("alice", "erin", 250.0).await;
    let id = invoice["id"].as_str().unwrap();
    assert_eq!(invoice["status"], "pending");

    let (_, status) = app
        .put(&format!("/api/v1/invoices/{id}/status"), "alice", &json!({ "status": "paid" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app
        .put(
            &format!("/api/v1/invoices/{id}/status"),
            "alice",
            &json!({ "status": "overdue" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "overdue");

    common::cleanup(app).await;
}

#[tokio::test]
async fn employees_see_invoices_issued_to_them() {
    let app = common::spawn_app().await;
    app.with_role("erin", UserRole::Employee).await;

    app.create_invoice("alice", "erin", 100.0).await;
    app.create_invoice("alice", "ed", 200.0).await;

    let (list, status) = app.get("/api/v1/invoices", "erin").await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["employeeId"], "erin");

    common::cleanup(app).await;
}

#[tokio::test]
async fn payment_intent_requires_a_processor() {
    let app = common::spawn_app().await;

    let invoice = app.create_invoice("alice", "erin", 100.0).await;
    let id = invoice["id"].as_str().unwrap();

    let (body, status) = app
        .post(&format!("/api/v1/invoices/{id}/payment-intent"), "alice", &json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payments are not configured");

    common::cleanup(app).await;
}

#[tokio::test]
async fn payment_flow_marks_invoice_paid_once() {
    let app = common::spawn_app_with(Some(Arc::new(FakeProcessor))).await;

    let invoice = app.create_invoice("alice", "erin", 100.0).await;
    let id = invoice["id"].as_str().unwrap();

    let (intent, status) = app
        .post(&format!("/api/v1/invoices/{id}/payment-intent"), "alice", &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intent["clientSecret"], "secret_100");

    let (body, status) = app
        .post(
            &format!("/api/v1/invoices/{id}/payment"),
            "alice",
            &json!({ "status": "failed", "message": "Card declined" }),
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "Card declined");

    let (list, _) = app.get("/api/v1/invoices", "alice").await;
    assert_eq!(list[0]["status"], "pending");

    let (body, status) = app
        .post(
            &format!("/api/v1/invoices/{id}/payment"),
            "alice",
            &json!({ "status": "succeeded", "paymentIntentId": "pi_123" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invoice"]["status"], "paid");
    assert_eq!(body["payment"]["status"], "completed");
    assert_eq!(body["payment"]["transactionId"], "pi_123");
    assert_eq!(body["payment"]["amount"], 100.0);

    let (_, status) = app
        .post(
            &format!("/api/v1/invoices/{id}/payment"),
            "alice",
            &json!({ "status": "succeeded" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (inbox, _) = app.get("/api/v1/notifications", "alice").await;
    assert_eq!(inbox["notifications"][0]["title"], "Payment received");
    assert_eq!(inbox["notifications"][0]["priority"], "high");

    common::cleanup(app).await;
}

#[tokio::test]
async fn paid_invoices_keep_their_status() {
    let app = common::spawn_app_with(Some(Arc::new(FakeProcessor))).await;

    let invoice = app.create_invoice("alice", "erin", 60.0).await;
    let id = invoice["id"].as_str().unwrap();

    let (_, status) = app
        .post(
            &format!("/api/v1/invoices/{id}/payment"),
            "alice",
            &json!({ "status": "succeeded" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app
        .put(
            &format!("/api/v1/invoices/{id}/status"),
            "alice",
            &json!({ "status": "pending" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app
        .post(
            &format!("/api/v1/invoices/{id}/payment"),
            "alice",
            &json!({ "status": "succeeded" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (list, _) = app.get("/api/v1/invoices", "alice").await;
    assert_eq!(list[0]["status"], "paid");

    common::cleanup(app).await;
}

// ── Project requests ────────────────────────────────────────────

#[tokio::test]
async fn project_requests_flow_from_client_to_admin() {
    let app = common::spawn_app().await;
    app.with_role("carol", UserRole::Client).await;
    app.with_role("root", UserRole::Admin).await;

    let (_, status) = app
        .post(
            "/api/v1/project-requests",
            "alice",
            &json!({ "projectName": "App", "description": "Mobile app" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (request, status) = app
        .post(
            "/api/v1/project-requests",
            "carol",
            &json!({ "projectName": "App", "description": "Mobile app", "budget": "5k" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "pending");
    assert_eq!(request["clientEmail"], "carol@test.com");
    let id = request["id"].as_str().unwrap();

    let (_, status) = app
        .put(
            &format!("/api/v1/project-requests/{id}/status"),
            "carol",
            &json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (body, status) = app
        .put(
            &format!("/api/v1/project-requests/{id}/status"),
            "root",
            &json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (inbox, _) = app.get("/api/v1/notifications", "carol").await;
    assert_eq!(inbox["notifications"][0]["title"], "Project request updated");

    let (list, _) = app.get("/api/v1/project-requests", "root").await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    common::cleanup(app).await;
}

// ── Files & portal ──────────────────────────────────────────────

#[tokio::test]
async fn uploaded_files_reach_the_portal_once_shared() {
    let app = common::spawn_app().await;
    app.with_role("carol", UserRole::Client).await;

    let body = common::multipart_body(&[
        ("file", Some("brief.pdf"), Some("application/pdf"), b"%PDF-1.4"),
        ("clientId", None, None, b"carol"),
        ("clientName", None, None, b"Carol Co"),
        ("projectName", None, None, b"Website"),
    ]);
    let (file, status) = app.multipart(Method::POST, "/api/v1/files", "alice", body).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {file}");
    assert_eq!(file["name"], "brief.pdf");
    assert_eq!(file["type"], "file");
    assert_eq!(file["size"], 8);
    assert_eq!(file["shared"], false);
    assert_eq!(file["uploadedBy"], "alice");
    let id = file["id"].as_str().unwrap();
    let stored = app.storage_dir.join(file["storagePath"].as_str().unwrap());
    assert!(stored.exists());

    let (portal, _) = app.get("/api/v1/portal/files", "carol").await;
    assert!(portal.as_array().unwrap().is_empty());

    let (shared, status) = app
        .put(&format!("/api/v1/files/{id}/shared"), "alice", &json!({ "shared": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shared["shared"], true);

    let (portal, _) = app.get("/api/v1/portal/files", "carol").await;
    assert_eq!(portal.as_array().unwrap().len(), 1);

    let (inbox, _) = app.get("/api/v1/notifications", "carol").await;
    assert_eq!(inbox["notifications"][0]["type"], "file");

    let (overview, status) = app.get("/api/v1/portal", "carol").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["summary"]["sharedFiles"], 1);

    let (_, status) = app.delete(&format!("/api/v1/files/{id}"), "alice").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!stored.exists());

    let (list, _) = app.get("/api/v1/files", "alice").await;
    assert!(list.as_array().unwrap().is_empty());

    common::cleanup(app).await;
}

#[tokio::test]
async fn upload_requires_client_and_project_names() {
    let app = common::spawn_app().await;

    let body = common::multipart_body(&[
        ("file", Some("brief.pdf"), Some("application/pdf"), b"%PDF"),
        ("clientName", None, None, b"Carol Co"),
    ]);
    let (_, status) = app.multipart(Method::POST, "/api/v1/files", "alice", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app
        .post("/api/v1/files", "alice", &json!({ "name": "not multipart" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

// ── Analytics ───────────────────────────────────────────────────

#[tokio::test]
async fn analytics_overview_is_zero_filled() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/api/v1/analytics?months=3", "alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revenue"]["totalRevenue"], 0.0);
    assert_eq!(body["revenue"]["monthlyRevenue"].as_array().unwrap().len(), 3);
    assert_eq!(body["tasks"]["taskGrowth"].as_array().unwrap().len(), 3);
    assert_eq!(body["files"]["fileUploads"].as_array().unwrap().len(), 3);
    assert!(body["projects"]["projectStatus"].as_array().unwrap().is_empty());

    let (_, status) = app.get("/api/v1/analytics?months=0", "alice").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn analytics_counts_only_the_callers_records() {
    let app = common::spawn_app_with(Some(Arc::new(FakeProcessor))).await;

    let invoice = app.create_invoice("alice", "erin", 120.0).await;
    let id = invoice["id"].as_str().unwrap();
    app.post(
        &format!("/api/v1/invoices/{id}/payment"),
        "alice",
        &json!({ "status": "succeeded" }),
    )
    .await;
    app.create_invoice("bob", "erin", 999.0).await;
    app.create_project("alice", "Website", None).await;

    let (body, _) = app.get("/api/v1/analytics?months=6", "alice").await;
    assert_eq!(body["revenue"]["totalRevenue"], 120.0);
    assert_eq!(body["revenue"]["totalInvoices"], 1);
    assert_eq!(body["revenue"]["monthlyRevenue"][5]["revenue"], 120.0);
    assert_eq!(body["projects"]["projectStatus"][0]["status"], "planning");

    let (counts, status) = app.get("/api/v1/analytics/counts", "alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts["invoices"], 1);
    assert_eq!(counts["projects"], 1);
    assert_eq!(counts["clients"], 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn clients_cannot_read_analytics() {
    let app = common::spawn_app().await;
    app.with_role("carol", UserRole::Client).await;

    let (_, status) = app.get("/api/v1/analytics", "carol").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

// ── Notifications ───────────────────────────────────────────────

#[tokio::test]
async fn notifications_can_be_read_and_cleared() {
    let app = common::spawn_app().await;

    let project = app.create_project("alice", "Website", None).await;
    let project_id = project["id"].as_str().unwrap();
    app.create_task("alice", project_id, "One", "erin").await;
    app.create_task("alice", project_id, "Two", "erin").await;

    let (inbox, _) = app.get("/api/v1/notifications", "erin").await;
    assert_eq!(inbox["unreadCount"], 2);
    let first = inbox["notifications"][0]["id"].as_str().unwrap().to_string();

    let (_, status) = app
        .post(&format!("/api/v1/notifications/{first}/read"), "erin", &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (inbox, _) = app.get("/api/v1/notifications", "erin").await;
    assert_eq!(inbox["unreadCount"], 1);

    let (_, status) = app
        .post("/api/v1/notifications/missing/read", "erin", &json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.post("/api/v1/notifications/read-all", "erin", &json!({})).await;
    let (inbox, _) = app.get("/api/v1/notifications", "erin").await;
    assert_eq!(inbox["unreadCount"], 0);

    let (_, status) = app
        .delete(&format!("/api/v1/notifications/{first}"), "erin")
        .await;
    assert_eq!(status, StatusCode::OK);
    let (inbox, _) = app.get("/api/v1/notifications", "erin").await;
    assert_eq!(inbox["notifications"].as_array().unwrap().len(), 1);

    app.delete("/api/v1/notifications", "erin").await;
    let (inbox, _) = app.get("/api/v1/notifications", "erin").await;
    assert!(inbox["notifications"].as_array().unwrap().is_empty());

    common::cleanup(app).await;
}

// ── Offline & sync ──────────────────────────────────────────────

#[tokio::test]
async fn offline_writes_are_replayed_by_sync() {
    let app = common::spawn_app().await;
    app.get("/api/v1/profile", "alice").await;

    app.store.set_online(false);

    let client = app.create_client("alice", "Offline Co").await;
    let local = client["id"].as_str().unwrap().to_string();
    assert!(local.starts_with("local-"));

    let (list, _) = app.get("/api/v1/clients", "alice").await;
    assert_eq!(list[0]["id"], local.as_str());

    let (report, _) = app.post("/api/v1/sync", "alice", &json!({})).await;
    assert_eq!(report["replayed"], 0);
    assert_eq!(report["pending"], 1);

    app.store.set_online(true);

    let (report, status) = app.post("/api/v1/sync", "alice", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["replayed"], 1);
    assert_eq!(report["pending"], 0);

    let (list, _) = app.get("/api/v1/clients", "alice").await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "Offline Co");
    assert!(!list[0]["id"].as_str().unwrap().starts_with("local-"));

    common::cleanup(app).await;
}
