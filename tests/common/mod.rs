use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use shifter::cache::MemoryCache;
use shifter::config::{Config, StoreBackend};
use shifter::models::{UserProfile, UserRole};
use shifter::payments::PaymentProcessor;
use shifter::state::SharedState;
use shifter::store::MemoryDocumentStore;

pub const BOUNDARY: &str = "shifter-test-boundary";

/// A running test server backed by the in-memory document store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: MemoryDocumentStore,
    pub state: SharedState,
    pub storage_dir: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn as_user(&self, builder: RequestBuilder, user: &str) -> RequestBuilder {
        builder
            .header("x-shifter-user-id", user)
            .header("x-shifter-user-email", format!("{user}@test.com"))
            .header("x-shifter-user-name", user)
    }

    async fn send(builder: RequestBuilder) -> (Value, StatusCode) {
        let resp = builder.send().await.expect("request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get(&self, path: &str, user: &str) -> (Value, StatusCode) {
        Self::send(self.as_user(self.client.get(self.url(path)), user)).await
    }

    pub async fn post(&self, path: &str, user: &str, body: &Value) -> (Value, StatusCode) {
        Self::send(self.as_user(self.client.post(self.url(path)), user).json(body)).await
    }

    pub async fn put(&self, path: &str, user: &str, body: &Value) -> (Value, StatusCode) {
        Self::send(self.as_user(self.client.put(self.url(path)), user).json(body)).await
    }

    pub async fn delete(&self, path: &str, user: &str) -> (Value, StatusCode) {
        Self::send(self.as_user(self.client.delete(self.url(path)), user)).await
    }

    /// Send a `multipart/form-data` body built by [`multipart_body`].
    pub async fn multipart(
        &self,
        method: reqwest::Method,
        path: &str,
        user: &str,
        body: Vec<u8>,
    ) -> (Value, StatusCode) {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body);
        Self::send(self.as_user(builder, user)).await
    }

    /// Make sure `user` has a profile with `role`.
    pub async fn with_role(&self, user: &str, role: UserRole) {
        let (_, status) = self.get("/api/v1/profile", user).await;
        assert_eq!(status, StatusCode::OK, "profile bootstrap failed");
        self.state
            .repo::<UserProfile>()
            .set_status(user, &role)
            .await
            .expect("role change failed");
    }

    pub async fn create_client(&self, user: &str, name: &str) -> Value {
        let (body, status) = self
            .post(
                "/api/v1/clients",
                user,
                &json!({ "name": name, "email": format!("{}@client.test", name.to_lowercase()) }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create client failed: {body}");
        body
    }

    pub async fn create_project(&self, user: &str, name: &str, client_id: Option<&str>) -> Value {
        let mut req = json!({ "name": name, "clientName": "Acme", "budget": 1000.0 });
        if let Some(client_id) = client_id {
            req["clientId"] = json!(client_id);
        }
        let (body, status) = self.post("/api/v1/projects", user, &req).await;
        assert_eq!(status, StatusCode::OK, "create project failed: {body}");
        body
    }

    pub async fn create_task(&self, user: &str, project_id: &str, title: &str, assignee: &str) -> Value {
        let (body, status) = self
            .post(
                "/api/v1/tasks",
                user,
                &json!({
                    "projectId": project_id,
                    "title": title,
                    "assigneeId": assignee,
                    "assigneeName": assignee,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create task failed: {body}");
        body
    }

    pub async fn create_invoice(&self, user: &str, employee: &str, amount: f64) -> Value {
        let (body, status) = self
            .post(
                "/api/v1/invoices",
                user,
                &json!({
                    "employeeId": employee,
                    "employeeName": employee,
                    "amount": amount,
                    "invoiceNumber": format!("INV-{}", Uuid::now_v7().simple()),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create invoice failed: {body}");
        body
    }
}

/// One part of a multipart body: `(name, filename, content type, bytes)`.
pub type Part<'a> = (&'a str, Option<&'a str>, Option<&'a str>, &'a [u8]);

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
            ),
        }
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn test_config(storage_dir: PathBuf) -> Config {
    Config {
        store: StoreBackend::Memory,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        portal_base_url: "https://shifter.test/portal".to_string(),
        cache_dir: storage_dir.join("cache"),
        storage_base_url: "http://localhost/storage".to_string(),
        storage_dir,
        payment_url: None,
        sync_interval: Duration::from_secs(3600),
        max_upload_size: 1_048_576,
        log_level: "warn".to_string(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(None).await
}

/// Spawn a test app, optionally with a payment processor double.
pub async fn spawn_app_with(payments: Option<Arc<dyn PaymentProcessor>>) -> TestApp {
    let storage_dir = std::env::temp_dir().join(format!("shifter_test_{}", Uuid::now_v7().simple()));
    let store = MemoryDocumentStore::new();

    let mut state = shifter::build_state(
        test_config(storage_dir.clone()),
        Arc::new(store.clone()),
        Arc::new(MemoryCache::new()),
    );
    Arc::get_mut(&mut state)
        .expect("state is not shared yet")
        .payments = payments;

    let app = shifter::build_app(state.clone());

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        store,
        state,
        storage_dir,
    }
}

/// Remove the app's storage directory.
pub async fn cleanup(app: TestApp) {
    let _ = tokio::fs::remove_dir_all(&app.storage_dir).await;
}
