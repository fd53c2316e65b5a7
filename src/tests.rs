//! Integration tests for the SEO publisher backend.

use reqwest::Client;
use serde_json::{json, Value};

use crate::create_router;
use crate::testing::TestEnv;

const TEST_PSK: &str = "test-api-key";
const OPERATOR: &str = "3";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    env: TestEnv,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some(TEST_PSK)).await
    }

    async fn with_psk(psk: Option<&str>) -> Self {
        let env = TestEnv::with_psk(psk).await;
        let app = create_router(env.state.clone());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-operator-id", OPERATOR.parse().unwrap());
        if let Some(key) = psk {
            headers.insert("x-api-key", key.parse().unwrap());
        }

        TestFixture {
            client: Client::builder().default_headers(headers).build().unwrap(),
            base_url,
            env,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/logs"))
        .header("x-operator-id", OPERATOR)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/logs"))
        .header("x-api-key", "wrong-key")
        .header("x-operator-id", OPERATOR)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_bearer_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/logs"))
        .bearer_auth(TEST_PSK)
        .header("x-operator-id", OPERATOR)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_missing_operator_is_rejected() {
    let fixture = TestFixture::with_psk(None).await;

    let resp = Client::new()
        .post(fixture.url("/api/generate/toc"))
        .json(&json!({"title": "Boots"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_generate_categories_end_to_end() {
    let fixture = TestFixture::new().await;
    fixture
        .env
        .respond_to(
            "new post categories",
            "\"Waterproof Hiking Boots\", \"Trail Boot Sizing\", \"Alpine Boot Care\"",
        )
        .await;

    let (status, body) = fixture
        .post_json(
            "/api/generate/categories",
            json!({"title": "Best Hiking Boots 2025"}),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["notice"], "Post draft saved to staging.");
    assert_eq!(body["data"]["categories"].as_array().unwrap().len(), 3);
    let draft_id = body["data"]["stagingPostId"].as_i64().unwrap();

    let (_, posts) = fixture.get_json("/api/staging/posts").await;
    let posts = posts["data"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], draft_id);
    assert_eq!(posts[0]["status"], "draft");
    assert!(posts[0]["content"]
        .as_str()
        .unwrap()
        .contains("Best Hiking Boots 2025"));

    let (_, logs) = fixture.get_json("/api/logs").await;
    let logs = logs["data"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "success");
    assert_eq!(logs[0]["userId"], 3);

    let (_, prefill) = fixture.get_json("/api/publish/draft").await;
    assert_eq!(prefill["data"]["title"], "Best Hiking Boots 2025");
    assert!(prefill["data"]["categories"]
        .as_str()
        .unwrap()
        .contains("Trail Boot Sizing"));
}

#[tokio::test]
async fn test_generate_validation_is_not_audited() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json("/api/generate/categories", json!({"title": "   "}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .post_json("/api/generate/paragraphs", json!({"topic": "ab", "count": 2}))
        .await;
    assert_eq!(status, 400);

    let (_, logs) = fixture.get_json("/api/logs").await;
    assert!(logs["data"].as_array().unwrap().is_empty());
    assert!(fixture.env.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_llm_failure_is_reported_and_audited() {
    let fixture = TestFixture::new().await;
    fixture.env.respond_with_garbage().await;

    let (status, body) = fixture
        .post_json("/api/generate/toc", json!({"title": "Boots"}))
        .await;
    assert_eq!(status, 502);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_RESPONSE");
    assert_eq!(body["error"]["message"], "Invalid API response (HTTP 500)");

    let (_, logs) = fixture.get_json("/api/logs").await;
    let logs = logs["data"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "error");
}

#[tokio::test]
async fn test_toc_then_paragraphs_then_publish() {
    let fixture = TestFixture::new().await;
    fixture
        .env
        .respond_to("H2-level section titles", "Why Boots Matter\nChoosing a Fit")
        .await;
    fixture
        .env
        .respond_to(
            "SEO-optimized sections",
            "<h2>Why Boots Matter</h2><p>They protect.</p><h2>Choosing a Fit</h2><p>Go late.</p>",
        )
        .await;

    let (status, toc) = fixture
        .post_json("/api/generate/toc", json!({"title": "Boots"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        toc["data"]["renderedLinks"][0],
        "<li><a href=\"#why-boots-matter\">Why Boots Matter</a></li>"
    );

    let (status, paragraphs) = fixture
        .post_json(
            "/api/generate/paragraphs",
            json!({"topic": "Boots", "count": 2}),
        )
        .await;
    assert_eq!(status, 200);
    let html = paragraphs["data"]["htmlContent"].as_str().unwrap().to_string();
    assert!(html.contains("<p id=\"choosing-a-fit\">Go late.</p>"));

    let (status, published) = fixture
        .post_json(
            "/api/publish",
            json!({"title": "All About Boots", "content": html, "categories": "Boots, Gear"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(published["data"]["state"], "publishedBoth");
    assert_eq!(published["data"]["post"]["title"], "All About Boots");

    // Generated material is cleared after publishing.
    let (_, prefill) = fixture.get_json("/api/publish/draft").await;
    assert_eq!(prefill["data"]["content"], "");
}

#[tokio::test]
async fn test_publish_duplicate_title() {
    let fixture = TestFixture::new().await;
    let post = json!({"title": "Hiking Boots", "content": "<p>Body</p>", "categories": ""});

    let (status, _) = fixture.post_json("/api/publish", post.clone()).await;
    assert_eq!(status, 200);

    let (status, body) = fixture.post_json("/api/publish", post).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "DUPLICATE_TITLE");

    let (_, posts) = fixture.get_json("/api/staging/posts").await;
    assert_eq!(posts["data"].as_array().unwrap().len(), 1);
    let (_, logs) = fixture.get_json("/api/logs").await;
    assert_eq!(logs["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_publish_requires_title_and_content() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json("/api/publish", json!({"title": "Boots", "content": ""}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "Title and content are required");

    let (status, _) = fixture
        .post_json("/api/publish", json!("not an object"))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_export_empty_store() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/postmeta/export").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NO_DATA");
}

#[tokio::test]
async fn test_import_then_export() {
    let fixture = TestFixture::new().await;
    let post = json!({"title": "Hiking Boots", "content": "<p>Body</p>", "categories": ""});
    fixture.post_json("/api/publish", post).await;

    let (_, posts) = fixture.get_json("/api/staging/posts").await;
    let id = posts["data"][0]["id"].as_i64().unwrap();

    let csv = format!("ID,meta_key,meta_value\n{id},_seo_focus,boots\n424242,_seo_focus,x\n");
    let form = reqwest::multipart::Form::new().part(
        "import_file",
        reqwest::multipart::Part::bytes(csv.into_bytes()).file_name("meta.csv"),
    );
    let resp = fixture
        .client
        .post(fixture.url("/api/postmeta/import"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["imported"], 1);
    assert_eq!(body["data"]["skipped"], 1);
    assert_eq!(body["notice"], "Import complete. 1 entries imported, 1 skipped.");

    let resp = fixture
        .client
        .get(fixture.url("/api/postmeta/export"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/csv; charset=utf-8"
    );
    let disposition = resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"postmeta_export_"));
    let text = resp.text().await.unwrap();
    assert!(text.starts_with("ID,post_title,post_content,post_date,post_status,meta_key,meta_value"));
    assert!(text.contains("_seo_focus,boots"));
}

#[tokio::test]
async fn test_import_without_file() {
    let fixture = TestFixture::new().await;

    let form = reqwest::multipart::Form::new().text("other", "value");
    let resp = fixture
        .client
        .post(fixture.url("/api/postmeta/import"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Please upload a CSV file");
}
