//! HTTP front door tests: start the server on an ephemeral port with
//! deterministic backends and drive it with a real client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use semantic_server::answer::RetrievalOrchestrator;
use semantic_server::chunk::Segmenter;
use semantic_server::corpus::Corpus;
use semantic_server::embedding::{DisabledEmbedder, Embedder};
use semantic_server::error::{EmbedError, GenerationError};
use semantic_server::generation::Generator;
use semantic_server::server::{serve, AppState, NO_FILE_PART, ROOT_MESSAGE, UPLOAD_SUCCESS};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// ─── Test Backends ──────────────────────────────────────────────────

struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    fn dims(&self) -> usize {
        26
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for c in t.chars().filter(|c| c.is_ascii_alphabetic()) {
                    v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Answers with the number of prompt lines so responses are deterministic.
struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        Ok(format!("answered from {} prompt lines", prompt.lines().count()))
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Transport("connection refused".to_string()))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

const SEED: &str = "The sky is blue. Water boils at 100 degrees Celsius.";

struct TestServer {
    base: String,
    corpus: Arc<Corpus>,
    client: reqwest::Client,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn stats(&self) -> Value {
        self.client
            .get(self.url("/stats"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

async fn start_server(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> TestServer {
    let corpus = Arc::new(Corpus::new(Segmenter::default(), embedder));
    if corpus.embedder().model_name() == "letters" {
        corpus.ingest(SEED).await.unwrap();
    }

    let rag = RetrievalOrchestrator::new(corpus.clone(), generator, Duration::from_secs(5));
    let state = AppState::new(rag);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, state, 1024 * 1024, std::future::pending())
            .await
            .ok();
    });

    TestServer {
        base: format!("http://{}", addr),
        corpus,
        client: reqwest::Client::new(),
    }
}

async fn default_server() -> TestServer {
    start_server(Arc::new(LetterEmbedder), Arc::new(EchoGenerator)).await
}

fn text_file(name: &str, body: &str) -> Part {
    Part::bytes(body.as_bytes().to_vec())
        .file_name(name.to_string())
        .mime_str("text/plain")
        .unwrap()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_root_reports_liveness() {
    let srv = default_server().await;
    let resp = srv.client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Semantic server is up");
    assert_eq!(body["message"], ROOT_MESSAGE);
}

#[tokio::test]
async fn test_health_and_stats() {
    let srv = default_server().await;
    let resp = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let stats = srv.stats().await;
    assert_eq!(stats["rows"], 1);
    assert_eq!(stats["chunks"], 1);
    assert_eq!(stats["dims"], 26);
    assert_eq!(stats["model"], "letters");
}

#[tokio::test]
async fn test_upload_txt_grows_corpus() {
    let srv = default_server().await;
    let form = Form::new().part(
        "file",
        text_file("notes.txt", "Rust compiles to native code.\n\nTokio runs async tasks."),
    );

    let resp = srv
        .client
        .post(srv.url("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], UPLOAD_SUCCESS);
    assert_eq!(body["indexed"], json!(["notes.txt"]));
    assert_eq!(body["skipped"], json!([]));
    assert!(body["chunks_added"].as_u64().unwrap() >= 1);

    let stats = srv.stats().await;
    assert!(stats["chunks"].as_u64().unwrap() > 1);
    assert_eq!(stats["rows"], stats["chunks"]);

    let hits = srv
        .corpus
        .search("Tokio runs async tasks.", 1)
        .await
        .unwrap();
    assert!(hits[0].text.contains("Tokio"));
}

#[tokio::test]
async fn test_upload_pdf_is_skipped_without_error() {
    let srv = default_server().await;
    let before = srv.stats().await;

    let part = Part::bytes(b"%PDF-1.4 binary".to_vec())
        .file_name("report.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let resp = srv
        .client
        .post(srv.url("/upload"))
        .multipart(Form::new().part("file", part))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Indexed successfully");
    assert_eq!(body["indexed"], json!([]));
    assert_eq!(body["skipped"], json!(["report.pdf"]));
    assert_eq!(body["chunks_added"], 0);
    assert_eq!(srv.stats().await, before);
}

#[tokio::test]
async fn test_upload_mixed_files_indexes_only_txt() {
    let srv = default_server().await;
    let form = Form::new()
        .part("file", text_file("a.TXT", "uppercase extension still counts"))
        .part("file", text_file("b.md", "# markdown is skipped"))
        .part("file", text_file("c.txt", "another plain text file"));

    let resp = srv
        .client
        .post(srv.url("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["indexed"], json!(["a.TXT", "c.txt"]));
    assert_eq!(body["skipped"], json!(["b.md"]));
    assert_eq!(srv.corpus.len().await, 3);
}

#[tokio::test]
async fn test_upload_without_file_part_is_rejected() {
    let srv = default_server().await;
    let form = Form::new().text("note", "just a text field");

    let resp = srv
        .client
        .post(srv.url("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], NO_FILE_PART);
    assert_eq!(body["code"], "bad_request");
    assert_eq!(srv.corpus.len().await, 1);
}

#[tokio::test]
async fn test_upload_non_multipart_is_rejected() {
    let srv = default_server().await;
    let resp = srv
        .client
        .post(srv.url("/upload"))
        .json(&json!({"file": "not multipart"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], NO_FILE_PART);
}

#[tokio::test]
async fn test_upload_with_unavailable_embedder_is_503() {
    let srv = start_server(Arc::new(DisabledEmbedder), Arc::new(EchoGenerator)).await;
    let form = Form::new().part("file", text_file("notes.txt", "some text to embed"));

    let resp = srv
        .client
        .post(srv.url("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "embedding_unavailable");
    assert!(srv.corpus.is_empty().await);
}

#[tokio::test]
async fn test_query_missing_field_is_rejected() {
    let srv = default_server().await;
    let before = srv.stats().await;

    let resp = srv
        .client
        .post(srv.url("/query"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "bad_request");
    assert_eq!(srv.stats().await, before);
}

#[tokio::test]
async fn test_query_blank_is_rejected() {
    let srv = default_server().await;
    let resp = srv
        .client
        .post(srv.url("/query"))
        .json(&json!({"query": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_query_returns_echo_and_response() {
    let srv = default_server().await;
    let resp = srv
        .client
        .post(srv.url("/query"))
        .json(&json!({"query": "What color is the sky?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["context"], "What color is the sky?");
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("answered from"));
}

#[tokio::test]
async fn test_query_generation_failure_is_502() {
    let srv = start_server(Arc::new(LetterEmbedder), Arc::new(FailingGenerator)).await;
    let resp = srv
        .client
        .post(srv.url("/query"))
        .json(&json!({"query": "What color is the sky?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "generation_failed");
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_upload_invalid_utf8_rejects_whole_request() {
    let srv = default_server().await;
    let before = srv.corpus.len().await;

    let bad = Part::bytes(vec![0xff, 0xfe, 0xfd])
        .file_name("bad.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = Form::new()
        .part("file", text_file("good.txt", "perfectly fine text"))
        .part("file", bad);

    let resp = srv
        .client
        .post(srv.url("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "bad_request");
    assert!(body["error"].as_str().unwrap().contains("bad.txt"));
    assert_eq!(srv.corpus.len().await, before);
    assert_eq!(srv.corpus.chunks().await, vec![SEED]);
}
