use assert_cmd::Command;
use pdf_upload_core::testing::write_pdf;
use predicates::prelude::*;
use serde_json::json;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pdf_upload() -> Command {
    let mut cmd = Command::cargo_bin("pdf-upload").expect("Binary exists");
    cmd.env_remove("GOOGLE_OAUTH_ACCESS_TOKEN")
        .env_remove("STORAGE_EMULATOR_HOST")
        .env_remove("GCE_METADATA_HOST");
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn uploads_document_and_prints_progress_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b/mx-docs"))
        .and(header("authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "mx-docs"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/storage/v1/b/mx-docs/o"))
        .and(query_param("uploadType", "multipart"))
        .and(header("authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bucket": "mx-docs",
            "name": "incoming/report.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let file = dir.path().join("report.pdf");
    write_pdf(&file, Some("Report Q1")).unwrap();

    pdf_upload()
        .current_dir(dir.path())
        .env("STORAGE_EMULATOR_HOST", server.uri())
        .env("GOOGLE_OAUTH_ACCESS_TOKEN", "cli-token")
        .arg("report.pdf")
        .args(["--dest-path", "gs://mx-docs/incoming"])
        .args(["--user-id", "7"])
        .args(["--tags", "finance", "2024"])
        .assert()
        .success()
        .stdout("Uploading report.pdf to gs://mx-docs/incoming/report.pdf\n");

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("upload request");
    let body = String::from_utf8_lossy(&upload.body);
    assert!(
        body.contains(r#""metadata":{"tags":"finance,2024","title":"Report Q1","user_id":"7"}"#),
        "body was {body}"
    );
    assert!(body.contains(r#""name":"incoming/report.pdf""#), "body was {body}");
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_bucket_exits_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b/mx-docs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let file = dir.path().join("a.pdf");
    write_pdf(&file, None).unwrap();

    pdf_upload()
        .current_dir(dir.path())
        .env("STORAGE_EMULATOR_HOST", server.uri())
        .arg("a.pdf")
        .args(["--dest-path", "gs://mx-docs"])
        .assert()
        .failure()
        .stdout("Uploading a.pdf to gs://mx-docs/a.pdf\n")
        .stderr(predicate::str::contains("bucket mx-docs not found"));
}

#[test]
fn malformed_document_fails_before_upload() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("notes.pdf");
    std::fs::write(&file, b"meeting notes, saved with the wrong extension").unwrap();

    pdf_upload()
        .current_dir(dir.path())
        .env("STORAGE_EMULATOR_HOST", "127.0.0.1:9")
        .arg("notes.pdf")
        .args(["--dest-path", "gs://mx-docs"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("is not a valid PDF document"));
}

#[test]
fn malformed_document_is_reported_before_storage_configuration() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("notes.pdf");
    std::fs::write(&file, b"meeting notes, saved with the wrong extension").unwrap();

    pdf_upload()
        .current_dir(dir.path())
        .env("STORAGE_EMULATOR_HOST", "http://exa mple:99")
        .arg("notes.pdf")
        .args(["--dest-path", "gs://mx-docs"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("is not a valid PDF document"))
        .stderr(predicate::str::contains("STORAGE_EMULATOR_HOST").not());
}

#[test]
fn destination_without_scheme_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.pdf");
    write_pdf(&file, Some("A")).unwrap();

    pdf_upload()
        .current_dir(dir.path())
        .env("STORAGE_EMULATOR_HOST", "127.0.0.1:9")
        .arg("a.pdf")
        .args(["--dest-path", "mx-docs/incoming"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("does not start with gs://"));
}

#[test]
fn dest_path_is_required() {
    pdf_upload()
        .arg("a.pdf")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--dest-path"));
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
#[serial]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use pdf_upload::cli::{run, Cli};

    let cli = Cli {
        filename: std::path::PathBuf::from("does-not-exist.pdf"),
        dest_path: "gs://mx-docs".into(),
        user_id: None,
        tags: vec![],
    };

    let result = run(cli).await;
    assert!(result.is_err(), "a missing file must fail the run");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
