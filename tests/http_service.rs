use link_dl::{
    ClientConfig, Completion, Controller, DirectorySink, DownloadReply, Error, HttpLinkService,
    LinkService, LinkSet, Page, PageHandle, RunOutcome, Validation, WorkflowState,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(server: &MockServer) -> HttpLinkService {
    HttpLinkService::new(ClientConfig::new().with_base_url(server.uri())).expect("client builds")
}

fn links() -> LinkSet {
    ["http://bad.com", "http://good.com"].into_iter().collect()
}

#[tokio::test]
async fn validate_sends_numbered_fields_and_parses_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .and(body_string_contains("name=\"link-2\""))
        .and(body_string_contains("http://good.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": [{"url": "http://good.com"}],
            "invalid": [{"url": "http://bad.com", "title": "Bad", "reason": "404"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let validation = service(&server).validate(&links()).await.unwrap();

    let Validation::Checked(outcome) = validation else {
        panic!("expected a classification, got {validation:?}");
    };
    assert_eq!(outcome.valid.len(), 1);
    assert_eq!(outcome.invalid[0].url, "http://bad.com");
    assert_eq!(outcome.invalid[0].reason, "404");
}

#[tokio::test]
async fn validate_error_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let validation = service(&server).validate(&links()).await.unwrap();
    assert_eq!(validation, Validation::Unavailable { status: 404 });
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let svc = HttpLinkService::new(ClientConfig::new().with_base_url("http://127.0.0.1:1"))
        .expect("client builds");

    let err = svc.validate(&links()).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn download_distinguishes_structured_and_binary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .and(body_string_contains("link-1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PK\x03\x04".to_vec(), "application/zip"))
        .mount(&server)
        .await;

    let reply = service(&server).download(&links()).await.unwrap();
    let DownloadReply::Binary(body) = reply else {
        panic!("expected a binary reply, got {reply:?}");
    };
    assert_eq!(&body.into_bytes().await.unwrap()[..], b"PK\x03\x04");

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_file": true,
            "session_id": "abc",
            "successful": [{"title": "A"}],
            "rejected": [{"title": "B"}]
        })))
        .mount(&server)
        .await;

    let DownloadReply::Structured(summary) = service(&server).download(&links()).await.unwrap()
    else {
        panic!("expected a structured reply");
    };
    assert_eq!(summary.archive_session(), Some("abc"));
}

#[tokio::test]
async fn download_error_bodies_become_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "disk full"})))
        .mount(&server)
        .await;

    let reply = service(&server).download(&links()).await.unwrap();
    assert!(matches!(
        reply,
        DownloadReply::Error { status: 500, ref message } if message == "disk full"
    ));

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Traceback: KeyError 'link-1'"))
        .mount(&server)
        .await;

    let DownloadReply::Error { message, .. } = service(&server).download(&links()).await.unwrap()
    else {
        panic!("expected an error reply");
    };
    assert_eq!(message, "Traceback: KeyError 'link-1'");
}

#[tokio::test]
async fn fetch_archive_uses_session_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download_file/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"zip-bytes".to_vec(), "application/zip"))
        .expect(1)
        .mount(&server)
        .await;

    let body = service(&server).fetch_archive("abc").await.unwrap();
    assert_eq!(&body.into_bytes().await.unwrap()[..], b"zip-bytes");
}

#[tokio::test]
async fn fetch_archive_error_status_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download_file/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Not found"})))
        .mount(&server)
        .await;

    let err = service(&server).fetch_archive("gone").await.unwrap_err();
    assert!(matches!(err, Error::Server { status: 404, .. }));
    assert_eq!(err.user_message(), "Not found");
}

#[tokio::test]
async fn status_reports_activity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "idle",
            "active_downloads": 0,
            "has_lock_file": false,
            "recent_activity": false,
            "safe_to_restart": true
        })))
        .mount(&server)
        .await;

    let status = service(&server).status().await.unwrap();
    assert!(!status.is_busy());
    assert!(status.safe_to_restart);
}

fn controller_for(
    server: &MockServer,
    out: &TempDir,
    links: &[&str],
) -> (Controller, PageHandle) {
    let config = ClientConfig::new().with_base_url(server.uri());
    let page = PageHandle::new(Page::with_links(links.iter().copied()));
    let controller = Controller::new(
        HttpLinkService::new(config.clone()).expect("client builds"),
        DirectorySink::new(out.path()),
        page.clone(),
        config,
    );
    (controller, page)
}

#[tokio::test]
async fn structured_run_saves_archive_and_summarises() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": [{"url": "http://good.com"}],
            "invalid": [{"url": "http://bad.com", "title": "Bad", "reason": "404"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .and(body_string_contains("http://bad.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_file": true,
            "session_id": "abc",
            "successful": [{"title": "A"}],
            "rejected": [{"title": "B"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download_file/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PK-zip".to_vec(), "application/zip"))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let (mut controller, page) = controller_for(&server, &out, &["http://bad.com", "http://good.com"]);

    let outcome = controller.submit().await;

    assert!(matches!(
        outcome,
        RunOutcome::Complete(Completion::Summary {
            archive_saved: true,
            ..
        })
    ));
    assert_eq!(
        std::fs::read(out.path().join("link-downloader-files.zip")).unwrap(),
        b"PK-zip"
    );
    let page = page.snapshot();
    let results = page.results.text().unwrap();
    assert!(results.contains("A") && results.contains("B"));
    assert!(page.fields.iter().all(|f| f.value.is_empty()));
    assert_eq!(page.state, WorkflowState::Complete);
}

#[tokio::test]
async fn binary_run_streams_archive_to_disk() {
    let archive: Vec<u8> = (0..=255u8).cycle().take(3 * 1024 * 1024).collect();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(archive.clone(), "application/zip"))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let (mut controller, page) = controller_for(&server, &out, &["http://good.com"]);

    let outcome = controller.submit().await;

    assert_eq!(
        outcome,
        RunOutcome::Complete(Completion::Archive {
            size: archive.len() as u64
        })
    );
    let saved = out.path().join("link-downloader-files.zip");
    assert_eq!(std::fs::read(&saved).unwrap(), archive);
    assert!(!out.path().join("link-downloader-files.zip.part").exists());
    assert!(!page.snapshot().results.is_visible());
}

#[tokio::test]
async fn rejected_run_never_calls_download() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": [],
            "invalid": [{"url": "http://bad.com", "title": "Bad", "reason": "404"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let (mut controller, page) = controller_for(&server, &out, &["http://bad.com"]);

    let outcome = controller.submit().await;

    assert!(matches!(outcome, RunOutcome::RejectedAll { .. }));
    let page = page.snapshot();
    assert_eq!(page.invalid_indices(), vec![0]);
    assert_eq!(page.error.text(), Some("All links were rejected:\nBad: 404"));
    assert!(page.submit.enabled);
}

#[tokio::test]
async fn failed_download_restores_the_control() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "disk full"})))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let (mut controller, page) = controller_for(&server, &out, &["http://good.com"]);

    let outcome = controller.submit().await;

    let RunOutcome::Failed { message } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("disk full"));
    let page = page.snapshot();
    assert_eq!(page.submit.label, "Download");
    assert!(page.submit.enabled);
    assert_eq!(page.fields[0].value, "http://good.com");
    assert!(!out.path().join("link-downloader-files.zip").exists());
}
