use ropatch_core::{FetchClass, PatchServer};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn download_writes_body_and_returns_byte_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patch/a.grf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let target = dir.path().join("a.grf");
    let client = PatchServer::with_base_url(&server.uri()).unwrap();

    let written = client.download_to_path("/patch/a.grf", &target).await.unwrap();

    assert_eq!(written, 5);
    assert_eq!(std::fs::read(&target).unwrap(), b"hello");
}

#[tokio::test]
async fn download_creates_missing_parent_directories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patch/data/nested.grf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let target = dir.path().join("data/nested.grf");
    let client = PatchServer::with_base_url(&server.uri()).unwrap();

    client
        .download_to_path("/patch/data/nested.grf", &target)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"x");
}

#[tokio::test]
async fn download_fully_replaces_previous_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patch/a.grf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let target = dir.path().join("a.grf");
    std::fs::write(&target, b"much longer stale content").unwrap();
    let client = PatchServer::with_base_url(&server.uri()).unwrap();

    client.download_to_path("/patch/a.grf", &target).await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"new");
    // Only the final file remains; the .partial sibling is gone.
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn missing_resource_classifies_as_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patch/gone.grf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let target = dir.path().join("gone.grf");
    let client = PatchServer::with_base_url(&server.uri()).unwrap();

    let err = client
        .download_to_path("/patch/gone.grf", &target)
        .await
        .expect_err("expected 404 to fail");

    assert!(err.is_not_found());
    assert_eq!(err.classification(), FetchClass::NotFound);
    assert!(!target.exists());
}

#[tokio::test]
async fn server_error_classifies_as_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patch/a.grf"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let client = PatchServer::with_base_url(&server.uri()).unwrap();

    let err = client
        .download_to_path("/patch/a.grf", &dir.path().join("a.grf"))
        .await
        .expect_err("expected 503 to fail");

    assert_eq!(err.classification(), FetchClass::Transient);
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn connection_failure_classifies_as_transient() {
    // Nothing listens on this port.
    let client = PatchServer::with_base_url("http://127.0.0.1:9").unwrap();
    let dir = tempdir().unwrap();

    let err = client
        .download_to_path("/patch/a.grf", &dir.path().join("a.grf"))
        .await
        .expect_err("expected connection failure");

    assert_eq!(err.classification(), FetchClass::Transient);
}
