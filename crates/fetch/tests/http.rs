//! `HttpFetcher` against a local mock server.

use imgbatch_fetch::error::ErrorKind;
use imgbatch_fetch::{FetchRequest, Fetcher, HeaderConstraints, HeaderGenerator, HttpFetcher};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn fetcher() -> HttpFetcher {
    HttpFetcher::new().unwrap().with_backoff(Duration::from_millis(1))
}

fn request(server: &MockServer, route: &str) -> FetchRequest {
    let url = Url::parse(&format!("{}{route}", server.uri())).unwrap();
    FetchRequest::new(url).with_timeout(Duration::from_secs(5))
}

fn image_response() -> ResponseTemplate {
    ResponseTemplate::new(200).insert_header("content-type", "image/png").set_body_bytes(PNG_MAGIC.to_vec())
}

#[tokio::test]
async fn test_fetches_binary_body_with_generated_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat.png"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .respond_with(image_response())
        .expect(1)
        .mount(&server)
        .await;

    let headers = HeaderGenerator::new().generate(&HeaderConstraints::default()).unwrap();
    let body = fetcher().fetch(&request(&server, "/cat.png").with_headers(headers)).await.unwrap();
    assert_eq!(body.as_ref(), PNG_MAGIC);
}

#[tokio::test]
async fn test_retries_transient_status_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky.png"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET")).and(path("/flaky.png")).respond_with(image_response()).expect(1).mount(&server).await;

    let body = fetcher().fetch(&request(&server, "/flaky.png")).await.unwrap();
    assert_eq!(body.as_ref(), PNG_MAGIC);
}

#[tokio::test]
async fn test_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down.png"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = fetcher().fetch(&request(&server, "/down.png").with_retries(2)).await.unwrap_err();
    assert_eq!(*err, ErrorKind::Status(500));
}

#[tokio::test]
async fn test_does_not_retry_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher().fetch(&request(&server, "/missing.png")).await.unwrap_err();
    assert_eq!(*err, ErrorKind::Status(404));
}

#[tokio::test]
async fn test_rejects_text_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>nope</html>", "text/html; charset=utf-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher().fetch(&request(&server, "/page")).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::NotBinary(ct) if ct.starts_with("text/html")), "{:?}", *err);
}

#[tokio::test]
async fn test_rejects_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher().fetch(&request(&server, "/empty")).await.unwrap_err();
    assert_eq!(*err, ErrorKind::EmptyBody);
}

#[tokio::test]
async fn test_times_out_each_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(image_response().set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&server)
        .await;

    let request = request(&server, "/slow.png").with_timeout(Duration::from_millis(50)).with_retries(1);
    let err = fetcher().fetch(&request).await.unwrap_err();
    assert_eq!(*err, ErrorKind::Timeout);
}
