use grabber_engine::{HttpSettings, ReqwestResolver, ResolutionError, Resolver, DEFAULT_FILE_NAME};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GAME_PAGE: &str = r#"<!doctype html>
<html><head>
  <meta name="title" content="Game Title">
  <script>function download(){ window.open('https://cdn.example.com/file.bin') }</script>
</head><body><button onclick="download()">Download</button></body></html>"#;

async fn page_server(route: &str, template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn resolves_title_and_download_url() {
    let server = page_server(
        "/game",
        ResponseTemplate::new(200).set_body_raw(GAME_PAGE, "text/html; charset=utf-8"),
    )
    .await;
    let resolver = ReqwestResolver::new(HttpSettings::default());

    let target = resolver
        .resolve(&format!("{}/game", server.uri()))
        .await
        .expect("resolve ok");

    assert_eq!(target.display_name, "Game Title");
    assert_eq!(target.direct_url, "https://cdn.example.com/file.bin");
    assert!(!target.transfer_id.as_str().is_empty());
}

#[tokio::test]
async fn sends_browser_headers_and_referer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/game"))
        .and(header("referer", "https://source.example/"))
        .and(header("sec-ch-ua-platform", "\"Windows\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(GAME_PAGE, "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let settings = HttpSettings {
        referer: "https://source.example/".to_string(),
        ..HttpSettings::default()
    };
    let resolver = ReqwestResolver::new(settings);
    let target = resolver
        .resolve(&format!("{}/game", server.uri()))
        .await
        .expect("headers matched");
    assert_eq!(target.direct_url, "https://cdn.example.com/file.bin");
}

#[tokio::test]
async fn page_without_pattern_is_not_found() {
    let server = page_server(
        "/plain",
        ResponseTemplate::new(200)
            .set_body_raw("<html><script>var x = 1;</script></html>", "text/html"),
    )
    .await;
    let resolver = ReqwestResolver::new(HttpSettings::default());

    let err = resolver
        .resolve(&format!("{}/plain", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err, ResolutionError::PatternNotFound);
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn non_success_status_is_fetch_failed() {
    let server = page_server("/gone", ResponseTemplate::new(404)).await;
    let resolver = ReqwestResolver::new(HttpSettings::default());

    let err = resolver
        .resolve(&format!("{}/gone", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err, ResolutionError::FetchFailed { status: 404 });
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let resolver = ReqwestResolver::new(HttpSettings::default());
    let err = resolver
        .resolve("http://127.0.0.1:1/game")
        .await
        .unwrap_err();
    assert!(matches!(err, ResolutionError::NetworkError { .. }));
}

#[tokio::test]
async fn unparsable_link_is_network_error() {
    let resolver = ReqwestResolver::new(HttpSettings::default());
    let err = resolver.resolve("not a url").await.unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::NetworkError { ref cause } if cause.starts_with("invalid url")
    ));
}

#[tokio::test]
async fn missing_title_uses_default_name() {
    let server = page_server(
        "/untitled",
        ResponseTemplate::new(200).set_body_raw(
            "<script>function download(){window.open(\"https://cdn.example.com/x.bin\")}</script>",
            "text/html",
        ),
    )
    .await;
    let resolver = ReqwestResolver::new(HttpSettings::default());

    let target = resolver
        .resolve(&format!("{}/untitled", server.uri()))
        .await
        .unwrap();
    assert_eq!(target.display_name, DEFAULT_FILE_NAME);
}
