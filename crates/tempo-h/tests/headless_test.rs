use serial_test::serial;
use std::sync::Arc;
use tempo_engine::dispatch::{Dispatcher, PageContext, PageDispatcher};
use tempo_engine::request::CapturedRequest;
use tempo_h::{CdpClient, CdpPageContext};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
#[serial]
async fn test_page_dispatch_runs_inside_tab() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let client = match CdpClient::launch(false).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to launch browser (is Chromium installed?): {}", e);
            return;
        }
    };

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lesson"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>lesson</body></html>", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/progress"))
        .and(header("x-tempo-test", "1"))
        .and(body_string(r#"{"ok":true}"#))
        .respond_with(ResponseTemplate::new(202).set_body_string("accepted"))
        .expect(1)
        .mount(&server)
        .await;

    // Same-origin page, so the in-page fetch needs no CORS handling.
    let lesson_url = format!("{}/lesson", server.uri());
    client
        .page
        .goto(lesson_url.as_str())
        .await
        .expect("Navigation failed");

    let context = Arc::new(CdpPageContext::new(client));
    let tab = context.active_tab().await.expect("active tab");
    let tab_url = context.tab_url(&tab).await.expect("tab url");
    assert!(tab_url.ends_with("/lesson"));

    let dispatcher = PageDispatcher::new(Arc::clone(&context));
    let request = CapturedRequest::new(format!("{}/api/progress", server.uri()), "POST")
        .with_header("x-tempo-test", "1")
        .with_body(r#"{"ok":true}"#);
    let outcome = dispatcher.dispatch(&request).await.expect("page dispatch");
    assert_eq!(outcome.status, 202);
    assert_eq!(outcome.body, "accepted");

    drop(dispatcher);
    if let Ok(context) = Arc::try_unwrap(context) {
        context.into_client().close().await.ok();
    }
}
