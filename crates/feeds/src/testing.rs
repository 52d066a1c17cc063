//! Local HTTP server helpers for fetcher tests.

use axum::Router;
use std::time::Duration;

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{}", addr)
}

pub fn test_client() -> reqwest::Client {
    crate::http::build_client(Duration::from_secs(5)).expect("test client")
}
