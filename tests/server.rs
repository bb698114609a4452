mod common;

use std::sync::Arc;

use unity_registry::config::Config;
use unity_registry::server::Registry;

#[tokio::test]
async fn start_scan_stop_round_trip_over_real_sockets() {
    let dir = tempfile::tempdir().unwrap();
    common::write_package_tarball(
        dir.path(),
        "com.x.y-1.2.3.tgz",
        r#"{"name":"com.x.y","version":"1.2.3","description":"d"}"#,
        None,
    );

    let mut config = Config::default();
    config.path = dir.path().to_string_lossy().into_owned();
    // Port 0 lets the OS pick a free port; we can't predict the endpoint
    // ahead of time so this test instead exercises start()/stop() directly
    // against a fixed loopback port unlikely to be in use.
    config.endpoints = vec!["http://127.0.0.1:18181/".to_string()];

    let registry = Arc::new(Registry::new(config));
    registry.scan();
    assert_eq!(registry.catalog_len(), 1);

    registry.start().await.unwrap();
    assert!(registry.is_running());

    let response = reqwest::get("http://127.0.0.1:18181/com.x.y").await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["dist-tags"]["latest"], "1.2.3");

    registry.stop().await.unwrap();
    assert!(!registry.is_running());

    // Starting again on the same port after a clean stop must succeed.
    registry.start().await.unwrap();
    registry.stop().await.unwrap();
}
