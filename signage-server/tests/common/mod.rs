#![allow(dead_code)]

use std::time::Duration;

use signage_server::{AppConfig, AppState, serve};
use tokio::net::TcpListener;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const TOKEN_SECRET: &str = "test-token-secret";

pub struct TestServer {
    pub base_url: String,
    pub ws_url: String,
    pub state: AppState,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_address: "127.0.0.1".to_string(),
        rest_port: 0,
        token_secret: TOKEN_SECRET.to_string(),
        admin_api_key: Some(ADMIN_KEY.to_string()),
        ..AppConfig::default()
    }
}

pub async fn start_server(config: AppConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(config);

    let server_state = state.clone();
    tokio::spawn(async move {
        let _ = serve(listener, server_state, std::future::pending()).await;
    });

    TestServer {
        base_url: format!("http://{addr}"),
        ws_url: format!("ws://{addr}/ws"),
        state,
    }
}

/// Polls `condition` every 20ms for up to two seconds.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
