//! Canned shop responses for offline runs

use merchload_http::{HttpMethod, MockResponse};
use serde_json::json;

/// Token handed out by the offline auth mock
pub const OFFLINE_TOKEN: &str = "offline-token";

/// Happy-path responses for every shop endpoint under `base_url`
pub fn offline_mocks(base_url: &str) -> Vec<(HttpMethod, String, MockResponse)> {
    let base = base_url.trim_end_matches('/');
    vec![
        (
            HttpMethod::Post,
            format!("{}/api/auth", base),
            MockResponse::ok(json!({ "token": OFFLINE_TOKEN })),
        ),
        (
            HttpMethod::Get,
            format!("{}/api/buy/", base),
            MockResponse::ok(json!({})),
        ),
        (
            HttpMethod::Post,
            format!("{}/api/sendCoin", base),
            MockResponse::ok(json!({})),
        ),
        (
            HttpMethod::Get,
            format!("{}/api/info", base),
            MockResponse::ok(json!({
                "coins": 1000,
                "inventory": [],
                "coinHistory": { "received": [], "sent": [] }
            })),
        ),
    ]
}
