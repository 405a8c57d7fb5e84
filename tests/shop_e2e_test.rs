//! Shop scenario against a live HTTP server


use merchload_config::ScenarioConfig;
use merchload_http::HttpManager;
use merchload_metrics::Metrics;
use merchload_runtime::{Scenario, VuContext};
use merchload_scenario::{checks, series, ShopScenario};
use mock_shop::{closed_port, start_shop, AuthMode, CATALOG};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn scenario_for(addr: SocketAddr, configure: impl FnOnce(&mut ScenarioConfig)) -> ShopScenario {
    let mut config = ScenarioConfig {
        base_url: format!("http://{}", addr),
        ..Default::default()
    };
    configure(&mut config);
    ShopScenario::new(config, Arc::new(HttpManager::new().unwrap()))
}

fn samples(metrics: &Metrics) -> [u64; 4] {
    [
        metrics.trend_count(series::AUTH),
        metrics.trend_count(series::BUY_ITEM),
        metrics.trend_count(series::SEND_COIN),
        metrics.trend_count(series::INFO),
    ]
}

#[tokio::test]
async fn test_authenticated_iteration_hits_every_endpoint() {
    let (addr, shop) = start_shop(AuthMode::Token, Duration::ZERO).await.unwrap();
    let scenario = scenario_for(addr, |_| {});
    let vu = VuContext::new(5, Metrics::new());

    let started = Instant::now();
    scenario.iteration(&vu).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));

    let requests = shop.requests();
    let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths.len(), 4);
    assert_eq!(paths[0], "/api/auth");
    assert!(CATALOG.contains(&paths[1].trim_start_matches("/api/buy/")));
    assert_eq!(paths[2], "/api/sendCoin");
    assert_eq!(paths[3], "/api/info");

    assert_eq!(
        requests[0].body,
        Some(json!({"username": "user_5", "password": "password"}))
    );
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(
        requests[2].body,
        Some(json!({"toUser": "receiver", "amount": 0}))
    );
    assert_eq!(requests[2].content_type.as_deref(), Some("application/json"));
    for request in &requests[1..] {
        assert_eq!(request.authorization.as_deref(), Some("token-user_5"));
    }

    assert_eq!(samples(&vu.metrics), [1, 1, 1, 1]);
    for check in [
        checks::AUTH_STATUS,
        checks::BUY_ITEM_STATUS,
        checks::SEND_COIN_STATUS,
        checks::INFO_STATUS,
    ] {
        assert_eq!(vu.metrics.check_stats(check).passes, 1, "{}", check);
    }
}

#[tokio::test]
async fn test_rejected_auth_stops_the_iteration() {
    let (addr, shop) = start_shop(AuthMode::Unauthorized, Duration::ZERO)
        .await
        .unwrap();
    let scenario = scenario_for(addr, |_| {});
    let vu = VuContext::new(1, Metrics::new());

    let started = Instant::now();
    scenario.iteration(&vu).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));

    assert_eq!(shop.requests().len(), 1);
    assert_eq!(samples(&vu.metrics), [1, 0, 0, 0]);
    assert_eq!(vu.metrics.check_stats(checks::AUTH_STATUS).fails, 1);
}

#[tokio::test]
async fn test_tokenless_auth_sends_empty_authorization() {
    let (addr, shop) = start_shop(AuthMode::NoToken, Duration::ZERO).await.unwrap();
    let scenario = scenario_for(addr, |c| c.think_time = Duration::ZERO);
    let vu = VuContext::new(2, Metrics::new());

    scenario.iteration(&vu).await.unwrap();

    let requests = shop.requests();
    assert_eq!(requests.len(), 4);
    for request in &requests[1..] {
        assert_eq!(request.authorization.as_deref(), Some(""));
    }
    assert_eq!(samples(&vu.metrics), [1, 1, 1, 1]);
    assert_eq!(vu.metrics.check_stats(checks::BUY_ITEM_STATUS).fails, 1);
    assert_eq!(vu.metrics.check_stats(checks::SEND_COIN_STATUS).fails, 1);
    assert_eq!(vu.metrics.check_stats(checks::INFO_STATUS).fails, 1);
}

#[tokio::test]
async fn test_tokenless_auth_with_required_token() {
    let (addr, shop) = start_shop(AuthMode::NoToken, Duration::ZERO).await.unwrap();
    let scenario = scenario_for(addr, |c| {
        c.think_time = Duration::ZERO;
        c.require_token = true;
    });
    let vu = VuContext::new(2, Metrics::new());

    scenario.iteration(&vu).await.unwrap();

    assert_eq!(shop.requests().len(), 1);
    assert_eq!(vu.metrics.check_stats(checks::AUTH_TOKEN).fails, 1);
}

#[tokio::test]
async fn test_unreachable_shop_records_failed_auth() {
    let addr = closed_port().await.unwrap();
    let scenario = scenario_for(addr, |c| c.think_time = Duration::ZERO);
    let vu = VuContext::new(1, Metrics::new());

    assert!(scenario.iteration(&vu).await.is_ok());
    assert_eq!(samples(&vu.metrics), [1, 0, 0, 0]);
    assert_eq!(vu.metrics.check_stats(checks::AUTH_STATUS).fails, 1);
}

#[tokio::test]
async fn test_setup_logs_the_receiver_in() {
    let (addr, shop) = start_shop(AuthMode::Token, Duration::ZERO).await.unwrap();
    let scenario = scenario_for(addr, |_| {});

    scenario.setup().await.unwrap();

    let auths = shop.on_path("/api/auth");
    assert_eq!(auths.len(), 1);
    assert_eq!(auths[0].body.as_ref().unwrap()["username"], "receiver");
}
