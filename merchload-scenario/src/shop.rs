//! Shop iteration driver

use crate::{checks, series};
use async_trait::async_trait;
use merchload_config::ScenarioConfig;
use merchload_http::{HttpClient, HttpError, HttpRequest, HttpResponse};
use merchload_metrics::{Metrics, HTTP_REQS};
use merchload_runtime::{Scenario, VuContext};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of the login call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// 200 with a string `token`
    Token(String),
    /// 200 whose body carries no string `token`
    MissingToken,
    /// Any other status, or no response at all
    Failed,
}

/// The merch shop workload.
///
/// Holds only configuration and a shared client, so one instance serves
/// every VU.
pub struct ShopScenario {
    config: ScenarioConfig,
    base_url: String,
    client: Arc<dyn HttpClient>,
}

impl ShopScenario {
    pub fn new(config: ScenarioConfig, client: Arc<dyn HttpClient>) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            config,
            base_url,
            client,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Login name of a VU
    pub fn username(&self, vu_id: usize) -> String {
        format!("{}{}", self.config.user_prefix, vu_id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One catalog entry, chosen uniformly
    pub fn pick_item(&self) -> &str {
        let index = fastrand::usize(..self.config.items.len().max(1));
        self.config
            .items
            .get(index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Send a request, record its duration into `series` and its status
    /// into `check`. Returns the response when one arrived.
    async fn timed(
        &self,
        metrics: &Metrics,
        series: &str,
        check: &str,
        request: HttpRequest,
    ) -> Option<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();

        let started = Instant::now();
        let result = self.client.send(request).await;
        metrics.add_trend(series, started.elapsed());
        metrics.incr(HTTP_REQS);

        match result {
            Ok(response) => {
                if !metrics.check(check, response.status == 200) {
                    debug!(
                        status = response.status,
                        errors = response.json_str("errors").unwrap_or_default(),
                        "{} {} failed check '{}'",
                        method,
                        url,
                        check
                    );
                }
                Some(response)
            }
            Err(e) => {
                metrics.check(check, false);
                log_transport_error(&e, &method.to_string(), &url);
                None
            }
        }
    }

    /// POST /api/auth
    pub async fn auth(&self, metrics: &Metrics, username: &str, password: &str) -> AuthOutcome {
        let request = HttpRequest::post(self.url("/api/auth"))
            .json(json!({ "username": username, "password": password }));

        let response = match self
            .timed(metrics, series::AUTH, checks::AUTH_STATUS, request)
            .await
        {
            Some(response) if response.status == 200 => response,
            _ => return AuthOutcome::Failed,
        };

        let token = response.json_str("token").map(str::to_string);
        if self.config.require_token {
            metrics.check(checks::AUTH_TOKEN, token.is_some());
        }
        match token {
            Some(token) => AuthOutcome::Token(token),
            None => {
                debug!("Auth for {} returned 200 without a token", username);
                AuthOutcome::MissingToken
            }
        }
    }

    /// GET /api/buy/{item}
    pub async fn buy_item(&self, metrics: &Metrics, token: &str, item: &str) -> bool {
        let request =
            HttpRequest::get(self.url(&format!("/api/buy/{}", item))).header("Authorization", token);
        self.succeeded(
            self.timed(metrics, series::BUY_ITEM, checks::BUY_ITEM_STATUS, request)
                .await,
        )
    }

    /// POST /api/sendCoin
    pub async fn send_coin(&self, metrics: &Metrics, token: &str, to_user: &str, amount: i64) -> bool {
        let request = HttpRequest::post(self.url("/api/sendCoin"))
            .header("Authorization", token)
            .json(json!({ "toUser": to_user, "amount": amount }));
        self.succeeded(
            self.timed(metrics, series::SEND_COIN, checks::SEND_COIN_STATUS, request)
                .await,
        )
    }

    /// GET /api/info
    pub async fn get_info(&self, metrics: &Metrics, token: &str) -> bool {
        let request = HttpRequest::get(self.url("/api/info")).header("Authorization", token);
        self.succeeded(
            self.timed(metrics, series::INFO, checks::INFO_STATUS, request)
                .await,
        )
    }

    fn succeeded(&self, response: Option<HttpResponse>) -> bool {
        response.is_some_and(|r| r.status == 200)
    }

    /// Token the downstream calls run with, `None` skips them
    fn session_token(&self, outcome: AuthOutcome) -> Option<String> {
        match outcome {
            AuthOutcome::Token(token) => Some(token),
            AuthOutcome::MissingToken if !self.config.require_token => Some(String::new()),
            AuthOutcome::MissingToken | AuthOutcome::Failed => None,
        }
    }
}

fn log_transport_error(error: &HttpError, method: &str, url: &str) {
    if error.is_timeout() {
        debug!("{} {} timed out", method, url);
    } else if error.is_connect() {
        debug!("{} {} could not connect: {}", method, url, error);
    } else {
        debug!("{} {} failed: {}", method, url, error);
    }
}

#[async_trait]
impl Scenario for ShopScenario {
    fn name(&self) -> &str {
        "merch-shop"
    }

    async fn setup(&self) -> anyhow::Result<()> {
        if !self.config.provision_receiver {
            return Ok(());
        }

        let receiver = &self.config.receiver;
        let request = HttpRequest::post(self.url("/api/auth")).json(json!({
            "username": receiver.username,
            "password": receiver.password,
        }));

        match self.client.send(request).await {
            Ok(response) if response.status == 200 => {
                info!("Receiver account '{}' is ready", receiver.username)
            }
            Ok(response) => warn!(
                "Provisioning receiver '{}' returned {}: {}",
                receiver.username,
                response.status,
                response.json_str("errors").unwrap_or("no error message")
            ),
            Err(e) => warn!("Provisioning receiver '{}' failed: {}", receiver.username, e),
        }
        Ok(())
    }

    async fn iteration(&self, vu: &VuContext) -> anyhow::Result<()> {
        let metrics = &vu.metrics;
        let username = self.username(vu.vu_id);

        let outcome = self.auth(metrics, &username, &self.config.password).await;
        if let Some(token) = self.session_token(outcome) {
            let item = self.pick_item();
            self.buy_item(metrics, &token, item).await;
            self.send_coin(
                metrics,
                &token,
                &self.config.receiver.username,
                self.config.transfer_amount,
            )
            .await;
            self.get_info(metrics, &token).await;
        }

        if !self.config.think_time.is_zero() {
            tokio::time::sleep(self.config.think_time).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merchload_config::domains::scenario::DEFAULT_ITEMS;
    use merchload_http::{HttpManager, HttpMethod, MockResponse};
    use std::time::Duration;

    const BASE: &str = "http://shop.test";

    fn manager(mocks: Vec<(HttpMethod, &str, MockResponse)>) -> HttpManager {
        let mut manager = HttpManager::offline().unwrap().with_journal();
        for (method, path, response) in mocks {
            manager.add_mock(method, &format!("{}{}", BASE, path), response);
        }
        manager
    }

    fn scenario(manager: &HttpManager, configure: impl FnOnce(&mut ScenarioConfig)) -> ShopScenario {
        let mut config = ScenarioConfig {
            base_url: format!("{}/", BASE),
            ..Default::default()
        };
        configure(&mut config);
        ShopScenario::new(config, Arc::new(manager.clone()))
    }

    fn ok_shop(auth: MockResponse, downstream_status: u16) -> HttpManager {
        manager(vec![
            (HttpMethod::Post, "/api/auth", auth),
            (HttpMethod::Get, "/api/buy/", MockResponse::with_status(downstream_status, json!({}))),
            (HttpMethod::Post, "/api/sendCoin", MockResponse::with_status(downstream_status, json!({}))),
            (HttpMethod::Get, "/api/info", MockResponse::with_status(downstream_status, json!({}))),
        ])
    }

    fn trend_counts(metrics: &Metrics) -> [u64; 4] {
        [
            metrics.trend_count(series::AUTH),
            metrics.trend_count(series::BUY_ITEM),
            metrics.trend_count(series::SEND_COIN),
            metrics.trend_count(series::INFO),
        ]
    }

    #[tokio::test]
    async fn test_successful_iteration() {
        let manager = ok_shop(MockResponse::ok(json!({"token": "abc"})), 200);
        let scenario = scenario(&manager, |_| {});
        let vu = VuContext::new(7, Metrics::new());

        let started = Instant::now();
        scenario.iteration(&vu).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));

        let journal = manager.journal();
        assert_eq!(journal.len(), 4);

        assert_eq!(journal[0].url, "http://shop.test/api/auth");
        assert_eq!(
            journal[0].json,
            Some(json!({"username": "user_7", "password": "password"}))
        );
        assert_eq!(journal[0].header_value("content-type"), Some("application/json"));
        assert_eq!(journal[0].header_value("authorization"), None);

        let item = journal[1].url.strip_prefix("http://shop.test/api/buy/").unwrap();
        assert!(DEFAULT_ITEMS.contains(&item));
        assert_eq!(journal[1].method, HttpMethod::Get);

        assert_eq!(journal[2].url, "http://shop.test/api/sendCoin");
        assert_eq!(journal[2].json, Some(json!({"toUser": "receiver", "amount": 0})));
        assert_eq!(journal[2].header_value("content-type"), Some("application/json"));

        assert_eq!(journal[3].url, "http://shop.test/api/info");
        for request in &journal[1..] {
            assert_eq!(request.header_value("Authorization"), Some("abc"));
        }

        assert_eq!(trend_counts(&vu.metrics), [1, 1, 1, 1]);
        assert_eq!(vu.metrics.counter(HTTP_REQS), 4);
        for check in [
            checks::AUTH_STATUS,
            checks::BUY_ITEM_STATUS,
            checks::SEND_COIN_STATUS,
            checks::INFO_STATUS,
        ] {
            let stats = vu.metrics.check_stats(check);
            assert_eq!((stats.passes, stats.fails), (1, 0), "{}", check);
        }
    }

    #[tokio::test]
    async fn test_failed_auth_skips_downstream_calls() {
        let manager = ok_shop(
            MockResponse::with_status(401, json!({"errors": "invalid credentials"})),
            200,
        );
        let scenario = scenario(&manager, |_| {});
        let vu = VuContext::new(1, Metrics::new());

        let started = Instant::now();
        scenario.iteration(&vu).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));

        assert_eq!(manager.journal().len(), 1);
        assert_eq!(trend_counts(&vu.metrics), [1, 0, 0, 0]);
        assert_eq!(vu.metrics.check_stats(checks::AUTH_STATUS).fails, 1);
        assert_eq!(vu.metrics.check_stats(checks::BUY_ITEM_STATUS).total(), 0);
    }

    #[tokio::test]
    async fn test_missing_token_runs_with_empty_authorization() {
        let manager = ok_shop(MockResponse::ok(json!({})), 401);
        let scenario = scenario(&manager, |c| c.think_time = Duration::ZERO);
        let vu = VuContext::new(2, Metrics::new());

        scenario.iteration(&vu).await.unwrap();

        let journal = manager.journal();
        assert_eq!(journal.len(), 4);
        for request in &journal[1..] {
            assert_eq!(request.header_value("Authorization"), Some(""));
        }
        assert_eq!(trend_counts(&vu.metrics), [1, 1, 1, 1]);
        assert_eq!(vu.metrics.check_stats(checks::AUTH_STATUS).passes, 1);
        for check in [
            checks::BUY_ITEM_STATUS,
            checks::SEND_COIN_STATUS,
            checks::INFO_STATUS,
        ] {
            assert_eq!(vu.metrics.check_stats(check).fails, 1, "{}", check);
        }
        // Only checked when tokens are required
        assert_eq!(vu.metrics.check_stats(checks::AUTH_TOKEN).total(), 0);
    }

    #[tokio::test]
    async fn test_required_token_guard() {
        let manager = ok_shop(MockResponse::ok(json!({"token": 42})), 200);
        let scenario = scenario(&manager, |c| {
            c.require_token = true;
            c.think_time = Duration::ZERO;
        });
        let vu = VuContext::new(3, Metrics::new());

        scenario.iteration(&vu).await.unwrap();

        assert_eq!(manager.journal().len(), 1);
        assert_eq!(vu.metrics.check_stats(checks::AUTH_STATUS).passes, 1);
        assert_eq!(vu.metrics.check_stats(checks::AUTH_TOKEN).fails, 1);
        assert_eq!(trend_counts(&vu.metrics), [1, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_transport_errors_still_record_samples() {
        // Only auth answers, every other call fails to send
        let manager = manager(vec![(
            HttpMethod::Post,
            "/api/auth",
            MockResponse::ok(json!({"token": "abc"})),
        )]);
        let scenario = scenario(&manager, |c| c.think_time = Duration::ZERO);
        let vu = VuContext::new(4, Metrics::new());

        assert!(scenario.iteration(&vu).await.is_ok());

        assert_eq!(trend_counts(&vu.metrics), [1, 1, 1, 1]);
        assert_eq!(vu.metrics.check_stats(checks::BUY_ITEM_STATUS).fails, 1);
        assert_eq!(vu.metrics.check_stats(checks::SEND_COIN_STATUS).fails, 1);
        assert_eq!(vu.metrics.check_stats(checks::INFO_STATUS).fails, 1);
    }

    #[tokio::test]
    async fn test_setup_provisions_receiver_without_recording() {
        let shop = ok_shop(MockResponse::ok(json!({"token": "r"})), 200);
        let provisioning = scenario(&shop, |c| c.receiver.username = "sink".to_string());

        provisioning.setup().await.unwrap();

        let journal = shop.journal();
        assert_eq!(journal.len(), 1);
        assert_eq!(
            journal[0].json,
            Some(json!({"username": "sink", "password": "password"}))
        );

        // Failures only warn
        let unreachable = manager(vec![]);
        assert!(scenario(&unreachable, |_| {}).setup().await.is_ok());

        let skipped = scenario(&unreachable, |c| c.provision_receiver = false);
        skipped.setup().await.unwrap();
        assert_eq!(unreachable.journal().len(), 1);
    }

    #[test]
    fn test_username_and_items() {
        let shop = manager(vec![]);
        let single = scenario(&shop, |c| {
            c.user_prefix = "bench_".to_string();
            c.items = vec!["cup".to_string()];
        });
        assert_eq!(single.username(12), "bench_12");
        for _ in 0..10 {
            assert_eq!(single.pick_item(), "cup");
        }
    }

    #[test]
    fn test_pick_item_covers_whole_catalog() {
        let shop = manager(vec![]);
        let catalog = scenario(&shop, |_| {});

        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..2_000 {
            let item = catalog.pick_item();
            assert!(DEFAULT_ITEMS.contains(&item), "{}", item);
            seen.insert(item.to_string());
        }
        assert_eq!(seen.len(), DEFAULT_ITEMS.len(), "{:?}", seen);
    }

    #[tokio::test]
    async fn test_offline_mocks_serve_the_happy_path() {
        let mut manager = HttpManager::offline().unwrap().with_journal();
        manager.add_mocks(crate::offline_mocks(BASE));
        let scenario = scenario(&manager, |c| c.think_time = Duration::ZERO);
        let vu = VuContext::new(1, Metrics::new());

        scenario.iteration(&vu).await.unwrap();

        let journal = manager.journal();
        assert_eq!(journal.len(), 4);
        assert_eq!(
            journal[1].header_value("Authorization"),
            Some(crate::OFFLINE_TOKEN)
        );
        assert_eq!(vu.metrics.check_stats(checks::INFO_STATUS).passes, 1);
    }
}
