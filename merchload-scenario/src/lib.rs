//! Merch shop load scenario
//!
//! Every iteration logs a virtual user in, buys a random item, sends coins
//! to the receiver account and reads the user's info, recording one timing
//! sample and one check per call.

pub mod mocks;
pub mod shop;

pub use mocks::{offline_mocks, OFFLINE_TOKEN};
pub use shop::{AuthOutcome, ShopScenario};

/// Timing series, one sample per attempted call
pub mod series {
    pub const AUTH: &str = "auth_response_time";
    pub const BUY_ITEM: &str = "buy_item_response_time";
    pub const SEND_COIN: &str = "send_coin_response_time";
    pub const INFO: &str = "info_response_time";
}

/// Check names, one result per call
pub mod checks {
    pub const AUTH_STATUS: &str = "auth status is 200";
    pub const AUTH_TOKEN: &str = "auth token is present";
    pub const BUY_ITEM_STATUS: &str = "buy item status is 200";
    pub const SEND_COIN_STATUS: &str = "send coin status is 200";
    pub const INFO_STATUS: &str = "get info status is 200";
}
