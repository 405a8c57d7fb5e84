//! Merch shop scenario configuration
//!
//! Describes the target service and everything a single iteration needs:
//! credentials, the item catalog, the transfer receiver and think time.

use crate::error::ConfigResult;
use crate::validation::{
    validate_http_url, validate_path_segment, validate_required_string, Validatable,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Items sold by the shop, in catalog order
pub const DEFAULT_ITEMS: [&str; 10] = [
    "t-shirt",
    "cup",
    "book",
    "pen",
    "powerbank",
    "hoody",
    "umbrella",
    "socks",
    "wallet",
    "pink-hoody",
];

/// Shop scenario configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Base URL of the shop, request paths are appended to it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Username prefix, the VU index is appended (`user_1`, `user_2`, ...)
    #[serde(default = "default_user_prefix")]
    pub user_prefix: String,

    /// Password shared by every virtual user
    #[serde(default = "default_password")]
    pub password: String,

    /// Item catalog, one entry is bought per iteration
    #[serde(default = "default_items")]
    pub items: Vec<String>,

    /// Account receiving every coin transfer
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// Coins sent per transfer
    #[serde(default)]
    pub transfer_amount: i64,

    /// Pause at the end of every iteration
    #[serde(with = "humantime_serde", default = "default_think_time")]
    pub think_time: Duration,

    /// Treat a 200 auth response without a token as a failed login
    #[serde(default = "crate::domains::utils::default_false")]
    pub require_token: bool,

    /// Log the receiver in once before the first stage so the account exists
    #[serde(default = "crate::domains::utils::default_true")]
    pub provision_receiver: bool,
}

/// Transfer receiver account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReceiverConfig {
    #[serde(default = "default_receiver_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_prefix: default_user_prefix(),
            password: default_password(),
            items: default_items(),
            receiver: ReceiverConfig::default(),
            transfer_amount: 0,
            think_time: default_think_time(),
            require_token: false,
            provision_receiver: true,
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            username: default_receiver_username(),
            password: default_password(),
        }
    }
}

impl Validatable for ScenarioConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_http_url(&self.base_url, "base_url", self.domain_name())?;
        validate_required_string(&self.password, "password", self.domain_name())?;

        if self.items.is_empty() {
            return Err(self.validation_error("items must contain at least one entry"));
        }
        for item in &self.items {
            validate_path_segment(item, "items", self.domain_name())?;
        }

        if self.transfer_amount < 0 {
            return Err(self.validation_error(format!(
                "transfer_amount cannot be negative, got {}",
                self.transfer_amount
            )));
        }

        self.receiver.validate()?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scenario"
    }
}

impl Validatable for ReceiverConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.username, "username", self.domain_name())?;
        validate_required_string(&self.password, "password", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scenario.receiver"
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_user_prefix() -> String {
    "user_".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_items() -> Vec<String> {
    DEFAULT_ITEMS.iter().map(|item| item.to_string()).collect()
}

fn default_receiver_username() -> String {
    "receiver".to_string()
}

fn default_think_time() -> Duration {
    Duration::from_millis(50)
}
