use std::{env, fmt::Display, str::FromStr, time::Duration};

use invoice_engine::{
    helpers::TokenDecimals,
    workers::{
        expiry::ExpiryConfig,
        outbox_publisher::OutboxConfig,
        settlement::SettlementConfig,
        wallet_matcher::MatcherConfig,
    },
};
use ipg_common::{helpers::parse_boolean_flag, Secret};
use log::*;

const DEFAULT_IPG_HOST: &str = "127.0.0.1";
const DEFAULT_IPG_PORT: u16 = 8370;
const DEFAULT_EXPIRE_INTERVAL_SECS: i64 = 900;
const DEFAULT_EXPIRY_TICK: Duration = Duration::from_secs(5);
const DEFAULT_SETTLEMENT_TICK: Duration = Duration::from_secs(5);
const DEFAULT_OUTBOX_TICK: Duration = Duration::from_millis(500);
const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Unpaid invoices older than this are expired.
    pub expire_after: chrono::Duration,
    pub expiry_tick: Duration,
    pub settlement_tick: Duration,
    pub outbox_tick: Duration,
    pub settlement_max_attempts: u32,
    pub gas_limit_base: i64,
    pub gas_limit_step: i64,
    pub settlement_backoff: Duration,
    /// Upper bound on every call to custody, the price oracle, the alert sink and the bus.
    pub collaborator_timeout: Duration,
    pub collaborators: CollaboratorConfig,
    pub token_decimals: TokenDecimals,
    pub cancel_accepting_on_match: bool,
}

/// Where the external services live.
#[derive(Clone, Debug, Default)]
pub struct CollaboratorConfig {
    pub custody_url: String,
    pub custody_api_key: Secret<String>,
    pub price_url: String,
    /// Alerts are only raised when this is set.
    pub alert_url: Option<String>,
    /// When unset, outbound invoice events stay on the in-process bus.
    pub bus_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let settlement = SettlementConfig::default();
        Self {
            host: DEFAULT_IPG_HOST.to_string(),
            port: DEFAULT_IPG_PORT,
            database_url: String::default(),
            expire_after: chrono::Duration::seconds(DEFAULT_EXPIRE_INTERVAL_SECS),
            expiry_tick: DEFAULT_EXPIRY_TICK,
            settlement_tick: DEFAULT_SETTLEMENT_TICK,
            outbox_tick: DEFAULT_OUTBOX_TICK,
            settlement_max_attempts: settlement.max_attempts,
            gas_limit_base: settlement.gas_limit_base,
            gas_limit_step: settlement.gas_limit_step,
            settlement_backoff: settlement.retry_backoff,
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
            collaborators: CollaboratorConfig::default(),
            token_decimals: TokenDecimals::default(),
            cancel_accepting_on_match: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("IPG_HOST").ok().unwrap_or_else(|| DEFAULT_IPG_HOST.into());
        let port = parse_or_default("IPG_PORT", env_value("IPG_PORT"), DEFAULT_IPG_PORT);
        let database_url = env::var("IPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ IPG_DATABASE_URL is not set. Please set it to the URL for the invoice database.");
            String::default()
        });
        let expire_secs =
            parse_or_default("IPG_EXPIRE_INTERVAL", env_value("IPG_EXPIRE_INTERVAL"), DEFAULT_EXPIRE_INTERVAL_SECS);
        let expire_after = if expire_secs > 0 {
            chrono::Duration::seconds(expire_secs)
        } else {
            warn!("🪛️ IPG_EXPIRE_INTERVAL must be positive. Using the default of {DEFAULT_EXPIRE_INTERVAL_SECS}s.");
            defaults.expire_after
        };
        let token_decimals = match env_value("IPG_TOKEN_DECIMALS") {
            Some(s) => s.parse::<TokenDecimals>().unwrap_or_else(|e| {
                error!("🪛️ Invalid IPG_TOKEN_DECIMALS ({s}). {e}. Every token will use the default decimals.");
                TokenDecimals::default()
            }),
            None => {
                info!("🪛️ IPG_TOKEN_DECIMALS is not set. Every token will use the default decimals.");
                TokenDecimals::default()
            },
        };
        let cancel_accepting_on_match =
            parse_boolean_flag(env_value("IPG_CANCEL_ACCEPTING_ON_MATCH"), defaults.cancel_accepting_on_match);
        let config = Self {
            host,
            port,
            database_url,
            expire_after,
            expiry_tick: millis_or_default("IPG_EXPIRY_TICK_MS", defaults.expiry_tick),
            settlement_tick: millis_or_default("IPG_SETTLEMENT_TICK_MS", defaults.settlement_tick),
            outbox_tick: millis_or_default("IPG_OUTBOX_TICK_MS", defaults.outbox_tick),
            settlement_max_attempts: parse_or_default(
                "IPG_SETTLEMENT_MAX_ATTEMPTS",
                env_value("IPG_SETTLEMENT_MAX_ATTEMPTS"),
                defaults.settlement_max_attempts,
            ),
            gas_limit_base: parse_or_default(
                "IPG_GAS_LIMIT_BASE",
                env_value("IPG_GAS_LIMIT_BASE"),
                defaults.gas_limit_base,
            ),
            gas_limit_step: parse_or_default(
                "IPG_GAS_LIMIT_STEP",
                env_value("IPG_GAS_LIMIT_STEP"),
                defaults.gas_limit_step,
            ),
            settlement_backoff: millis_or_default("IPG_SETTLEMENT_BACKOFF_MS", defaults.settlement_backoff),
            collaborator_timeout: millis_or_default("IPG_COLLABORATOR_TIMEOUT_MS", defaults.collaborator_timeout),
            collaborators: CollaboratorConfig::from_env(),
            token_decimals,
            cancel_accepting_on_match,
        };
        debug!("🪛️ Token decimals: {}", config.token_decimals);
        config
    }

    pub fn expiry_config(&self) -> ExpiryConfig {
        ExpiryConfig { tick_interval: self.expiry_tick, expire_after: self.expire_after, ..Default::default() }
    }

    pub fn settlement_config(&self) -> SettlementConfig {
        SettlementConfig {
            tick_interval: self.settlement_tick,
            max_attempts: self.settlement_max_attempts,
            gas_limit_base: self.gas_limit_base,
            gas_limit_step: self.gas_limit_step,
            retry_backoff: self.settlement_backoff,
            call_timeout: self.collaborator_timeout,
            ..Default::default()
        }
    }

    pub fn outbox_config(&self) -> OutboxConfig {
        OutboxConfig { tick_interval: self.outbox_tick, ..Default::default() }
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            decimals: self.token_decimals.clone(),
            cancel_accepting_on_match: self.cancel_accepting_on_match,
            call_timeout: self.collaborator_timeout,
            ..Default::default()
        }
    }
}

impl CollaboratorConfig {
    pub fn from_env() -> Self {
        let custody_url = env_value("IPG_CUSTODY_URL").unwrap_or_else(|| {
            error!("🪛️ IPG_CUSTODY_URL is not set. Invoices cannot be issued deposit addresses without it.");
            String::default()
        });
        let custody_api_key = Secret::new(env::var("IPG_CUSTODY_API_KEY").unwrap_or_default());
        if custody_api_key.is_empty() {
            warn!("🪛️ IPG_CUSTODY_API_KEY is not set. Custody requests will be unauthenticated.");
        }
        let price_url = env_value("IPG_PRICE_URL").unwrap_or_else(|| {
            error!("🪛️ IPG_PRICE_URL is not set. Invoices cannot be priced without it.");
            String::default()
        });
        let alert_url = env_value("IPG_ALERT_URL");
        if alert_url.is_none() {
            info!("🪛️ IPG_ALERT_URL is not set. Invoices moved to manual control will only be logged.");
        }
        let bus_url = env_value("IPG_BUS_URL");
        if bus_url.is_none() {
            warn!("🪛️ IPG_BUS_URL is not set. Invoice events will not leave this process.");
        }
        Self { custody_url, custody_api_key, price_url, alert_url, bus_url }
    }
}

/// The trimmed value of the environment variable, or `None` if it is unset or blank.
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_or_default<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        Some(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        None => default,
    }
}

fn millis_or_default(name: &str, default: Duration) -> Duration {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(parse_or_default(name, env_value(name), default_ms))
}
