use std::{collections::HashMap, fmt::Debug, sync::Arc};

use cucumber::World;
use invoice_engine::{
    db_types::InvoiceId,
    helpers::TokenDecimals,
    test_utils::{
        collaborators::{FakeCustody, FakePriceOracle, RecordingAlertSink},
        prepare_env::prepare_test_env,
        prepare_env::random_db_path,
    },
    workers::{
        expiry::{ExpirationSweeper, ExpiryConfig},
        inflight::{InFlightTracker, LocalInFlightTracker},
        settlement::{SettlementConfig, SettlementWorker},
        wallet_matcher::{MatcherConfig, WalletEventMatcher},
    },
    InvoiceFlowApi,
    SqliteDatabase,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct InvoiceWorld {
    pub system: Option<InvoiceSystem>,
}

pub struct InvoiceSystem {
    pub db_path: String,
    pub api: InvoiceFlowApi<SqliteDatabase>,
    pub custody: Arc<FakeCustody>,
    pub prices: Arc<FakePriceOracle>,
    pub alerts: Arc<RecordingAlertSink>,
    pub matcher: WalletEventMatcher<SqliteDatabase>,
    pub settlement: SettlementWorker<SqliteDatabase>,
    pub sweeper: ExpirationSweeper<SqliteDatabase>,
    /// Scenario aliases of the invoices created so far
    pub invoices: HashMap<String, InvoiceId>,
}

impl Debug for InvoiceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvoiceSystem({})", self.db_path)
    }
}

impl InvoiceWorld {
    pub fn system(&self) -> &InvoiceSystem {
        self.system.as_ref().expect("System not initialised")
    }

    pub fn system_mut(&mut self) -> &mut InvoiceSystem {
        self.system.as_mut().expect("System not initialised")
    }

    pub fn api(&self) -> &InvoiceFlowApi<SqliteDatabase> {
        &self.system().api
    }

    pub fn invoice_id(&self, alias: &str) -> InvoiceId {
        self.system().invoices.get(alias).cloned().unwrap_or_else(|| panic!("No invoice called [{alias}]"))
    }
}

impl InvoiceSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let custody = Arc::new(FakeCustody::new());
        let prices = Arc::new(FakePriceOracle::new());
        let alerts = Arc::new(RecordingAlertSink::default());
        let tracker: Arc<dyn InFlightTracker> = Arc::new(LocalInFlightTracker::new());
        let api = InvoiceFlowApi::new(db.clone(), custody.clone(), prices.clone());
        let decimals = TokenDecimals::default().with("ethereum", "USDT", 6).with("tron", "USDT", 6);
        let matcher_config = MatcherConfig { decimals, ..Default::default() };
        let matcher = WalletEventMatcher::new(db.clone(), custody.clone(), tracker.clone(), matcher_config);
        let settlement_config = SettlementConfig { max_attempts: 3, ..Default::default() };
        let settlement = SettlementWorker::new(db.clone(), custody.clone(), tracker, settlement_config)
            .with_alerts(alerts.clone());
        let sweeper = ExpirationSweeper::new(db, ExpiryConfig::default());
        Self { db_path: url, api, custody, prices, alerts, matcher, settlement, sweeper, invoices: HashMap::new() }
    }
}
