use serde::{Deserialize, Serialize};

/// Outbound topic carrying a JSON snapshot of every committed invoice write.
pub const INVOICES_TOPIC: &str = "invoices-json";
/// Inbound topic carrying wallet balance observations from the chain watchers.
pub const WALLET_BALANCES_TOPIC: &str = "payments-json";

/// A balance observation for a deposit address, as published by the chain watchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalanceEvent {
    pub address: String,
    /// The balance in the smallest on-chain unit of `token`
    pub balance: u128,
    pub chain: String,
    pub token: String,
}

impl WalletBalanceEvent {
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
