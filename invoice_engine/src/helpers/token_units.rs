//! Conversion of fractional token amounts into the smallest on-chain unit.
//!
//! Every (chain, token) pair has its own precision (USDT on Ethereum has 6 decimals, ETH has 18). The registry is
//! plain data, configured at start-up.
use std::{collections::HashMap, fmt::Display, str::FromStr};

use ipg_common::helpers::split_list;
use thiserror::Error;

pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TokenUnitsError {
    #[error("{0} is not a valid token amount")]
    InvalidAmount(f64),
    #[error("{amount} does not fit into u128 at {decimals} decimals")]
    Overflow { amount: f64, decimals: u32 },
    #[error("Invalid token decimals entry '{0}'. Expected chain:TOKEN=decimals")]
    InvalidEntry(String),
}

/// Converts `amount` into integer units with `decimals` decimal places, rounding up.
///
/// The conversion works on the shortest decimal representation of `amount`, so `0.1` at 6 decimals is exactly
/// `100000` rather than whatever the nearest binary float times `10^6` happens to be.
pub fn to_smallest_units(amount: f64, decimals: u32) -> Result<u128, TokenUnitsError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(TokenUnitsError::InvalidAmount(amount));
    }
    let overflow = || TokenUnitsError::Overflow { amount, decimals };
    let repr = amount.to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let width = usize::try_from(decimals).map_err(|_| overflow())?;
    let (kept, dropped) = if frac_part.len() > width { frac_part.split_at(width) } else { (frac_part, "") };
    let digits = format!("{int_part}{kept:0<width$}");
    let mut units = digits.parse::<u128>().map_err(|_| overflow())?;
    if dropped.bytes().any(|b| b != b'0') {
        units = units.checked_add(1).ok_or_else(overflow)?;
    }
    Ok(units)
}

/// Decimal precision per `(chain, token)`. Lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDecimals {
    default: u32,
    overrides: HashMap<(String, String), u32>,
}

impl Default for TokenDecimals {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_DECIMALS)
    }
}

impl TokenDecimals {
    pub fn new(default: u32) -> Self {
        Self { default, overrides: HashMap::new() }
    }

    pub fn with(mut self, chain: &str, token: &str, decimals: u32) -> Self {
        self.set(chain, token, decimals);
        self
    }

    pub fn set(&mut self, chain: &str, token: &str, decimals: u32) {
        self.overrides.insert(key(chain, token), decimals);
    }

    pub fn decimals_for(&self, chain: &str, token: &str) -> u32 {
        self.overrides.get(&key(chain, token)).copied().unwrap_or(self.default)
    }

    /// The smallest-unit amount of `token` that covers `amount`.
    pub fn required_units(&self, chain: &str, token: &str, amount: f64) -> Result<u128, TokenUnitsError> {
        to_smallest_units(amount, self.decimals_for(chain, token))
    }
}

fn key(chain: &str, token: &str) -> (String, String) {
    (chain.trim().to_lowercase(), token.trim().to_lowercase())
}

/// Parses a comma-separated list of `chain:TOKEN=decimals` entries, e.g. `ethereum:USDT=6,tron:USDT=6`.
impl FromStr for TokenDecimals {
    type Err = TokenUnitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result = Self::default();
        for entry in split_list(s) {
            let invalid = || TokenUnitsError::InvalidEntry(entry.clone());
            let (pair, decimals) = entry.split_once('=').ok_or_else(invalid)?;
            let (chain, token) = pair.split_once(':').ok_or_else(invalid)?;
            if chain.trim().is_empty() || token.trim().is_empty() {
                return Err(invalid());
            }
            let decimals = decimals.trim().parse::<u32>().map_err(|_| invalid())?;
            result.set(chain, token, decimals);
        }
        Ok(result)
    }
}

impl Display for TokenDecimals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries = self.overrides.iter().map(|((c, t), d)| format!("{c}:{t}={d}")).collect::<Vec<_>>();
        entries.sort();
        write!(f, "[{}] (default {})", entries.join(", "), self.default)
    }
}
