use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use ipg_common::UsdCents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------       InvoiceId       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct InvoiceId(String);

impl InvoiceId {
    /// Allocates a fresh, random (v4 UUID) invoice identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InvoiceId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Uuid::parse_str(s.trim()).map_err(|e| ConversionError(format!("Invalid invoice id '{s}': {e}")))?;
        Ok(Self(id.to_string()))
    }
}

impl From<Uuid> for InvoiceId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------       ClientId        ---------------------------------------------------------
/// The owner of an invoice, or the party paying it. Identifiers are opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Into<String>> From<S> for ClientId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------     InvoiceStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// The invoice has been created, but no chain or token has been selected yet.
    New,
    /// A deposit address has been issued and the engine is waiting for funds.
    Pending,
    /// Funds have arrived and the outbound transfer is in progress.
    SendingToClient,
    /// The outbound transfer succeeded.
    Success,
    /// The invoice was not paid in time.
    Expired,
    /// Automated settlement gave up. An operator has to take over.
    ManualControl,
}

impl InvoiceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Expired | Self::ManualControl)
    }

    /// Whether the lifecycle graph permits moving from `self` to `next`.
    ///
    /// ```text
    /// NEW -> PENDING -> SENDING_TO_CLIENT -> SUCCESS
    ///                                     -> MANUAL_CONTROL
    /// NEW | PENDING -> EXPIRED
    /// ```
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (New, Pending) |
                (Pending, SendingToClient) |
                (SendingToClient, Success) |
                (SendingToClient, ManualControl) |
                (New | Pending, Expired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Pending => "PENDING",
            Self::SendingToClient => "SENDING_TO_CLIENT",
            Self::Success => "SUCCESS",
            Self::Expired => "EXPIRED",
            Self::ManualControl => "MANUAL_CONTROL",
        }
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "PENDING" => Ok(Self::Pending),
            "SENDING_TO_CLIENT" => Ok(Self::SendingToClient),
            "SUCCESS" => Ok(Self::Success),
            "EXPIRED" => Ok(Self::Expired),
            "MANUAL_CONTROL" => Ok(Self::ManualControl),
            s => Err(ConversionError(format!("Invalid invoice status: {s}"))),
        }
    }
}

//--------------------------------------        Invoice        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub client_id: ClientId,
    pub payer_client_id: Option<ClientId>,
    pub usd_cents_amount: UsdCents,
    /// The amount of `token` owed. Only known once the invoice has been priced.
    pub token_amount: Option<f64>,
    pub chain: Option<String>,
    pub token: Option<String>,
    /// The (lower-cased) deposit address issued by the custody service
    pub address: Option<String>,
    /// Operator override of the outbound transfer fee ceiling
    pub gas_limit: Option<i64>,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}

//--------------------------------------       NewInvoice      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub id: InvoiceId,
    pub client_id: ClientId,
    pub usd_cents_amount: UsdCents,
    pub created_at: DateTime<Utc>,
}

impl NewInvoice {
    pub fn new(client_id: ClientId, usd_cents_amount: UsdCents) -> Self {
        Self { id: InvoiceId::random(), client_id, usd_cents_amount, created_at: Utc::now() }
    }

    /// Overrides the creation timestamp. Mostly useful for back-dating invoices in tests and data imports.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------     InvoiceUpdate     ---------------------------------------------------------
/// A narrow, partial update of an invoice. Only the fields that are `Some` are written.
///
/// When `expected_status` is set, the update only applies if the stored status still matches it. This is how the
/// background workers avoid moving an invoice that some other component has already moved on.
#[derive(Debug, Clone)]
pub struct InvoiceUpdate {
    pub id: InvoiceId,
    pub expected_status: Option<InvoiceStatus>,
    pub status: Option<InvoiceStatus>,
    pub payer_client_id: Option<ClientId>,
    pub token_amount: Option<f64>,
    pub chain: Option<String>,
    pub token: Option<String>,
    pub address: Option<String>,
    pub gas_limit: Option<i64>,
}

impl InvoiceUpdate {
    pub fn new(id: InvoiceId) -> Self {
        Self {
            id,
            expected_status: None,
            status: None,
            payer_client_id: None,
            token_amount: None,
            chain: None,
            token: None,
            address: None,
            gas_limit: None,
        }
    }

    /// Shorthand for a guarded status change `from -> to`.
    pub fn transition(id: InvoiceId, from: InvoiceStatus, to: InvoiceStatus) -> Self {
        Self::new(id).expecting(from).with_status(to)
    }

    pub fn expecting(mut self, status: InvoiceStatus) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payer_client_id(mut self, payer: ClientId) -> Self {
        self.payer_client_id = Some(payer);
        self
    }

    pub fn with_token_amount(mut self, amount: f64) -> Self {
        self.token_amount = Some(amount);
        self
    }

    pub fn with_chain<S: Into<String>>(mut self, chain: S) -> Self {
        self.chain = Some(chain.into());
        self
    }

    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into().to_lowercase());
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: i64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() &&
            self.payer_client_id.is_none() &&
            self.token_amount.is_none() &&
            self.chain.is_none() &&
            self.token.is_none() &&
            self.address.is_none() &&
            self.gas_limit.is_none()
    }
}

//--------------------------------------     OutboxRecord      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OutboxRecord {
    pub id: i64,
    /// JSON snapshot of the invoice as it was committed
    pub message: String,
}
