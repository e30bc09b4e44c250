use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::api::FetchError;

/// A backend amount kept as the literal text the backend sent.
///
/// The backend owns amount semantics (units, precision), so the client never
/// parses or rounds it. JSON strings and JSON numbers are both accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount(String);

impl Amount {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount(value.to_string())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Amount(text),
            Raw::Number(number) => Amount(number.to_string()),
        })
    }
}

/// Aggregate token balance across every wallet address.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Balance {
    pub token: String,
    pub sendable: Amount,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressEntry {
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Balance and coins of the single address under inspection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressDetail {
    pub address: String,
    #[serde(default)]
    pub tokenid: Option<String>,
    pub balance: Amount,
    /// Opaque UTXO records, kept in server order.
    #[serde(default)]
    pub utxos: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    pub txpowid: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SliceStatus {
    #[default]
    Idle,
    Loading,
    Failed(FetchError),
}

/// One independently loadable piece of the wallet view.
///
/// `value` is `None` until the first successful load; a failed reload keeps
/// whatever value was there before.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    value: Option<T>,
    status: SliceStatus,
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self {
            value: None,
            status: SliceStatus::Idle,
        }
    }
}

impl<T> Slice<T> {
    pub fn begin(&mut self) {
        self.status = SliceStatus::Loading;
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.status = SliceStatus::Idle;
    }

    pub fn fail(&mut self, error: FetchError) {
        self.status = SliceStatus::Failed(error);
    }

    pub fn clear(&mut self) {
        self.value = None;
        self.status = SliceStatus::Idle;
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == SliceStatus::Loading
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            SliceStatus::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Identifies one address selection. `seq` grows with every selection, so
/// two selections of the same address still get distinct tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub address: String,
}

/// The address detail slice together with the selection it belongs to.
#[derive(Debug, Clone, Default)]
pub struct DetailSlice {
    slice: Slice<AddressDetail>,
    current: Option<Ticket>,
    next_seq: u64,
}

impl DetailSlice {
    /// Drops any previous detail and issues the ticket for `address`.
    pub fn select(&mut self, address: &str) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            seq: self.next_seq,
            address: address.to_string(),
        };
        self.slice.clear();
        self.slice.begin();
        self.current = Some(ticket.clone());
        ticket
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.current.as_ref() == Some(ticket)
    }

    /// Commits a response for `ticket`. Returns false, leaving the slice
    /// untouched, when the ticket has been superseded.
    pub fn commit(&mut self, ticket: &Ticket, result: Result<AddressDetail, FetchError>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        match result {
            Ok(detail) => self.slice.set(detail),
            Err(e) => {
                self.slice.clear();
                self.slice.fail(e);
            }
        }
        true
    }

    pub fn selected(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.address.as_str())
    }

    pub fn slice(&self) -> &Slice<AddressDetail> {
        &self.slice
    }
}

/// Cached view of the server-held wallet.
#[derive(Debug, Clone, Default)]
pub struct WalletState {
    pub balance: Slice<Balance>,
    pub addresses: Slice<Vec<AddressEntry>>,
    pub history: Slice<Vec<HistoryEntry>>,
    pub detail: DetailSlice,
}
