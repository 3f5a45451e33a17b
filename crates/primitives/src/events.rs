//! Attestation events as produced by the RPC and GraphQL formatters, and the
//! per-(trader, epoch) records they are correlated into.
use std::fmt;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// The kind of an attestation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A trade data attestation (merkle root + content id).
    Data,
    /// A risk parameter attestation.
    Risk,
    /// A failed attestation, kept so persisted records round-trip.
    Error,
}

impl EventKind {
    /// Display colour used by consumers rendering the event.
    pub const fn color(self) -> &'static str {
        match self {
            Self::Data => "primary",
            Self::Risk => "secondary",
            Self::Error => "error",
        }
    }

    /// Name of the event kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "Data",
            Self::Risk => "Risk",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a data attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPayload {
    /// Merkle root of the off-chain trade data
    pub merkle_root: B256,
    /// Content identifier of the encrypted data blob
    pub cid: String,
}

/// Payload carried by an [`AttestationEvent`]: the data object or the bare risk value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Data attestation payload
    Data(DataPayload),
    /// Decoded risk value
    Risk(u64),
}

/// Identity of a correlated record: one per `(trader_id, epoch)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    /// Trader identifier, as a decimal string
    pub trader_id: String,
    /// Reporting epoch
    pub epoch: u64,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.trader_id, self.epoch)
    }
}

/// A formatted attestation event. GraphQL and RPC formatters produce the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationEvent {
    /// Hash of the transaction that emitted the event
    pub transaction_hash: B256,
    /// Block the event was emitted in
    pub block_number: u64,
    /// Trader identifier, as a decimal string
    pub trader_id: String,
    /// Reporting epoch
    pub epoch: u64,
    /// Address of the attester
    pub attester: Address,
    /// Kind of the event
    pub event_name: EventKind,
    /// Display colour derived from the kind
    pub event_color: String,
    /// Event payload
    pub data: EventPayload,
    /// Risk parameter the event refers to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_id: Option<u64>,
}

impl AttestationEvent {
    /// Build a data attestation event.
    pub fn data(
        transaction_hash: B256,
        block_number: u64,
        trader_id: impl Into<String>,
        epoch: u64,
        attester: Address,
        payload: DataPayload,
    ) -> Self {
        Self {
            transaction_hash,
            block_number,
            trader_id: trader_id.into(),
            epoch,
            attester,
            event_name: EventKind::Data,
            event_color: EventKind::Data.color().to_owned(),
            data: EventPayload::Data(payload),
            parameter_id: None,
        }
    }

    /// Build a risk attestation event.
    pub fn risk(
        transaction_hash: B256,
        block_number: u64,
        trader_id: impl Into<String>,
        epoch: u64,
        attester: Address,
        value: u64,
        parameter_id: Option<u64>,
    ) -> Self {
        Self {
            transaction_hash,
            block_number,
            trader_id: trader_id.into(),
            epoch,
            attester,
            event_name: EventKind::Risk,
            event_color: EventKind::Risk.color().to_owned(),
            data: EventPayload::Risk(value),
            parameter_id,
        }
    }

    /// The `(trader_id, epoch)` key of this event.
    pub fn key(&self) -> RecordKey {
        RecordKey { trader_id: self.trader_id.clone(), epoch: self.epoch }
    }
}

/// Data and risk attestations merged for a single `(trader_id, epoch)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedRecord {
    /// Trader identifier, as a decimal string
    pub trader_id: String,
    /// Reporting epoch
    pub epoch: u64,
    /// Block of the first data event seen for this pair
    pub block_number: u64,
    /// All data events sharing the key, in input order
    pub data_events: Vec<AttestationEvent>,
    /// All risk events sharing the key, in input order
    pub risk_events: Vec<AttestationEvent>,
}

impl CorrelatedRecord {
    /// The `(trader_id, epoch)` key of this record.
    pub fn key(&self) -> RecordKey {
        RecordKey { trader_id: self.trader_id.clone(), epoch: self.epoch }
    }
}
