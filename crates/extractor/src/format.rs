//! Formatting of raw attestation logs into [`AttestationEvent`]s.
use alloy::primitives::U256;
use alloy_rpc_types_eth::Log;
use chainio::{AttestedToData, AttestedToRisk};
use eyre::{Result, eyre};
use primitives::{AttestationEvent, DataPayload};

fn to_u64(value: U256, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| eyre!("{field} {value} does not fit in 64 bits"))
}

/// Decode an `AttestedToData` log.
pub fn format_data_log(log: &Log) -> Result<AttestationEvent> {
    let decoded = log.log_decode::<AttestedToData>()?;
    let event = decoded.data();
    Ok(AttestationEvent::data(
        log.transaction_hash.unwrap_or_default(),
        log.block_number.unwrap_or_default(),
        event.traderId.to_string(),
        to_u64(event.epoch, "epoch")?,
        event.attester,
        DataPayload { merkle_root: event.merkleRoot, cid: event.cid.clone() },
    ))
}

/// Decode an `AttestedToRisk` log.
pub fn format_risk_log(log: &Log) -> Result<AttestationEvent> {
    let decoded = log.log_decode::<AttestedToRisk>()?;
    let event = decoded.data();
    Ok(AttestationEvent::risk(
        log.transaction_hash.unwrap_or_default(),
        log.block_number.unwrap_or_default(),
        event.traderId.to_string(),
        to_u64(event.epoch, "epoch")?,
        event.attester,
        to_u64(event.value, "risk value")?,
        Some(to_u64(event.parameterId, "parameter id")?),
    ))
}
