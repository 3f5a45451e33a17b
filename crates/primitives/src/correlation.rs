//! Correlation of independently fetched data and risk events.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{AttestationEvent, CorrelatedRecord, RecordKey};

/// What to do with risk events whose `(trader_id, epoch)` has no data event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanRiskPolicy {
    /// Silently drop them.
    #[default]
    Drop,
    /// Keep them as records without data events.
    Retain,
}

/// Merge data and risk events into one record per `(trader_id, epoch)`, dropping
/// orphaned risk events.
///
/// Records appear in the order their key first shows up in `data_events`. The
/// record's block number is the block of that first data event.
pub fn correlate_events(
    data_events: &[AttestationEvent],
    risk_events: &[AttestationEvent],
) -> Vec<CorrelatedRecord> {
    correlate_events_with(data_events, risk_events, OrphanRiskPolicy::Drop)
}

/// Merge data and risk events into one record per `(trader_id, epoch)`.
///
/// With [`OrphanRiskPolicy::Retain`], risk events with no matching data event form
/// data-less records appended after the data-backed ones, in first-appearance order.
pub fn correlate_events_with(
    data_events: &[AttestationEvent],
    risk_events: &[AttestationEvent],
    policy: OrphanRiskPolicy,
) -> Vec<CorrelatedRecord> {
    let mut index: HashMap<RecordKey, usize> = HashMap::new();
    let mut records: Vec<CorrelatedRecord> = Vec::new();

    for event in data_events {
        match index.get(&event.key()) {
            Some(&pos) => records[pos].data_events.push(event.clone()),
            None => {
                index.insert(event.key(), records.len());
                records.push(CorrelatedRecord {
                    trader_id: event.trader_id.clone(),
                    epoch: event.epoch,
                    block_number: event.block_number,
                    data_events: vec![event.clone()],
                    risk_events: Vec::new(),
                });
            }
        }
    }

    let mut dropped = 0usize;
    for event in risk_events {
        if let Some(&pos) = index.get(&event.key()) {
            records[pos].risk_events.push(event.clone());
            continue;
        }
        match policy {
            OrphanRiskPolicy::Drop => dropped += 1,
            OrphanRiskPolicy::Retain => {
                index.insert(event.key(), records.len());
                records.push(CorrelatedRecord {
                    trader_id: event.trader_id.clone(),
                    epoch: event.epoch,
                    block_number: event.block_number,
                    data_events: Vec::new(),
                    risk_events: vec![event.clone()],
                });
            }
        }
    }

    if dropped > 0 {
        debug!(dropped, "Dropped risk events without a matching data event");
    }

    records
}

/// Correlate one page of a backward scan whose data events end at `window_top`.
///
/// Risk events above `window_top` only join keys with a data event in this page;
/// the rest of them belong to newer pages. `policy` applies to risk events at or
/// below `window_top`. Without a `window_top` this is [`correlate_events_with`].
pub fn correlate_page(
    data_events: &[AttestationEvent],
    risk_events: &[AttestationEvent],
    policy: OrphanRiskPolicy,
    window_top: Option<u64>,
) -> Vec<CorrelatedRecord> {
    let Some(top) = window_top else {
        return correlate_events_with(data_events, risk_events, policy);
    };
    let keys: HashSet<RecordKey> = data_events.iter().map(AttestationEvent::key).collect();
    let risk_events: Vec<_> = risk_events
        .iter()
        .filter(|event| event.block_number <= top || keys.contains(&event.key()))
        .cloned()
        .collect();
    correlate_events_with(data_events, &risk_events, policy)
}
