//! In-memory chain used by the unit tests.
use std::{collections::HashMap, sync::Mutex};

use alloy::primitives::{Address, B256, Log as PrimitiveLog, U256};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use chainio::{AttestedToData, AttestedToRisk, DataRecord};
use eyre::{Result, bail, eyre};

use crate::reader::{ChainReader, LogQuery};

pub(crate) fn encode<E: SolEvent>(address: Address, block: u64, event: E) -> Log {
    let primitive = PrimitiveLog { address, data: event };
    Log {
        inner: E::encode_log(&primitive),
        block_number: Some(block),
        transaction_hash: Some(B256::with_last_byte(block as u8)),
        ..Default::default()
    }
}

pub(crate) fn data_log(address: Address, block: u64, trader: u64, epoch: u64) -> Log {
    let event = AttestedToData {
        traderId: U256::from(trader),
        epoch: U256::from(epoch),
        attester: Address::repeat_byte(0xaa),
        merkleRoot: B256::repeat_byte(trader as u8),
        cid: format!("cid-{trader}-{epoch}"),
    };
    encode(address, block, event)
}

pub(crate) fn risk_log(address: Address, block: u64, trader: u64, epoch: u64, value: u64) -> Log {
    let event = AttestedToRisk {
        traderId: U256::from(trader),
        epoch: U256::from(epoch),
        attester: Address::repeat_byte(0xbb),
        parameterId: U256::from(1),
        value: U256::from(value),
    };
    encode(address, block, event)
}

#[derive(Debug, Default)]
pub(crate) struct MockChain {
    pub(crate) head: u64,
    pub(crate) address: Address,
    pub(crate) logs: Vec<Log>,
    pub(crate) data_records: HashMap<(U256, U256), (DataRecord, bool)>,
    pub(crate) risk_records: HashMap<(U256, U256, U256), (U256, bool)>,
    pub(crate) fail_logs: bool,
    queries: Mutex<Vec<LogQuery>>,
}

impl MockChain {
    pub(crate) fn new(head: u64) -> Self {
        Self { head, ..Default::default() }
    }

    pub(crate) fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    pub(crate) fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    fn address(&self) -> Address {
        self.address
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.head)
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        self.queries.lock().unwrap().push(*query);
        if self.fail_logs {
            bail!("connection refused");
        }
        let topic = query.signature_hash();
        Ok(self
            .logs
            .iter()
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                block >= query.from_block && block <= query.to_block
            })
            .filter(|log| topic.is_none() || log.inner.data.topics().first() == topic.as_ref())
            .cloned()
            .collect())
    }

    async fn data_record(&self, trader_id: U256, epoch: U256) -> Result<(DataRecord, bool)> {
        self.data_records.get(&(trader_id, epoch)).cloned().ok_or_else(|| eyre!("execution reverted"))
    }

    async fn risk_record(
        &self,
        trader_id: U256,
        epoch: U256,
        parameter_id: U256,
    ) -> Result<(U256, bool)> {
        self.risk_records
            .get(&(trader_id, epoch, parameter_id))
            .copied()
            .ok_or_else(|| eyre!("execution reverted"))
    }
}
