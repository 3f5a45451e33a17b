//! Read access to the attestation contract and its logs.
use alloy::{
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
    rpc::{client::ClientBuilder, types::Filter},
};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use chainio::{AttestationContract, AttestedToData, AttestedToRisk, DataRecord, DefaultProvider};
use derive_more::Debug;
use eyre::Result;
use primitives::{EventKind, FetchConfig, retries::DEFAULT_RETRY_LAYER};
use tracing::error;
use url::Url;

/// A log query over an inclusive block range of one contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    /// Contract emitting the logs
    pub address: Address,
    /// First block (inclusive)
    pub from_block: u64,
    /// Last block (inclusive)
    pub to_block: u64,
    /// Restrict to one attestation event, or match every log of the contract
    pub event: Option<EventKind>,
}

impl LogQuery {
    /// Query every log of `address` in `[from_block, to_block]`.
    pub const fn any(address: Address, from_block: u64, to_block: u64) -> Self {
        Self { address, from_block, to_block, event: None }
    }

    /// Query one attestation event of `address` in `[from_block, to_block]`.
    pub const fn event(address: Address, from_block: u64, to_block: u64, event: EventKind) -> Self {
        Self { address, from_block, to_block, event: Some(event) }
    }

    /// Topic0 the query is restricted to, if any.
    pub const fn signature_hash(&self) -> Option<alloy::primitives::B256> {
        match self.event {
            Some(EventKind::Data) => Some(AttestedToData::SIGNATURE_HASH),
            Some(EventKind::Risk) => Some(AttestedToRisk::SIGNATURE_HASH),
            Some(EventKind::Error) | None => None,
        }
    }

    /// Build the JSON-RPC filter. Block bounds are hex-encoded on the wire.
    pub fn to_filter(&self) -> Filter {
        let filter =
            Filter::new().address(self.address).from_block(self.from_block).to_block(self.to_block);
        match self.signature_hash() {
            Some(topic) => filter.event_signature(topic),
            None => filter,
        }
    }
}

/// Chain access needed by the block search and event fetchers.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Address of the attestation contract being read.
    fn address(&self) -> Address;

    /// Current block height.
    async fn block_number(&self) -> Result<u64>;

    /// Logs matching `query`.
    async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>>;

    /// Consensus data record and whether consensus was reached.
    async fn data_record(&self, trader_id: U256, epoch: U256) -> Result<(DataRecord, bool)>;

    /// Consensus risk value and whether consensus was reached.
    async fn risk_record(
        &self,
        trader_id: U256,
        epoch: U256,
        parameter_id: U256,
    ) -> Result<(U256, bool)>;
}

/// JSON-RPC client for the attestation contract.
#[derive(Debug)]
pub struct AttestationClient {
    #[debug(skip)]
    provider: DefaultProvider,
    contract: AttestationContract,
    rpc_url: Url,
}

impl AttestationClient {
    /// Connect to `rpc_url` over HTTP with the default retry layer.
    pub fn new(rpc_url: Url, address: Address) -> Self {
        let client = ClientBuilder::default().layer(DEFAULT_RETRY_LAYER).http(rpc_url.clone());
        let provider = ProviderBuilder::new().connect_client(client);
        let contract = AttestationContract::new_readonly(address, provider.clone());
        Self { provider, contract, rpc_url }
    }

    /// Build a client from `config`. Logs and returns `None` when the RPC URL or the
    /// attestation address is missing.
    pub fn from_config(config: &FetchConfig) -> Option<Self> {
        let Some(rpc_url) = config.rpc_url.clone() else {
            error!("RPC URL is not configured");
            return None;
        };
        let Some(address) = config.attestation_address else {
            error!("Attestation contract address is not configured");
            return None;
        };
        Some(Self::new(rpc_url, address))
    }

    /// RPC endpoint the client talks to
    pub const fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }
}

#[async_trait]
impl ChainReader for AttestationClient {
    fn address(&self) -> Address {
        *self.contract.address()
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        Ok(self.provider.get_logs(&query.to_filter()).await?)
    }

    async fn data_record(&self, trader_id: U256, epoch: U256) -> Result<(DataRecord, bool)> {
        Ok(self.contract.data_record(trader_id, epoch).await?)
    }

    async fn risk_record(
        &self,
        trader_id: U256,
        epoch: U256,
        parameter_id: U256,
    ) -> Result<(U256, bool)> {
        Ok(self.contract.risk_record(trader_id, epoch, parameter_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_queries_select_signature() {
        let query = LogQuery::event(Address::ZERO, 1, 2, EventKind::Risk);
        assert_eq!(query.signature_hash(), Some(AttestedToRisk::SIGNATURE_HASH));
        assert_eq!(LogQuery::any(Address::ZERO, 1, 2).signature_hash(), None);
    }

    #[test]
    fn filter_bounds_are_inclusive_block_numbers() {
        let filter = LogQuery::any(Address::ZERO, 10, 19).to_filter();
        assert_eq!(filter.get_from_block(), Some(10));
        assert_eq!(filter.get_to_block(), Some(19));
    }

    #[test]
    fn from_config_requires_rpc_url_and_address() {
        let mut config = FetchConfig::default();
        assert!(AttestationClient::from_config(&config).is_none());

        config.rpc_url = Some(Url::parse("http://127.0.0.1:8545").unwrap());
        assert!(AttestationClient::from_config(&config).is_none());

        config.attestation_address = Some(Address::repeat_byte(3));
        let client = AttestationClient::from_config(&config).unwrap();
        assert_eq!(client.address(), Address::repeat_byte(3));
    }
}
