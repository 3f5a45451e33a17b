//! `ChainIO` is a library for interacting with the attestation contract.
use IAttestation::{IAttestationErrors, IAttestationInstance};

use alloy::{
    contract::{Error as ContractError, Result as ContractResult},
    primitives::{Address, U256},
    providers::{
        ProviderBuilder, RootProvider, fillers::FillProvider, utils::JoinedRecommendedFillers,
    },
    rpc::{client::ClientBuilder, types::Filter},
    sol,
};
use alloy_sol_types::{Error as SolError, SolInterface};
use derive_more::derive::Deref;
use url::Url;

pub use IAttestation::{AttestedToData, AttestedToRisk, DataRecord};

/// Alias to the default provider with all recommended fillers (read-only).
pub type DefaultProvider = FillProvider<JoinedRecommendedFillers, RootProvider>;

/// A wrapper over an `IAttestation` contract that exposes the read-only calls and
/// log filters used for proof discovery.
#[derive(Debug, Clone, Deref)]
pub struct AttestationContract(IAttestationInstance<DefaultProvider>);

impl AttestationContract {
    /// Create a new `AttestationContract` at the given address on an existing provider.
    pub const fn new_readonly(address: Address, provider: DefaultProvider) -> Self {
        Self(IAttestationInstance::new(address, provider))
    }

    /// Create a new `AttestationContract` over a plain HTTP client.
    pub fn from_address<U: Into<Url>>(el_client_url: U, address: Address) -> Self {
        let client = ClientBuilder::default().http(el_client_url.into());
        let provider = ProviderBuilder::new().connect_client(client);
        Self::new_readonly(address, provider)
    }

    /// Returns a log [`Filter`] based on the `AttestedToData` event.
    pub fn data_filter(&self) -> Filter {
        self.0.AttestedToData_filter().filter
    }

    /// Returns a log [`Filter`] based on the `AttestedToRisk` event.
    pub fn risk_filter(&self) -> Filter {
        self.0.AttestedToRisk_filter().filter
    }

    /// Read the consensus data record for a trader and epoch.
    pub async fn data_record(
        &self,
        trader_id: U256,
        epoch: U256,
    ) -> ContractResult<(DataRecord, bool)> {
        match self.0.getDataRecord(trader_id, epoch).call().await {
            Ok(ret) => Ok((ret.record, ret.hasConsensus)),
            Err(err) => Err(decode_error(err)),
        }
    }

    /// Read the consensus risk value for a trader, epoch and risk parameter.
    pub async fn risk_record(
        &self,
        trader_id: U256,
        epoch: U256,
        parameter_id: U256,
    ) -> ContractResult<(U256, bool)> {
        match self.0.getRiskRecord(trader_id, epoch, parameter_id).call().await {
            Ok(ret) => Ok((ret.value, ret.hasConsensus)),
            Err(err) => Err(decode_error(err)),
        }
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface IAttestation {
        error UnknownTrader(uint256 traderId);
        error EpochNotFinalized(uint256 epoch);
        error InvalidParameter(uint256 parameterId);

        #[derive(Default, PartialEq, Eq)]
        struct DataRecord {
            bytes32 merkleRoot;
            string cid;
        }

        /// @notice Emitted when an attester publishes a trader's encrypted trade data.
        #[derive(Default)]
        event AttestedToData(
            uint256 indexed traderId,
            uint256 indexed epoch,
            address indexed attester,
            bytes32 merkleRoot,
            string cid
        );

        /// @notice Emitted when an attester publishes a risk parameter for a trader.
        #[derive(Default)]
        event AttestedToRisk(
            uint256 indexed traderId,
            uint256 indexed epoch,
            address indexed attester,
            uint256 parameterId,
            uint256 value
        );

        /// @notice Returns the consensus data record for a trader and epoch.
        function getDataRecord(uint256 traderId, uint256 epoch)
            external
            view
            returns (DataRecord memory record, bool hasConsensus);

        /// @notice Returns the consensus risk value for a trader, epoch and parameter.
        function getRiskRecord(uint256 traderId, uint256 epoch, uint256 parameterId)
            external
            view
            returns (uint256 value, bool hasConsensus);
    }
}

/// Replace a revert with the decoded contract error when it is one of ours.
fn decode_error(err: ContractError) -> ContractError {
    match try_parse_contract_error::<IAttestationErrors>(err) {
        Ok(decoded) => SolError::custom(format!("{decoded:?}")).into(),
        Err(err) => err,
    }
}

/// Try to parse a contract error as a specific interface error.
pub fn try_parse_contract_error<I: SolInterface>(error: ContractError) -> Result<I, ContractError> {
    error.as_decoded_interface_error::<I>().ok_or(error)
}
