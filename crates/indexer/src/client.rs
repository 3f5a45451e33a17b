use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use eyre::{Result, WrapErr, eyre};
use primitives::{
    AttestationEvent, DEFAULT_GRAPHQL_ENDPOINT, DataPayload, EventKind, FetchConfig,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::retry::retry_op;

const DATA_FIELDS: &str = "id traderId epoch attester merkleRoot cid blockNumber transactionHash";
const RISK_FIELDS: &str =
    "id traderId epoch attester parameterId value blockNumber transactionHash";

/// Pagination arguments of one attestations query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestationsQuery {
    /// Page size
    pub first: usize,
    /// Number of items to skip
    pub skip: usize,
    /// Only return attestations at or below this block
    pub before_block: Option<u64>,
    /// Only return attestations at or above this block
    pub after_block: Option<u64>,
    /// Collection to query; both when unset
    pub kind: Option<EventKind>,
}

impl AttestationsQuery {
    /// Query both collections, `first` items at a time.
    pub const fn new(first: usize) -> Self {
        Self { first, skip: 0, before_block: None, after_block: None, kind: None }
    }

    fn includes(&self, kind: EventKind) -> bool {
        self.kind.is_none_or(|only| only == kind)
    }

    fn document(&self) -> String {
        let mut params = vec!["$first: Int!", "$skip: Int!"];
        let mut bounds = Vec::new();
        if self.before_block.is_some() {
            params.push("$beforeBlock: BigInt!");
            bounds.push("blockNumber_lte: $beforeBlock");
        }
        if self.after_block.is_some() {
            params.push("$afterBlock: BigInt!");
            bounds.push("blockNumber_gte: $afterBlock");
        }
        let filter = if bounds.is_empty() {
            String::new()
        } else {
            format!(", where: {{ {} }}", bounds.join(", "))
        };
        let args = format!(
            "first: $first, skip: $skip, orderBy: blockNumber, orderDirection: desc{filter}"
        );

        let mut fields = Vec::new();
        if self.includes(EventKind::Data) {
            fields.push(format!("attestedToDatas({args}) {{ {DATA_FIELDS} }}"));
        }
        if self.includes(EventKind::Risk) {
            fields.push(format!("attestedToRisks({args}) {{ {RISK_FIELDS} }}"));
        }
        format!("query Attestations({}) {{ {} }}", params.join(", "), fields.join(" "))
    }

    fn variables(&self) -> Value {
        let mut vars = json!({ "first": self.first, "skip": self.skip });
        if let Some(block) = self.before_block {
            vars["beforeBlock"] = json!(block.to_string());
        }
        if let Some(block) = self.after_block {
            vars["afterBlock"] = json!(block.to_string());
        }
        vars
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: String,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<AttestationsData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttestationsData {
    #[serde(default)]
    attested_to_datas: Vec<Value>,
    #[serde(default)]
    attested_to_risks: Vec<Value>,
}

/// A data attestation as returned by the indexer. Numeric fields are strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlDataAttestation {
    /// Trader identifier
    pub trader_id: String,
    /// Reporting epoch
    pub epoch: String,
    /// Attester address
    pub attester: Address,
    /// Merkle root of the trade data
    pub merkle_root: B256,
    /// Content identifier
    pub cid: String,
    /// Block of the attestation
    pub block_number: String,
    /// Emitting transaction
    pub transaction_hash: B256,
}

/// A risk attestation as returned by the indexer. Numeric fields are strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRiskAttestation {
    /// Trader identifier
    pub trader_id: String,
    /// Reporting epoch
    pub epoch: String,
    /// Attester address
    pub attester: Address,
    /// Risk parameter
    pub parameter_id: String,
    /// Risk value, decimal or hex
    pub value: String,
    /// Block of the attestation
    pub block_number: String,
    /// Emitting transaction
    pub transaction_hash: B256,
}

fn parse_number(value: &str, field: &str) -> Result<u64> {
    let parsed =
        U256::from_str(value.trim()).wrap_err_with(|| format!("invalid {field}: {value}"))?;
    u64::try_from(parsed).map_err(|_| eyre!("{field} {value} does not fit in 64 bits"))
}

fn normalize_trader_id(value: &str) -> Result<String> {
    let parsed =
        U256::from_str(value.trim()).wrap_err_with(|| format!("invalid trader id: {value}"))?;
    Ok(parsed.to_string())
}

/// Normalize a GraphQL data attestation into the shape produced by the RPC formatter.
pub fn format_graphql_data_event(raw: &GraphQlDataAttestation) -> Result<AttestationEvent> {
    Ok(AttestationEvent::data(
        raw.transaction_hash,
        parse_number(&raw.block_number, "block number")?,
        normalize_trader_id(&raw.trader_id)?,
        parse_number(&raw.epoch, "epoch")?,
        raw.attester,
        DataPayload { merkle_root: raw.merkle_root, cid: raw.cid.clone() },
    ))
}

/// Normalize a GraphQL risk attestation into the shape produced by the RPC formatter.
pub fn format_graphql_risk_event(raw: &GraphQlRiskAttestation) -> Result<AttestationEvent> {
    Ok(AttestationEvent::risk(
        raw.transaction_hash,
        parse_number(&raw.block_number, "block number")?,
        normalize_trader_id(&raw.trader_id)?,
        parse_number(&raw.epoch, "epoch")?,
        raw.attester,
        parse_number(&raw.value, "risk value")?,
        Some(parse_number(&raw.parameter_id, "parameter id")?),
    ))
}

/// One page of formatted attestations.
#[derive(Debug, Clone, Default)]
pub struct AttestationsPage {
    /// Formatted data attestations
    pub data_events: Vec<AttestationEvent>,
    /// Formatted risk attestations
    pub risk_events: Vec<AttestationEvent>,
    /// Raw data items returned, including ones that failed to format
    pub data_items: usize,
    /// Raw risk items returned, including ones that failed to format
    pub risk_items: usize,
}

impl AttestationsPage {
    /// Whether the indexer returned no items at all.
    pub const fn is_empty(&self) -> bool {
        self.data_items == 0 && self.risk_items == 0
    }
}

fn format_items<T, F>(items: Vec<Value>, format: F, kind: &str) -> Vec<AttestationEvent>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<AttestationEvent>,
{
    items
        .into_iter()
        .filter_map(|item| {
            let result = serde_json::from_value::<T>(item)
                .map_err(eyre::Report::from)
                .and_then(|raw| format(&raw));
            match result {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(err = %e, kind, "Skipping malformed GraphQL attestation");
                    None
                }
            }
        })
        .collect()
}

/// Client for the GraphQL attestation indexer.
#[derive(Debug, Clone, Default)]
pub struct IndexerClient {
    http: HttpClient,
}

impl IndexerClient {
    /// Create a new indexer client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client over an existing HTTP client.
    pub const fn with_http(http: HttpClient) -> Self {
        Self { http }
    }

    /// Endpoint to query for `config`.
    pub fn endpoint(config: &FetchConfig) -> Result<Url> {
        match &config.graphql_endpoint {
            Some(url) => Ok(url.clone()),
            None => {
                Url::parse(DEFAULT_GRAPHQL_ENDPOINT).wrap_err("invalid default GraphQL endpoint")
            }
        }
    }

    /// Query one page of data and risk attestations.
    ///
    /// Fails when the response carries GraphQL errors or no `data`.
    pub async fn fetch_graphql_attestations(
        &self,
        config: &FetchConfig,
        query: &AttestationsQuery,
    ) -> Result<AttestationsPage> {
        let endpoint = Self::endpoint(config)?;
        let body = GraphQlRequest { query: query.document(), variables: query.variables() };

        let resp = retry_op(|| async {
            let resp =
                self.http.post(endpoint.clone()).json(&body).send().await?.error_for_status()?;
            Ok(resp.json::<GraphQlResponse>().await?)
        })
        .await
        .wrap_err_with(|| format!("GraphQL request to {endpoint} failed"))?;

        if let Some(errors) = resp.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(eyre!(messages.join(", ")));
        }
        let data = resp.data.ok_or_else(|| eyre!("No data returned from GraphQL"))?;

        let data_items = data.attested_to_datas.len();
        let risk_items = data.attested_to_risks.len();
        let page = AttestationsPage {
            data_events: format_items(data.attested_to_datas, format_graphql_data_event, "data"),
            risk_events: format_items(data.attested_to_risks, format_graphql_risk_event, "risk"),
            data_items,
            risk_items,
        };
        debug!(
            endpoint = %endpoint,
            skip = query.skip,
            data = page.data_events.len(),
            risk = page.risk_events.len(),
            "Fetched GraphQL attestations"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{config_for, data_item, risk_item};
    use mockito::{Matcher, Server};
    use primitives::EventPayload;

    const QUERY: AttestationsQuery = AttestationsQuery::new(100);

    #[tokio::test]
    async fn parses_and_normalizes_attestations() {
        let mut server = Server::new_async().await;
        let body = json!({ "data": {
            "attestedToDatas": [data_item("0x0c", 3, 120)],
            "attestedToRisks": [risk_item("12", 3, 121, "0xfa")],
        }});
        let mock = server
            .mock("POST", "/")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({ "variables": { "first": 100, "skip": 0 } })))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let page = IndexerClient::new()
            .fetch_graphql_attestations(&config_for(&server), &QUERY)
            .await
            .unwrap();
        mock.assert_async().await;

        let data = &page.data_events[0];
        assert_eq!(data.trader_id, "12");
        assert_eq!(data.epoch, 3);
        assert_eq!(data.block_number, 120);
        assert_eq!(data.event_name, EventKind::Data);

        let risk = &page.risk_events[0];
        assert_eq!(risk.data, EventPayload::Risk(250));
        assert_eq!(risk.parameter_id, Some(1));
        assert_eq!(risk.key(), data.key());
    }

    #[tokio::test]
    async fn graphql_errors_are_concatenated() {
        let mut server = Server::new_async().await;
        let body = json!({ "errors": [{ "message": "bad field" }, { "message": "timeout" }] });
        server.mock("POST", "/").with_status(200).with_body(body.to_string()).create_async().await;

        let err = IndexerClient::new()
            .fetch_graphql_attestations(&config_for(&server), &QUERY)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad field, timeout");
    }

    #[tokio::test]
    async fn missing_data_is_an_error() {
        let mut server = Server::new_async().await;
        server.mock("POST", "/").with_status(200).with_body("{}").create_async().await;

        let err = IndexerClient::new()
            .fetch_graphql_attestations(&config_for(&server), &QUERY)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No data returned from GraphQL");
    }

    #[tokio::test]
    async fn malformed_items_are_skipped() {
        let mut server = Server::new_async().await;
        let body = json!({ "data": {
            "attestedToDatas": [data_item("1", 1, 10), { "traderId": "2" }, data_item("x", 1, 9)],
            "attestedToRisks": [],
        }});
        server.mock("POST", "/").with_status(200).with_body(body.to_string()).create_async().await;

        let page = IndexerClient::new()
            .fetch_graphql_attestations(&config_for(&server), &QUERY)
            .await
            .unwrap();
        assert_eq!(page.data_events.len(), 1);
        assert_eq!(page.data_items, 3);
    }

    #[test]
    fn cursor_adds_block_filter() {
        let query = AttestationsQuery { skip: 20, before_block: Some(500), ..QUERY };
        assert!(query.document().contains("where: { blockNumber_lte: $beforeBlock }"));
        assert_eq!(query.variables()["beforeBlock"], "500");
        assert!(!QUERY.document().contains("beforeBlock"));
        assert!(QUERY.document().contains("orderBy: blockNumber"));
    }

    #[test]
    fn kind_selects_one_collection_with_lower_bound() {
        let query =
            AttestationsQuery { after_block: Some(850), kind: Some(EventKind::Risk), ..QUERY };
        let document = query.document();
        assert!(document.contains("attestedToRisks("));
        assert!(!document.contains("attestedToDatas("));
        assert!(document.contains("where: { blockNumber_gte: $afterBlock }"));
        assert!(document.contains("$afterBlock: BigInt!"));
        assert_eq!(query.variables()["afterBlock"], "850");
        assert!(query.variables().get("beforeBlock").is_none());

        let data = AttestationsQuery { kind: Some(EventKind::Data), ..QUERY };
        assert!(data.document().contains("attestedToDatas("));
        assert!(!data.document().contains("attestedToRisks("));
    }

    #[test]
    fn default_endpoint_is_used_without_config() {
        let url = IndexerClient::endpoint(&FetchConfig::default()).unwrap();
        assert_eq!(url.as_str(), DEFAULT_GRAPHQL_ENDPOINT);
    }
}
