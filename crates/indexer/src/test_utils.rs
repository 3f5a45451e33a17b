use mockito::Server;
use primitives::FetchConfig;
use serde_json::{Value, json};
use url::Url;

pub(crate) fn data_item(trader: &str, epoch: u64, block: u64) -> Value {
    json!({
        "id": format!("0x{block:02x}-0"),
        "traderId": trader,
        "epoch": epoch.to_string(),
        "attester": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "merkleRoot": format!("0x{}", "11".repeat(32)),
        "cid": format!("cid-{trader}-{epoch}"),
        "blockNumber": block.to_string(),
        "transactionHash": format!("0x{}", "22".repeat(32)),
    })
}

pub(crate) fn risk_item(trader: &str, epoch: u64, block: u64, value: &str) -> Value {
    json!({
        "id": format!("0x{block:02x}-1"),
        "traderId": trader,
        "epoch": epoch.to_string(),
        "attester": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
        "parameterId": "1",
        "value": value,
        "blockNumber": block.to_string(),
        "transactionHash": format!("0x{}", "33".repeat(32)),
    })
}

pub(crate) fn page_body(data: Vec<Value>, risk: Vec<Value>) -> String {
    json!({ "data": { "attestedToDatas": data, "attestedToRisks": risk } }).to_string()
}

pub(crate) fn config_for(server: &Server) -> FetchConfig {
    FetchConfig { graphql_endpoint: Some(Url::parse(&server.url()).unwrap()), ..Default::default() }
}
