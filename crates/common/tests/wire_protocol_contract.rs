use annotator_common::protocol::bootstrap::{BootstrapMessage, ConnectionRole};
use annotator_common::protocol::frame_rpc::{PROTOCOL, VERSION};
use annotator_common::protocol::jsonrpc::{JSONRPC_VERSION, METHOD_EXCEPTION, METHOD_NOT_FOUND};
use annotator_common::selector::{PositionSelector, TextPositionSelector, TextQuoteSelector};

fn load_contract() -> serde_json::Value {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../contracts/wire-protocol.json");
    let content = std::fs::read_to_string(path).expect("contract file should be readable");
    serde_json::from_str(&content).expect("contract file should be valid JSON")
}

#[test]
fn frame_rpc_tags_match_contract() {
    let contract = load_contract();
    assert_eq!(contract["frame_rpc"]["protocol"].as_str(), Some(PROTOCOL));
    assert_eq!(contract["frame_rpc"]["version"].as_str(), Some(VERSION));
}

#[test]
fn bootstrap_types_match_contract() {
    let contract = load_contract();
    let expected: Vec<&str> = contract["bootstrap_message_types"]
        .as_array()
        .expect("bootstrap_message_types should be an array")
        .iter()
        .map(|v| v.as_str().expect("type should be a string"))
        .collect();

    let actual: Vec<String> = [
        BootstrapMessage::RequestSidebarConnection { role: ConnectionRole::Guest },
        BootstrapMessage::SidebarConnection { role: None },
    ]
    .iter()
    .map(|message| message.to_value()["type"].as_str().unwrap_or_default().to_string())
    .collect();

    assert_eq!(actual, expected, "bootstrap message types diverged from contract");
}

#[test]
fn connection_roles_match_contract() {
    let contract = load_contract();
    let expected = &contract["connection_roles"];
    let actual =
        serde_json::to_value([ConnectionRole::Guest, ConnectionRole::Notebook]).expect("roles serialize");
    assert_eq!(&actual, expected);
}

#[test]
fn jsonrpc_codes_match_contract() {
    let contract = load_contract();
    assert_eq!(contract["jsonrpc"]["version"].as_str(), Some(JSONRPC_VERSION));
    assert_eq!(
        contract["jsonrpc"]["error_codes"]["method_not_found"].as_i64(),
        Some(i64::from(METHOD_NOT_FOUND))
    );
    assert_eq!(
        contract["jsonrpc"]["error_codes"]["method_exception"].as_i64(),
        Some(i64::from(METHOD_EXCEPTION))
    );
}

#[test]
fn selector_type_tags_match_contract() {
    let contract = load_contract();
    let expected = &contract["selector_types"];

    let range = PositionSelector {
        start_container: String::new(),
        start_offset: 0,
        end_container: String::new(),
        end_offset: 0,
    };
    let quote = TextQuoteSelector { exact: "x".into(), prefix: None, suffix: None };
    let position = TextPositionSelector { start: 0, end: 1 };

    let actual = serde_json::json!([
        serde_json::to_value(&range).expect("range selector serializes")["type"],
        serde_json::to_value(&quote).expect("quote selector serializes")["type"],
        serde_json::to_value(position).expect("position selector serializes")["type"],
    ]);
    assert_eq!(&actual, expected);
}
