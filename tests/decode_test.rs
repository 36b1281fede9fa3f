//! Table-driven payload decoding cases

use ferry::core::decode::{decode, decode_str};
use ferry::domain::{ExportPayload, MigrationError};
use serde_json::json;
use test_case::test_case;

#[test_case("[]", 0 ; "empty array")]
#[test_case(r#"[{"energia_id": "E1"}]"#, 1 ; "single object")]
#[test_case(r#"[{"a": 1}, {"b": null}, {}]"#, 3 ; "heterogeneous objects")]
#[test_case("  [ {\"a\": [1, 2]} ]\n", 1 ; "surrounding whitespace")]
fn test_valid_payloads(text: &str, expected: usize) {
    let records = decode_str("tb_app_energia", text).unwrap();
    assert_eq!(records.len(), expected);
}

#[test_case("{not valid json" ; "malformed json")]
#[test_case("" ; "empty payload")]
#[test_case(r#"{"energia_id": "E1"}"# ; "object instead of array")]
#[test_case("[1, 2]" ; "array of numbers")]
#[test_case(r#"[{"a": 1}, "text"]"# ; "mixed elements")]
#[test_case("null" ; "null")]
fn test_invalid_payloads(text: &str) {
    let err = decode_str("tb_app_energia", text).unwrap_err();
    assert_eq!(err.table, "tb_app_energia");

    let classified: MigrationError = err.into();
    assert!(matches!(classified, MigrationError::Decode { .. }));
    assert_eq!(classified.status_code(), 500);
}

#[test]
fn test_records_keep_payload_order_and_fields() {
    let records = decode_str(
        "tb_app_clientes",
        r#"[{"cliente_id": "5", "nome": "Ana"}, {"cliente_id": "6", "nome": "Rui"}]"#,
    )
    .unwrap();

    assert_eq!(records[0].get("nome"), Some(&json!("Ana")));
    assert_eq!(records[1].get("cliente_id"), Some(&json!("6")));
}

#[tokio::test]
async fn test_streamed_payload_matches_inline() {
    let text = r#"[{"transacao_id": 1}, {"transacao_id": 2}]"#;
    let stream = ExportPayload::from_reader(std::io::Cursor::new(text.as_bytes().to_vec()));

    let streamed = decode("tb_app_transacao", stream).await.unwrap();
    let inline = decode("tb_app_transacao", ExportPayload::from(text)).await.unwrap();

    assert_eq!(streamed, inline);
}
