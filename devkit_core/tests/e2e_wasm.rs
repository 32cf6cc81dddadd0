#![cfg(target_arch = "wasm32")]

use serde_json::{json, Value as JsonValue};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use devkit_core::{
    decode_text, diff_json, diff_lines, digest_text, encode_content, encode_text, format_code,
    hash_content, jwt_decode, jwt_encode, minify_code, transform_format,
};

wasm_bindgen_test_configure!(run_in_browser);

fn js_to_json(value: JsValue) -> JsonValue {
    serde_wasm_bindgen::from_value(value).expect("JsValue -> JSON map")
}

fn value_of(result: JsValue) -> JsonValue {
    let map = js_to_json(result);
    assert_eq!(map["ok"], json!(true), "expected success, got {map}");
    map["value"].clone()
}

fn error_kind(result: JsValue) -> String {
    let map = js_to_json(result);
    assert_eq!(map["ok"], json!(false), "expected failure, got {map}");
    map["error"]["kind"]
        .as_str()
        .unwrap_or_else(|| panic!("missing error kind in {map}"))
        .to_string()
}

#[wasm_bindgen_test]
fn codecs_round_trip_through_the_envelope() {
    assert_eq!(value_of(encode_text("base64", "hi")), json!("aGk="));
    assert_eq!(value_of(decode_text("base64", "aGk=")), json!("hi"));
    assert_eq!(value_of(encode_text("url", "a b&c")), json!("a%20b%26c"));
    assert_eq!(error_kind(decode_text("base64", "not base64!")), "InvalidEncoding");
    assert_eq!(error_kind(encode_text("rot13", "hi")), "UnsupportedOperation");
}

#[wasm_bindgen_test]
fn encode_content_lists_every_codec() {
    let map = js_to_json(encode_content("hi"));
    assert_eq!(map["base64"], json!("aGk="));
    assert_eq!(map["hex"], json!("68 69"));
}

#[wasm_bindgen_test]
fn transform_uses_options_and_defaults() {
    let out = value_of(transform_format(
        "json",
        "yaml",
        r#"{"name":"John"}"#,
        JsValue::UNDEFINED,
    ));
    assert_eq!(out.as_str().map(str::trim_end), Some("name: John"));

    let opts = js_sys::JSON::parse(r#"{"xmlRoot":"doc"}"#).unwrap();
    let xml = value_of(transform_format("json", "xml", r#"[1]"#, opts));
    assert!(xml.as_str().unwrap().contains("<doc>"), "{xml}");
}

#[wasm_bindgen_test]
fn transform_reports_position_of_bad_input() {
    let map = js_to_json(transform_format("json", "yaml", "{\n  \"a\": ,\n}", JsValue::NULL));
    assert_eq!(map["ok"], json!(false));
    assert_eq!(map["error"]["kind"], json!("InvalidJson"));
    assert_eq!(map["error"]["position"]["line"], json!(2));
}

#[wasm_bindgen_test]
fn format_and_minify_code() {
    assert_eq!(value_of(format_code("json", r#"{"a":1}"#, None)), json!("{\n  \"a\": 1\n}"));
    assert_eq!(value_of(minify_code("json", "{ \"a\" : 1 }")), json!(r#"{"a":1}"#));
    assert_eq!(error_kind(format_code("xml", "<a><b></a>", Some(2))), "MalformedMarkup");
    assert_eq!(error_kind(format_code("cobol", "", None)), "UnsupportedOperation");
}

#[wasm_bindgen_test]
fn line_and_structural_diffs() {
    let diff = value_of(diff_lines("a\nb\nc", "a\nx\nc", JsValue::UNDEFINED));
    let kinds: Vec<&str> = diff["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, ["Equal", "Changed", "Equal"]);

    let changes = value_of(diff_json(r#"{"a":1}"#, r#"{"a":2,"b":true}"#));
    assert_eq!(changes[0]["path"], json!("a"));
    assert_eq!(changes[0]["kind"], json!("Modified"));
    assert_eq!(changes[1]["kind"], json!("Added"));
    assert_eq!(error_kind(diff_json("{}", "[]")), "UnsupportedOperation");
}

#[wasm_bindgen_test]
fn digests_and_hmacs() {
    let digest = value_of(digest_text("sha256", "", None));
    assert_eq!(
        digest["hex"],
        json!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
    );
    assert_eq!(digest["byteLength"], json!(32));
    assert_eq!(
        value_of(digest_text("HMAC-SHA256", "message", Some("secret".into())))["hex"],
        json!("8b5f48702995c1598c573db1e21866a9b825d4a794d169d7060a03605796360b")
    );
    assert_eq!(error_kind(digest_text("hmac-sha256", "message", None)), "UnsupportedOperation");

    let all = js_to_json(hash_content("abc"));
    assert_eq!(
        all["sha1"],
        json!("a9993e364706816aba3e25717850c26c9cd0d89d")
    );
}

#[wasm_bindgen_test]
fn tokens_encode_and_decode() {
    let token = value_of(jwt_encode(r#"{"sub":"123"}"#, "k", "HS256"));
    let parts = value_of(jwt_decode(token.as_str().unwrap()));
    assert_eq!(parts["header"]["alg"], json!("HS256"));
    assert_eq!(parts["payload"], json!({"sub": "123"}));
    assert_eq!(error_kind(jwt_decode("a.b")), "MalformedToken");
}
