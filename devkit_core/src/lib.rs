//! Format transformation, codec, diff and digest engine.
//!
//! The engine modules are plain Rust and usable from any host. The
//! `#[wasm_bindgen]` functions in this file are thin adapters for the browser
//! UI: they parse names and option objects, call into the engine and render
//! every fallible result as `{ ok: true, value }` or
//! `{ ok: false, error: { kind, message, position? } }`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use console_error_panic_hook::set_once as set_panic_hook;

pub mod codec;
pub mod config;
pub mod convert;
pub mod crypto;
pub mod diff;
pub mod error;
pub mod format;
pub mod logging;
pub mod token;

pub use codec::{Codec, CodecResult};
pub use config::EngineConfig;
pub use convert::{Format, GenericValue, SerializeOptions};
pub use crypto::{CryptoProvider, DigestAlgorithm, DigestRequest, DigestResult, KeyPair, KeySize, RustCrypto};
pub use diff::{DiffConfig, LineDiff, LineDiffEntry, StructuralDiffEntry};
pub use error::{ErrorKind, ErrorReport};
pub use format::Language;
pub use token::{TokenAlgorithm, TokenParts};

use crate::error::{ConvertError, CryptoError, FormatError, ParseError};

#[wasm_bindgen(start)]
pub fn wasm_start() {
    set_panic_hook();
}

/// Wire shape of every fallible adapter.
#[derive(Serialize)]
struct Outcome<'a, T> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

fn outcome<T, E>(result: &Result<T, E>) -> Outcome<'_, T>
where
    for<'e> ErrorReport: From<&'e E>,
{
    match result {
        Ok(value) => Outcome {
            ok: true,
            value: Some(value),
            error: None,
        },
        Err(err) => Outcome {
            ok: false,
            value: None,
            error: Some(ErrorReport::from(err)),
        },
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    // Plain objects rather than ES Maps for serde_json mappings.
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .unwrap_or_else(|err| JsValue::from_str(&err.to_string()))
}

fn envelope<T: Serialize, E>(result: Result<T, E>) -> JsValue
where
    for<'e> ErrorReport: From<&'e E>,
{
    to_js(&outcome(&result))
}

fn options<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, ParseError> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| {
        ParseError::new(ErrorKind::StructuralViolation, format!("invalid options: {err}"))
    })
}

#[wasm_bindgen]
pub fn init_logging(filter: Option<String>) {
    logging::init(filter.as_deref());
}

#[wasm_bindgen]
pub fn encode_text(codec: &str, input: &str) -> JsValue {
    envelope(codec.parse::<Codec>().and_then(|codec| codec::encode(codec, input)))
}

#[wasm_bindgen]
pub fn decode_text(codec: &str, input: &str) -> JsValue {
    envelope(codec.parse::<Codec>().and_then(|codec| codec::decode(codec, input)))
}

#[wasm_bindgen]
pub fn encode_content(input: &str) -> JsValue {
    to_js(&codec::encode_all(input))
}

#[wasm_bindgen]
pub fn transform_format(from: &str, to: &str, input: &str, opts: JsValue) -> JsValue {
    envelope(run_transform(from, to, input, opts))
}

fn run_transform(from: &str, to: &str, input: &str, opts: JsValue) -> Result<String, ConvertError> {
    let from: Format = from.parse()?;
    let to: Format = to.parse()?;
    let opts: SerializeOptions = options(opts)?;
    convert::convert(from, to, input, &opts)
}

#[wasm_bindgen]
pub fn format_code(language: &str, input: &str, indent: Option<u32>) -> JsValue {
    let result = language
        .parse::<Language>()
        .map_err(FormatError::from)
        .and_then(|language| format::format(language, input, indent.map_or(2, |n| n as usize)));
    envelope(result)
}

#[wasm_bindgen]
pub fn minify_code(language: &str, input: &str) -> JsValue {
    envelope(
        language
            .parse::<Language>()
            .map(|language| format::minify(language, input)),
    )
}

#[wasm_bindgen]
pub fn diff_lines(old_text: &str, new_text: &str, opts: JsValue) -> JsValue {
    envelope(options::<DiffConfig>(opts).map(|config| diff::line_diff(old_text, new_text, &config)))
}

#[wasm_bindgen]
pub fn diff_unified(old_text: &str, new_text: &str, old_name: &str, new_name: &str, opts: JsValue) -> JsValue {
    envelope(
        options::<DiffConfig>(opts)
            .map(|config| diff::unified_diff(old_text, new_text, old_name, new_name, &config)),
    )
}

#[wasm_bindgen]
pub fn diff_json(old_text: &str, new_text: &str) -> JsValue {
    envelope(diff::json_diff(old_text, new_text))
}

/// `algorithm` is a digest name or an `HMAC-<digest>` form; `key` is only
/// read for the latter.
#[wasm_bindgen]
pub fn digest_text(algorithm: &str, input: &str, key: Option<String>) -> JsValue {
    let request = DigestRequest {
        algorithm: algorithm.to_string(),
        input: input.as_bytes().to_vec(),
        key: key.map(String::into_bytes),
    };
    envelope(crypto::compute(&request))
}

#[wasm_bindgen]
pub fn hash_content(input: &str) -> JsValue {
    to_js(&crypto::hash_all(input.as_bytes()))
}

#[wasm_bindgen]
pub fn hash_hmac_content(key: &str, input: &str) -> JsValue {
    envelope(crypto::hmac_all(key.as_bytes(), input.as_bytes()))
}

/// CPU-bound; call it from a Web Worker for 4096-bit keys.
#[wasm_bindgen]
pub fn generate_key_pair(bits: u32) -> JsValue {
    let result: Result<KeyPair, CryptoError> =
        KeySize::try_from(bits).and_then(crypto::generate_rsa_key_pair);
    envelope(result)
}

#[wasm_bindgen]
pub fn jwt_decode(token: &str) -> JsValue {
    envelope(token::decode_token(token))
}

#[wasm_bindgen]
pub fn jwt_encode(payload: &str, secret: &str, algorithm: &str) -> JsValue {
    envelope(
        algorithm
            .parse::<TokenAlgorithm>()
            .and_then(|algorithm| token::encode_token(payload, secret, algorithm)),
    )
}
