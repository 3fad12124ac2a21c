use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::core::SimulatorInputs;

pub const SHARE_QUERY_KEY: &str = "settings";

pub fn encode(inputs: &SimulatorInputs) -> String {
    // Plain data with string keys always serializes.
    let json = serde_json::to_vec(inputs).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode(token: &str) -> Option<SimulatorInputs> {
    let bytes = URL_SAFE_NO_PAD.decode(token.trim()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn share_url(base: &str, inputs: &SimulatorInputs) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{SHARE_QUERY_KEY}={}", encode(inputs))
}

pub fn token_from_query(query: &str) -> Option<&str> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == SHARE_QUERY_KEY)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
