//! Query-string URL construction for the evaluation endpoints.
//!
//! Scalars are percent-encoded as their plain text; objects, arrays and `null`
//! are serialized to compact JSON first and then percent-encoded, so a nested
//! parameter arrives server-side as one JSON document.

use std::borrow::Borrow;

use serde_json::Value;

/// Append `params` to `path` as a query string, keeping the iteration order.
///
/// ```
/// use serde_json::json;
/// let url = webeval::query::build_query_url(
///     "https://example.com/api",
///     [("user", json!("jane")), ("details", json!({"age": 29, "city": "New York"}))],
/// );
/// assert_eq!(
///     url,
///     "https://example.com/api?user=jane&details=%7B%22age%22%3A29%2C%22city%22%3A%22New%20York%22%7D"
/// );
/// ```
pub fn build_query_url<I, K, V>(path: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Borrow<Value>,
{
    let query = params
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key.as_ref()),
                urlencoding::encode(&value_text(value.borrow()))
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", path, query)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        // numbers and bools print the same as their JSON form
        other => other.to_string(),
    }
}

/// Split a URL built by [`build_query_url`] back into its path and decoded pairs.
pub fn parse_query_url(url: &str) -> (String, Vec<(String, String)>) {
    let Some((path, query)) = url.split_once('?') else {
        return (url.to_string(), Vec::new());
    };
    let pairs = query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (k, v) = part.split_once('=').unwrap_or((part, ""));
            (decode(k), decode(v))
        })
        .collect();
    (path.to_string(), pairs)
}

fn decode(text: &str) -> String {
    urlencoding::decode(text)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| text.to_string())
}
