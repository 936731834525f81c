//! Python snippets shipped to the evaluation service.

use serde_json::{json, Map, Value};

use super::{vars, Vars};

/// Setup code run once per session with `sync: true`; later listing calls
/// reference `glob_search` by name.
pub const BOOTSTRAP: &str = r#"
import os
import base64
import glob


def glob_search(query: str, replacements: dict):
    """
    Query is like "/path/to/{x:05}/image_*/{y}.png"
    Replacements is like {"x":5,"y":100}
    Returns a list of globbed paths
    """
    query = query.format(**replacements)
    return glob.glob(query)
"#;

/// Files of the service's working directory, preceded by `".."`.
pub const LIST_DIRECTORY: &str =
    r#"[".."]+[f for f in __import__("os").listdir() if __import__("os").path.isfile(f)]"#;

/// Base64 text of the file bound to `f`.
pub const READ_BASE64: &str = "__import__('base64').b64encode(open(f, 'rb').read()).decode('utf-8')";

/// Call into the bootstrapped `glob_search` helper.
pub fn glob_search(query: &str, replacements: &Map<String, Value>) -> (String, Vars) {
    (
        "glob_search(query, replacements)".to_string(),
        vars([("query", json!(query)), ("replacements", Value::Object(replacements.clone()))]),
    )
}

/// Self-contained expression returning the raw bytes of `path`.
///
/// The path is embedded as a JSON string literal, which Python reads back
/// unchanged, so the expression can travel inside a URL.
pub fn file_bytes_expression(path: &str) -> String {
    format!("open({}, 'rb').read()", Value::String(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_expression_quotes_path() {
        assert_eq!(file_bytes_expression("/img/a.png"), r#"open("/img/a.png", 'rb').read()"#);
        assert_eq!(
            file_bytes_expression(r#"/odd "name".png"#),
            r#"open("/odd \"name\".png", 'rb').read()"#
        );
    }

    #[test]
    fn glob_search_binds_both_variables() {
        let mut replacements = Map::new();
        replacements.insert("x".into(), json!(7));
        let (code, bound) = glob_search("/data/*{x}*", &replacements);
        assert!(code.starts_with("glob_search("));
        assert_eq!(bound["query"], json!("/data/*{x}*"));
        assert_eq!(bound["replacements"], json!({"x": 7}));
        assert!(BOOTSTRAP.contains("def glob_search"));
    }
}
