//! Layered configuration: built-in defaults, then `.webevalrc`, then environment.

use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let config_path = default_config_path();
        let mut cfg = Self::from_file(&config_path);

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                cfg.inner.insert(k, v);
            }
        }

        cfg
    }

    /// Defaults overlaid with the `KEY=VALUE` lines of `path`, without the environment.
    pub fn from_file(path: &Path) -> Self {
        let mut map = default_map();

        if path.exists() {
            if let Ok(file) = fs::File::open(path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        Self { inner: map, config_path: path.to_path_buf() }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn base_url(&self) -> String {
        self.get("WEBEVAL_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn evaluate_url(&self) -> String {
        join_url(&self.base_url(), &self.get("EVALUATE_PATH").unwrap_or_default())
    }

    pub fn resource_base(&self) -> String {
        join_url(&self.base_url(), &self.get("RESOURCE_PATH").unwrap_or_default())
    }

    pub fn request_timeout(&self) -> u64 {
        self.get("REQUEST_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60)
    }

    pub fn page_size(&self) -> usize {
        self.get_usize("PAGE_SIZE").filter(|n| *n > 0).unwrap_or(12)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.get_path("CACHE_PATH")
            .unwrap_or_else(|| env::temp_dir().join("webeval").join("cache"))
    }

    pub fn selection_path(&self) -> PathBuf {
        self.get_path("SELECTION_PATH")
            .unwrap_or_else(|| env::temp_dir().join("webeval").join("selection.json"))
    }
}

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "EVALUATE_PATH",
        "RESOURCE_PATH",
        "REQUEST_TIMEOUT",
        "PAGE_SIZE",
        "CACHE_PATH",
        "CACHE_LENGTH",
        "SELECTION_PATH",
        "PATH_QUERY",
        "PATH_VARS",
        "CONTENT_TYPE",
        "DISABLE_BOOTSTRAP",
    ];

    KEYS.contains(&k) || k.starts_with("WEBEVAL_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("webeval").join(".webevalrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    let temp = env::temp_dir().join("webeval");

    // Paths
    m.insert("CACHE_PATH".into(), temp.join("cache").to_string_lossy().into_owned());
    m.insert(
        "SELECTION_PATH".into(),
        temp.join("selection.json").to_string_lossy().into_owned(),
    );

    // Endpoints
    m.insert("WEBEVAL_BASE_URL".into(), DEFAULT_BASE_URL.into());
    m.insert("EVALUATE_PATH".into(), "/webeval/web/evaluate".into());
    m.insert("RESOURCE_PATH".into(), "/webeval/web/bytes".into());

    // Numbers
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("PAGE_SIZE".into(), "12".into());
    m.insert("CACHE_LENGTH".into(), "200".into());

    // Gallery
    m.insert("PATH_QUERY".into(), "/Users/ryan/*{x}*".into());
    m.insert("PATH_VARS".into(), "x=0".into());
    m.insert("CONTENT_TYPE".into(), "image/png".into());

    // Bools as strings
    m.insert("DISABLE_BOOTSTRAP".into(), "false".into());

    m
}
