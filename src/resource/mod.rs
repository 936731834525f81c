//! Binary resource addressing and the keyed byte cache.
//!
//! A resource URL embeds the code expression that produces the bytes plus the
//! current cache epoch. Identical inputs always give the identical URL, and
//! bumping the epoch changes every URL at once, which is the only way cached
//! bytes are invalidated.

use std::{
    fs,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::Result;
use serde_json::json;
use tracing::{debug, warn};

use crate::{config::Config, error::ResourceLoadError, query::build_query_url};

/// Process-local counter embedded in resource URLs. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheEpoch(u64);

impl CacheEpoch {
    pub fn value(self) -> u64 {
        self.0
    }

    /// Advance to the next epoch and return it.
    pub fn bump(&mut self) -> Self {
        self.0 += 1;
        *self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceQuery {
    pub code_expression: String,
    pub content_type: String,
    pub cache_key: u64,
}

impl ResourceQuery {
    pub fn new(code_expression: impl Into<String>, content_type: impl Into<String>, epoch: CacheEpoch) -> Self {
        Self {
            code_expression: code_expression.into(),
            content_type: content_type.into(),
            cache_key: epoch.value(),
        }
    }

    pub fn url(&self, base_path: &str, suggested_filename: &str) -> String {
        build_resource_url(
            base_path,
            suggested_filename,
            &self.code_expression,
            &self.content_type,
            self.cache_key,
        )
    }
}

/// `GET <base>/<filename>?code=..&content_type=..&cache_key=..`
///
/// The filename segment only names downloads; the service ignores it.
pub fn build_resource_url(
    base_path: &str,
    suggested_filename: &str,
    code_expression: &str,
    content_type: &str,
    cache_key: u64,
) -> String {
    let path = if suggested_filename.is_empty() {
        base_path.trim_end_matches('/').to_string()
    } else {
        format!(
            "{}/{}",
            base_path.trim_end_matches('/'),
            urlencoding::encode(suggested_filename)
        )
    };
    build_query_url(
        &path,
        [
            ("code", json!(code_expression)),
            ("content_type", json!(content_type)),
            ("cache_key", json!(cache_key)),
        ],
    )
}

/// Last path component, used as the cosmetic filename of a resource URL.
pub fn suggested_filename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// On-disk byte cache keyed by resource URL within one session.
///
/// Since every URL carries its epoch, an entry is effectively keyed by
/// `(session, resource, epoch)`. The epoch restarts at 0 in every process, so
/// each cache instance gets its own session id and never sees entries written
/// by another one. Unreachable entries age out through pruning, least recently
/// used first.
#[derive(Debug, Clone)]
pub struct ResourceCache {
    length: usize,
    cache_path: PathBuf,
    session: String,
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn new_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", process::id(), nanos, n)
}

impl ResourceCache {
    pub fn from_config(cfg: &Config) -> Self {
        let len = cfg.get_usize("CACHE_LENGTH").unwrap_or(200);
        Self::new(cfg.cache_path(), len)
    }

    pub fn new(cache_path: PathBuf, length: usize) -> Self {
        let _ = fs::create_dir_all(&cache_path);
        Self { length, cache_path, session: new_session_id() }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// File name of the entry for `url` in this session.
    pub fn key_for(&self, url: &str) -> String {
        format!("{:x}", md5::compute(format!("{}\n{}", self.session, url).as_bytes()))
    }

    /// Read an entry and mark it as recently used.
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.cache_path.join(self.key_for(url));
        let bytes = fs::read(&path).ok()?;
        if let Err(e) = touch(&path) {
            debug!(error = %e, "could not refresh cache entry mtime");
        }
        Some(bytes)
    }

    pub fn set(&self, url: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.cache_path.join(self.key_for(url)), bytes)?;
        self.prune()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        fs::read_dir(&self.cache_path)
            .map(|rd| rd.filter_map(|e| e.ok()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&self) -> Result<()> {
        let mut entries: Vec<_> = fs::read_dir(&self.cache_path)?.filter_map(|e| e.ok()).collect();
        if entries.len() <= self.length {
            return Ok(());
        }
        entries.sort_by_key(|e| e.metadata().and_then(|m| m.modified()).ok());
        let to_delete = entries.len() - self.length;
        for entry in entries.iter().take(to_delete) {
            let _ = fs::remove_file(entry.path());
        }
        debug!(removed = to_delete, "pruned resource cache");
        Ok(())
    }
}

fn touch(path: &Path) -> std::io::Result<()> {
    fs::File::options().write(true).open(path)?.set_modified(SystemTime::now())
}

/// Fetches resource bytes over GET, serving repeats from the [`ResourceCache`].
#[derive(Debug, Clone)]
pub struct ResourceFetcher {
    http: reqwest::Client,
    cache: Option<ResourceCache>,
}

impl ResourceFetcher {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(Duration::from_secs(cfg.request_timeout()), Some(ResourceCache::from_config(cfg)))
    }

    pub fn new(timeout: Duration, cache: Option<ResourceCache>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, cache })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceLoadError> {
        if let Some(bytes) = self.cache.as_ref().and_then(|c| c.get(url)) {
            debug!(url, "resource cache hit");
            return Ok(bytes);
        }

        let fail = |reason: String| ResourceLoadError { url: url.to_string(), reason };
        let resp = self.http.get(url).send().await.map_err(|e| fail(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }
        let bytes = resp.bytes().await.map_err(|e| fail(e.to_string()))?.to_vec();

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(url, &bytes) {
                warn!(error = %e, "failed to store resource in cache");
            }
        }
        Ok(bytes)
    }
}
