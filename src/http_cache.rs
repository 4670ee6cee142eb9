use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const CACHE_DIR: &str = "prop_projector";
const RESPONSES_DIR: &str = "responses";
pub const MAX_CACHED_RESPONSES: usize = 512;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
#[error("http {status} from {url}")]
pub struct HttpStatusError {
    pub status: StatusCode,
    pub url: String,
}

impl HttpStatusError {
    pub fn is_transient(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS || self.status.is_server_error()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    url: String,
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
}

pub fn fetch_json_cached(
    client: &Client,
    url: &str,
    extra_headers: &[(&str, &str)],
) -> Result<String> {
    let dir = responses_dir();
    let path = dir.as_deref().map(|d| response_path(d, url));
    let cached = path
        .as_deref()
        .and_then(read_response)
        .filter(|c| c.url == url);

    let mut req = client.get(url).header(USER_AGENT, "Mozilla/5.0");
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    if let Some(c) = &cached {
        if let Some(etag) = &c.etag {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &c.last_modified {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().context("request failed")?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        let c = cached.ok_or_else(|| anyhow!("304 from {url} with nothing cached"))?;
        return Ok(c.body);
    }
    if !status.is_success() {
        return Err(HttpStatusError {
            status,
            url: url.to_string(),
        }
        .into());
    }

    let header = |name: reqwest::header::HeaderName| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let etag = header(ETAG);
    let last_modified = header(LAST_MODIFIED);
    let body = resp.text().context("failed reading body")?;

    if let (Some(dir), Some(path)) = (dir.as_deref(), path.as_deref()) {
        let entry = CachedResponse {
            url: url.to_string(),
            body: body.clone(),
            etag,
            last_modified,
        };
        if let Err(err) = write_response(path, &entry) {
            debug!("http cache write skipped for {url}: {err:#}");
        } else if cached.is_none()
            && let Err(err) = prune_responses(dir, MAX_CACHED_RESPONSES)
        {
            debug!("http cache prune failed: {err:#}");
        }
    }
    Ok(body)
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn responses_dir() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(RESPONSES_DIR))
}

fn response_path(dir: &Path, url: &str) -> PathBuf {
    let digest = Sha256::digest(url.as_bytes());
    let name: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    dir.join(format!("{name}.json"))
}

fn read_response(path: &Path) -> Option<CachedResponse> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn write_response(path: &Path, entry: &CachedResponse) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));
    let json = serde_json::to_string(entry).context("serialize cached response")?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

fn prune_responses(dir: &Path, keep: usize) -> Result<usize> {
    let mut files: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)
        .with_context(|| format!("list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|p| {
            let modified = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((modified, p))
        })
        .collect();
    if files.len() <= keep {
        return Ok(0);
    }
    files.sort();
    let excess = files.len() - keep;
    let mut removed = 0;
    for (_, path) in files.into_iter().take(excess) {
        if fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn scratch(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "prop_projector_http_{label}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn entry(url: &str) -> CachedResponse {
        CachedResponse {
            url: url.to_string(),
            body: format!("{{\"url\":\"{url}\"}}"),
            etag: Some("\"abc\"".to_string()),
            last_modified: None,
        }
    }

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        let err = |code: u16| HttpStatusError {
            status: StatusCode::from_u16(code).unwrap(),
            url: "http://example.invalid".to_string(),
        };
        assert!(err(429).is_transient());
        assert!(err(503).is_transient());
        assert!(!err(404).is_transient());
        assert!(!err(400).is_transient());
    }

    #[test]
    fn responses_are_stored_per_url() {
        let dir = scratch("per_url");
        let a = response_path(&dir, "https://a.invalid/x?Season=2024-25");
        let b = response_path(&dir, "https://a.invalid/x?Season=2023-24");
        assert_ne!(a, b);
        assert_eq!(a, response_path(&dir, "https://a.invalid/x?Season=2024-25"));

        write_response(&a, &entry("https://a.invalid/x?Season=2024-25")).unwrap();
        let back = read_response(&a).unwrap();
        assert_eq!(back.url, "https://a.invalid/x?Season=2024-25");
        assert_eq!(back.etag.as_deref(), Some("\"abc\""));
        assert!(read_response(&b).is_none());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn prune_keeps_the_newest_responses() {
        let dir = scratch("prune");
        let urls: Vec<String> = (0..5).map(|i| format!("https://a.invalid/{i}")).collect();
        for url in &urls {
            write_response(&response_path(&dir, url), &entry(url)).unwrap();
            std::thread::sleep(Duration::from_millis(30));
        }

        assert_eq!(prune_responses(&dir, 10).unwrap(), 0);
        assert_eq!(prune_responses(&dir, 3).unwrap(), 2);
        assert!(read_response(&response_path(&dir, &urls[0])).is_none());
        assert!(read_response(&response_path(&dir, &urls[1])).is_none());
        assert!(read_response(&response_path(&dir, &urls[4])).is_some());
        fs::remove_dir_all(dir).ok();
    }
}
