// Global configuration constants - single source of truth

use std::time::Duration;

pub struct Config;

impl Config {
    // Link checking
    pub const DEFAULT_CONCURRENCY: usize = 20;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 8;

    // HTTP/Network config
    pub const USER_AGENT: &'static str = concat!("rust-bookmarks/", env!("CARGO_PKG_VERSION"));
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    pub const POOL_IDLE_PER_HOST: usize = 4;
    pub const POOL_IDLE_TIMEOUT_SECS: u64 = 30;
    pub const MAX_REDIRECTS: usize = 10;

    // Listing
    pub const DEFAULT_LIST_LIMIT: usize = 50;

    // Store
    pub const DEFAULT_REDIS_ADDR: &'static str = "localhost:6379";
}

/// Where the record store lives. Resolved once at startup and handed to `RedisStore::open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub redis_url: String,
}

impl StoreConfig {
    /// Explicit URL wins, then `REDIS_URL`, then `REDIS_ADDR`/`REDIS_DB`/`REDIS_PASSWORD`.
    pub fn resolve(explicit_url: Option<String>) -> Self {
        if let Some(url) = explicit_url.filter(|u| !u.trim().is_empty()) {
            return Self { redis_url: url };
        }
        if let Ok(url) = std::env::var("REDIS_URL")
            && !url.trim().is_empty()
        {
            return Self { redis_url: url };
        }

        let addr = std::env::var("REDIS_ADDR").ok();
        let db = std::env::var("REDIS_DB").ok();
        let password = std::env::var("REDIS_PASSWORD").ok();
        Self::from_parts(addr.as_deref(), db.as_deref(), password.as_deref())
    }

    /// Assemble a `redis://` URL from discrete settings. An unparsable db index falls back to 0.
    pub fn from_parts(addr: Option<&str>, db: Option<&str>, password: Option<&str>) -> Self {
        let addr = addr
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(Config::DEFAULT_REDIS_ADDR);
        let db = db.and_then(|d| d.trim().parse::<i64>().ok()).unwrap_or(0);

        let redis_url = match password.filter(|p| !p.is_empty()) {
            Some(pw) => format!("redis://:{}@{}/{}", pw, addr, db),
            None => format!("redis://{}/{}", addr, db),
        };
        Self { redis_url }
    }
}

/// Parse a probe timeout such as `8s`, `500ms`, `2m` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty duration".to_string());
    }

    let split = raw
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{}'", raw))?;

    let secs = match unit {
        "" | "s" => value,
        "ms" => value / 1000.0,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit '{}' in '{}'", other, raw)),
    };

    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("duration must be positive: '{}'", raw));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_defaults() {
        let cfg = StoreConfig::from_parts(None, None, None);
        assert_eq!(cfg.redis_url, "redis://localhost:6379/0");
    }

    #[test]
    fn test_from_parts_with_password_and_db() {
        let cfg = StoreConfig::from_parts(Some("10.0.0.5:6380"), Some("3"), Some("hunter2"));
        assert_eq!(cfg.redis_url, "redis://:hunter2@10.0.0.5:6380/3");
    }

    #[test]
    fn test_from_parts_bad_db_falls_back_to_zero() {
        let cfg = StoreConfig::from_parts(Some("host:1"), Some("abc"), Some(""));
        assert_eq!(cfg.redis_url, "redis://host:1/0");
    }

    #[test]
    fn test_explicit_url_wins() {
        let cfg = StoreConfig::resolve(Some("redis://example:6379/2".to_string()));
        assert_eq!(cfg.redis_url, "redis://example:6379/2");
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("8s").unwrap(), Duration::from_secs(8));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("0s").is_err());
    }
}
