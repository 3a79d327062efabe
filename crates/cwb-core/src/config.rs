use std::{
    env,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, messages::Locale, poller::PollerConfig, Result};

pub const DEFAULT_STATUS_ENDPOINT: &str =
    "https://wroom.vision.com.tw/WServ/VWWL_Clinics.svc/GetWaitInfo";

/// Typed configuration, loaded from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Transport
    pub telegram_bot_token: String,
    pub locale: Locale,
    pub reset_keywords: Vec<String>,

    // Storage
    pub session_store_path: PathBuf,

    // Status source
    pub status_endpoint: String,
    pub fetch_timeout: Duration,

    // Polling
    pub poll_interval: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub max_concurrent_checks: Option<usize>,

    // Logging
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let locale = match env_str("BOT_LOCALE").and_then(non_empty) {
            Some(v) => v.parse()?,
            None => Locale::default(),
        };
        let reset_keywords = parse_csv_lower(env_str("RESET_KEYWORDS"));

        let session_store_path = env_path("SESSION_STORE_PATH")
            .unwrap_or_else(|| PathBuf::from("/tmp/clinic-wait-bot/sessions.json"));

        let status_endpoint = env_str("STATUS_ENDPOINT")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_STATUS_ENDPOINT.to_string());
        let fetch_timeout = Duration::from_millis(env_u64("FETCH_TIMEOUT_MS").unwrap_or(10_000));

        let poll_interval = Duration::from_millis(env_u64("POLL_INTERVAL_MS").unwrap_or(30_000));
        if poll_interval.is_zero() {
            return Err(Error::Config("POLL_INTERVAL_MS must be > 0".to_string()));
        }
        let retry_attempts = env_u32("RETRY_ATTEMPTS").unwrap_or(3).max(1);
        let retry_delay = Duration::from_millis(env_u64("RETRY_DELAY_MS").unwrap_or(1_000));
        let max_concurrent_checks = env_usize("MAX_CONCURRENT_CHECKS").filter(|n| *n > 0);

        let log_dir = env_path("LOG_DIR");

        Ok(Self {
            telegram_bot_token,
            locale,
            reset_keywords,
            session_store_path,
            status_endpoint,
            fetch_timeout,
            poll_interval,
            retry_attempts,
            retry_delay,
            max_concurrent_checks,
            log_dir,
        })
    }

    pub fn poller(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            retry_attempts: self.retry_attempts,
            retry_delay: self.retry_delay,
            max_concurrent: self.max_concurrent_checks,
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_csv_lower(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
