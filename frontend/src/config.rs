use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

use crate::activity::DEFAULT_ACTIVITY_CAPACITY;
use crate::notifications::{DEFAULT_NOTIFICATION_PAGE_SIZE, DEFAULT_NOTIFICATION_REFRESH_SECS};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Runtime settings, read from `config.json` (or page globals) in the browser.
/// Every key is optional; missing ones fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    pub api_base_url: Option<String>,
    pub notification_page_size: u64,
    pub notification_refresh_secs: u64,
    pub activity_capacity: usize,
    pub audit_page_size: u64,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            notification_page_size: DEFAULT_NOTIFICATION_PAGE_SIZE,
            notification_refresh_secs: DEFAULT_NOTIFICATION_REFRESH_SECS,
            activity_capacity: DEFAULT_ACTIVITY_CAPACITY,
            audit_page_size: 20,
            log_level: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn notification_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.notification_refresh_secs.max(1))
    }

    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }
}

static RUNTIME_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::RuntimeConfig;

    fn global_string(global: &str, keys: &[&str]) -> Option<String> {
        // Expect optional global object: window.<global> = { API_BASE_URL: "..." }
        let w = web_sys::window()?;
        let any = js_sys::Reflect::get(&w, &global.into()).ok()?;
        if any.is_undefined() || any.is_null() {
            return None;
        }
        let obj = js_sys::Object::from(any);
        keys.iter().find_map(|key| {
            js_sys::Reflect::get(&obj, &(*key).into())
                .ok()
                .filter(|v| !v.is_undefined() && !v.is_null())
                .and_then(|v| v.as_string())
        })
    }

    pub fn base_url_from_globals() -> Option<String> {
        global_string("__BACKOFFICE_ENV", &["API_BASE_URL", "api_base_url"])
            .or_else(|| global_string("__BACKOFFICE_CONFIG", &["apiBaseUrl", "api_base_url"]))
    }

    pub async fn fetch_runtime_config() -> Option<RuntimeConfig> {
        let origin = web_sys::window()?.location().origin().ok()?;
        let resp = reqwest::get(format!("{}/config.json", origin)).await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.json::<RuntimeConfig>().await.ok()
    }
}

#[cfg(target_arch = "wasm32")]
async fn resolve() -> RuntimeConfig {
    let mut cfg = browser::fetch_runtime_config().await.unwrap_or_default();
    if let Some(url) = browser::base_url_from_globals() {
        cfg.api_base_url = Some(url);
    }
    cfg
}

#[cfg(not(target_arch = "wasm32"))]
async fn resolve() -> RuntimeConfig {
    RuntimeConfig {
        api_base_url: std::env::var("BACKOFFICE_API_BASE_URL").ok(),
        ..RuntimeConfig::default()
    }
}

/// Resolves the configuration once and caches it for the rest of the session.
pub async fn init() -> RuntimeConfig {
    if let Some(cached) = RUNTIME_CONFIG.get() {
        return cached.clone();
    }
    let resolved = resolve().await;
    RUNTIME_CONFIG.get_or_init(|| resolved).clone()
}

/// Cached configuration, or defaults when `init` has not completed yet.
pub fn current() -> RuntimeConfig {
    RUNTIME_CONFIG.get().cloned().unwrap_or_default()
}

pub async fn await_api_base_url() -> String {
    init().await.api_base_url().to_string()
}
