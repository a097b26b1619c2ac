// =============================================================================
// Configuration — environment-driven process settings
// =============================================================================
//
// Everything is read once at startup. `main` calls `dotenv::dotenv()` first so
// a local `.env` file can supply the provider credentials. Missing credentials
// are not fatal: the affected provider calls will fail per request and be
// logged, which matches how the service treats every other external failure.
// =============================================================================

use std::time::Duration;

use tracing::{info, warn};

/// Period between scheduled fetch cycles.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_QUOTE_BASE_URL: &str = "https://www.alphavantage.co";
const DEFAULT_MAILGUN_BASE_URL: &str = "https://api.mailgun.net";

fn default_symbols() -> Vec<String> {
    vec!["VT".to_string(), "SPY".to_string(), "QQQ".to_string()]
}

// =============================================================================
// Provider settings
// =============================================================================

/// Credentials and endpoint for the quote provider.
#[derive(Debug, Clone)]
pub struct QuoteApiConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Credentials, endpoint and sender address for the mail relay.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub domain: String,
    pub base_url: String,
    /// Value of the `from` header on every alert email.
    pub from: String,
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Symbols tracked at startup, uppercased and de-duplicated.
    pub symbols: Vec<String>,
    pub bind_addr: String,
    pub static_dir: String,
    pub quote_api: QuoteApiConfig,
    pub mail: MailConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            quote_api: QuoteApiConfig {
                api_key: String::new(),
                base_url: DEFAULT_QUOTE_BASE_URL.to_string(),
            },
            mail: MailConfig {
                api_key: String::new(),
                domain: String::new(),
                base_url: DEFAULT_MAILGUN_BASE_URL.to_string(),
                from: String::new(),
            },
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|key| std::env::var(key).ok());

        for (name, value) in [
            ("ALPHA_VANTAGE_API_KEY", &config.quote_api.api_key),
            ("MAILGUN_API_KEY", &config.mail.api_key),
            ("MAILGUN_DOMAIN", &config.mail.domain),
            ("EMAIL_FROM", &config.mail.from),
        ] {
            if value.is_empty() {
                warn!(variable = name, "environment variable not set");
            }
        }

        info!(
            symbols = ?config.symbols,
            bind_addr = %config.bind_addr,
            static_dir = %config.static_dir,
            "configuration loaded"
        );
        config
    }

    /// Build the configuration from an arbitrary key lookup. Unset or blank
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let symbols = get("ETF_SNAPSHOT_SYMBOLS")
            .map(|raw| parse_symbols(&raw))
            .filter(|syms| !syms.is_empty())
            .unwrap_or(defaults.symbols);

        Self {
            symbols,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            static_dir: get("STATIC_DIR").unwrap_or(defaults.static_dir),
            quote_api: QuoteApiConfig {
                api_key: get("ALPHA_VANTAGE_API_KEY").unwrap_or_default(),
                base_url: get("QUOTE_API_BASE_URL").unwrap_or(defaults.quote_api.base_url),
            },
            mail: MailConfig {
                api_key: get("MAILGUN_API_KEY").unwrap_or_default(),
                domain: get("MAILGUN_DOMAIN").unwrap_or_default(),
                base_url: get("MAILGUN_BASE_URL").unwrap_or(defaults.mail.base_url),
                from: get("EMAIL_FROM").unwrap_or_default(),
            },
        }
    }
}

/// Split a comma list into uppercase symbols, dropping blanks and repeats.
fn parse_symbols(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for sym in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !sym.is_empty() && !out.contains(&sym) {
            out.push(sym);
        }
    }
    out
}
