// =============================================================================
// Settings — process environment, read once at startup
// =============================================================================
//
// Credentials are deliberately kept as Options: a missing broker credential
// or AI key is reported as a 500 by the endpoint that needs it, without ever
// attempting the upstream call. The server itself always starts.
// =============================================================================

/// Immutable settings snapshot taken from the environment in `main`.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Broker REST base URL.
    pub broker_base_url: String,
    /// Broker API key, sent with every broker request.
    pub broker_api_key: Option<String>,
    /// Trading account client code used for login.
    pub broker_client_code: Option<String>,
    /// Trading account password / PIN used for login.
    pub broker_password: Option<String>,

    /// AI text-generation API base URL.
    pub ai_base_url: String,
    /// AI API key.
    pub ai_api_key: Option<String>,
    /// Model identifier sent to the AI API.
    pub ai_model: String,

    /// Exchange segment the instrument list is filtered to (e.g. "NSE").
    pub exchange_segment: String,
    /// Symbol suffix marking cash-equity instruments (e.g. "-EQ").
    pub equity_suffix: String,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("MERIDIAN_BIND_ADDR", "0.0.0.0:3001"),

            broker_base_url: env_or("BROKER_BASE_URL", "https://apiconnect.brokerdirect.in"),
            broker_api_key: env_opt("BROKER_API_KEY"),
            broker_client_code: env_opt("BROKER_CLIENT_CODE"),
            broker_password: env_opt("BROKER_PASSWORD"),

            ai_base_url: env_or(
                "AI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            ai_api_key: env_opt("AI_API_KEY"),
            ai_model: env_or("AI_MODEL", "gemini-1.5-flash"),

            exchange_segment: env_or("MERIDIAN_EXCHANGE_SEGMENT", "NSE"),
            equity_suffix: env_or("MERIDIAN_EQUITY_SUFFIX", "-EQ"),
        }
    }

    /// True when every credential needed for a broker login is present.
    pub fn has_broker_credentials(&self) -> bool {
        self.broker_api_key.is_some()
            && self.broker_client_code.is_some()
            && self.broker_password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_opt_treats_blank_as_missing() {
        std::env::set_var("MERIDIAN_TEST_BLANK", "   ");
        assert!(env_opt("MERIDIAN_TEST_BLANK").is_none());
        std::env::remove_var("MERIDIAN_TEST_BLANK");
    }

    #[test]
    fn missing_credentials_detected() {
        let settings = Settings {
            bind_addr: "0.0.0.0:3001".into(),
            broker_base_url: "https://example.invalid".into(),
            broker_api_key: Some("k".into()),
            broker_client_code: None,
            broker_password: Some("p".into()),
            ai_base_url: "https://example.invalid".into(),
            ai_api_key: None,
            ai_model: "m".into(),
            exchange_segment: "NSE".into(),
            equity_suffix: "-EQ".into(),
        };
        assert!(!settings.has_broker_credentials());
    }
}
