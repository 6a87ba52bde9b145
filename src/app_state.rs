// =============================================================================
// Central Application State — Meridian Desk backend
// =============================================================================
//
// One Arc<AppState> shared by every request handler. The broker session is
// the only mutable piece: a single record behind parking_lot::RwLock,
// overwritten by each login and read by every authenticated request.
// Concurrent logins race last-writer-wins, which is acceptable for the
// single-operator dashboard this serves.
// =============================================================================

use parking_lot::RwLock;

use crate::ai::AiClient;
use crate::broker::BrokerClient;
use crate::config::Settings;
use crate::types::Session;

/// Shared application state.
pub struct AppState {
    pub settings: Settings,
    pub broker: BrokerClient,
    pub ai: AiClient,

    /// Latest broker session, if a login has succeeded this process lifetime.
    session: RwLock<Option<Session>>,
}

impl AppState {
    /// Build the state and both upstream clients from the settings snapshot.
    pub fn new(settings: Settings) -> Self {
        let broker = BrokerClient::new(
            settings.broker_base_url.clone(),
            settings.broker_api_key.clone().unwrap_or_default(),
        );
        let ai = AiClient::new(
            settings.ai_base_url.clone(),
            settings.ai_model.clone(),
            settings.ai_api_key.clone(),
        );

        Self {
            settings,
            broker,
            ai,
            session: RwLock::new(None),
        }
    }

    /// Clone of the active session, if any. Handlers work on the clone so a
    /// concurrent re-login cannot swap tokens mid-request.
    pub fn active_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Replace the stored session with a freshly minted one.
    pub fn store_session(&self, session: Session) {
        *self.session.write() = Some(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Profile;

    fn test_settings() -> Settings {
        Settings {
            bind_addr: "127.0.0.1:0".into(),
            broker_base_url: "https://example.invalid".into(),
            broker_api_key: None,
            broker_client_code: None,
            broker_password: None,
            ai_base_url: "https://example.invalid".into(),
            ai_api_key: None,
            ai_model: "test".into(),
            exchange_segment: "NSE".into(),
            equity_suffix: "-EQ".into(),
        }
    }

    #[test]
    fn session_starts_absent_and_last_login_wins() {
        let state = AppState::new(test_settings());
        assert!(state.active_session().is_none());

        for code in ["A100", "B200"] {
            state.store_session(Session {
                auth_token: format!("jwt-{code}"),
                feed_token: String::new(),
                refresh_token: String::new(),
                profile: Profile {
                    name: "Tester".into(),
                    client_code: code.into(),
                },
            });
        }

        let active = state.active_session().unwrap();
        assert_eq!(active.profile.client_code, "B200");
        assert_eq!(active.auth_token, "jwt-B200");
    }
}
