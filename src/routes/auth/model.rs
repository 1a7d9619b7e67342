use serde::{Deserialize, Serialize};

/// Short-lived cookie holding the OAuth `state` between start and callback.
pub const OAUTH_STATE_COOKIE: &str = "beehouse_oauth_state";

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub domain: String,
}

/// Query Bitrix24 appends when redirecting back.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub domain: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}
