// Session cookie resolution and Bitrix credential extraction.

mod credentials;
mod session;

pub use credentials::{
    BitrixAuth, BitrixCredentials, CredentialExtractor, CredentialFields, CredentialRequest,
    Extraction,
};
pub use session::{
    DEFAULT_SESSION_MAX_AGE, SESSION_COOKIE, Session, SessionConfig, SessionResolver,
    clear_session_cookie, session_cookie,
};
