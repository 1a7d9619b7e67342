mod client;
mod model;

pub(crate) use client::normalize_domain;
pub use client::{BitrixClient, BitrixError};
pub use model::{BitrixUser, CrmCompany, OAuthToken};
