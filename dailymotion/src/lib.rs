//! A client for the Dailymotion REST API.
//!
//! Objects come back as [`Metadata`]: a map from the registered [`Field`]s to normalized
//! [`Value`]s, holding exactly the fields a call asked for. Authentication lives in
//! [`TokenManager`], and every network call goes through a [`Transport`] so the whole client can
//! run against [`mock::MockTransport`] in tests.

pub mod client;
pub mod codec;
pub mod config;
pub mod fields;
pub mod metadata;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod oauth;
pub mod page;
pub mod params;
pub mod transport;
pub mod value;

pub use client::{DailymotionClient, UploadUrl};
pub use config::{ApiCredentials, ApiKeyType, ClientConfig};
pub use fields::Field;
pub use metadata::{FromValue, Metadata};
pub use oauth::{AuthState, OAuthToken, Scope, TokenInfo, TokenManager};
pub use page::Page;
pub use transport::{HttpTransport, Transport};
pub use value::{Value, ValueKind, normalize};

/// Builds a client over HTTP for the given credentials.
///
/// The host comes from `config.base_url` if set, otherwise from the key type.
pub fn http_client(
    credentials: ApiCredentials,
    config: ClientConfig,
) -> eyre::Result<DailymotionClient<HttpTransport>> {
    let base_url = config.base_url.clone();
    let transport = HttpTransport::new(config)?;
    let mut auth = TokenManager::new(transport, credentials);
    if let Some(base_url) = base_url {
        auth = auth.with_base_url(base_url);
    }
    Ok(DailymotionClient::new(auth))
}
