//! OAuth 2.0 token management for the Dailymotion API.
//!
//! [`TokenManager`] runs the password and client-credentials grants against the token endpoint,
//! refreshes and revokes tokens, and asks the API what a token grants. It holds at most one
//! current token and nothing else; persisting tokens across runs is up to the caller.
//!
//! Failures here are soft. A failed grant returns a token whose access token is empty (check
//! [`OAuthToken::is_authenticated`]), and a failed validation returns `None`. Details are logged.
//!
//! Every method that changes the current token takes `&mut self`. Callers that share one manager
//! between tasks have to serialize those calls themselves, e.g. behind a mutex, or a refresh can
//! overwrite a token obtained concurrently.

use crate::config::{ApiCredentials, ApiKeyType};
use crate::transport::{ApiRequest, Transport};
use eyre::Context;
use http::Method;
use oauth2::basic::BasicErrorResponse;
use oauth2::{AccessToken, RefreshToken};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::{Duration, SystemTime};
use tracing::instrument;

const TOKEN_PATH: &str = "/oauth/token";
const VALIDATE_PATH: &str = "/auth";
const REVOKE_PATH: &str = "/logout";

/// Permissions an application can ask a user for.
///
/// See: <https://developers.dailymotion.com/api/#oauth-scopes>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Email,
    Userinfo,
    Feed,
    ManageVideos,
    ManagePlaylists,
    ManageSubscriptions,
    ManageLikes,
    ManageComments,
    ManageSubtitles,
    ManageHistory,
    ManagePlayer,
    ReadInsights,
}

impl Scope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Scope::Email => "email",
            Scope::Userinfo => "userinfo",
            Scope::Feed => "feed",
            Scope::ManageVideos => "manage_videos",
            Scope::ManagePlaylists => "manage_playlists",
            Scope::ManageSubscriptions => "manage_subscriptions",
            Scope::ManageLikes => "manage_likes",
            Scope::ManageComments => "manage_comments",
            Scope::ManageSubtitles => "manage_subtitles",
            Scope::ManageHistory => "manage_history",
            Scope::ManagePlayer => "manage_player",
            Scope::ReadInsights => "read_insights",
        }
    }
}

fn scope_param(scopes: &[Scope]) -> Option<String> {
    if scopes.is_empty() {
        return None;
    }
    let names: Vec<_> = scopes.iter().map(|s| s.as_str()).collect();
    Some(names.join(" "))
}

fn client_params(credentials: &ApiCredentials, grant: GrantType) -> Vec<(String, String)> {
    vec![
        ("grant_type".to_string(), grant.as_str().to_string()),
        ("client_id".to_string(), credentials.key.clone()),
        ("client_secret".to_string(), credentials.secret.clone()),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrantType {
    Password,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    const fn as_str(self) -> &'static str {
        match self {
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

/// A token issued by the token endpoint.
///
/// Serializes to the endpoint's own JSON shape so it can be stored and loaded back. A loaded
/// token does not know when it was issued and therefore reports itself as expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    access_token: AccessToken,
    #[serde(default)]
    token_type: String,
    /// Lifetime in seconds, as reported when the token was issued.
    #[serde(default)]
    expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(default, rename = "uid", skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip)]
    issued_at: Option<SystemTime>,
}

impl Default for OAuthToken {
    fn default() -> Self {
        Self::empty()
    }
}

impl OAuthToken {
    /// The token handed back when a grant fails.
    pub fn empty() -> Self {
        Self {
            access_token: AccessToken::new(String::new()),
            token_type: String::new(),
            expires_in: 0,
            refresh_token: None,
            scope: None,
            user_id: None,
            issued_at: None,
        }
    }

    /// Whether this token carries an access token at all.
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.secret().is_empty()
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_in(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }

    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// The id of the user the token acts for, absent for application tokens.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn has_refresh_capability(&self) -> bool {
        self.refresh_token
            .as_ref()
            .is_some_and(|t| !t.secret().is_empty())
    }

    pub fn is_user_level(&self) -> bool {
        self.user_id.as_ref().is_some_and(|id| !id.is_empty())
    }

    pub fn is_application_level(&self) -> bool {
        !self.is_user_level() && !self.has_refresh_capability()
    }

    /// When the token stops working, going by what the server said at issue time.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.issued_at.map(|at| at + self.expires_in())
    }

    /// Advisory only: the server may revoke a token early, and nothing stops an expired token
    /// from being sent.
    pub fn is_expired(&self) -> bool {
        self.expires_at()
            .is_none_or(|expires_at| SystemTime::now() >= expires_at)
    }
}

/// What the API says about the current token.
///
/// See: <https://developers.dailymotion.com/api/#token-introspection>
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub scope: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub screenname: Option<String>,
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrList::String(s)) => s.split_whitespace().map(str::to_string).collect(),
        Some(StringOrList::List(list)) => list,
    })
}

/// Where the token manager stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Acting for the application itself.
    Application,
    /// Acting for a user.
    User,
}

/// Runs OAuth grants and keeps the resulting token.
#[derive(Debug)]
pub struct TokenManager<T> {
    transport: T,
    credentials: ApiCredentials,
    base_url: Option<String>,
    token: Option<OAuthToken>,
}

impl<T: Transport> TokenManager<T> {
    pub fn new(transport: T, credentials: ApiCredentials) -> Self {
        Self {
            transport,
            credentials,
            base_url: None,
            token: None,
        }
    }

    /// Sends every call to `base_url` instead of the host picked by the key type.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Starts out holding `token`, e.g. one loaded from storage.
    pub fn with_token(mut self, token: OAuthToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn credentials(&self) -> &ApiCredentials {
        &self.credentials
    }

    pub fn key_type(&self) -> ApiKeyType {
        self.credentials.key_type
    }

    /// The API host all calls go to.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.credentials.key_type.base_url())
    }

    pub fn token(&self) -> Option<&OAuthToken> {
        self.token.as_ref()
    }

    /// Replaces the current token without talking to the server.
    pub fn set_token(&mut self, token: Option<OAuthToken>) {
        self.token = token;
    }

    pub fn state(&self) -> AuthState {
        match &self.token {
            Some(token) if token.is_authenticated() => {
                if token.is_user_level() || token.has_refresh_capability() {
                    AuthState::User
                } else {
                    AuthState::Application
                }
            }
            _ => AuthState::Unauthenticated,
        }
    }

    /// The current access token, if there is a usable one.
    pub fn bearer(&self) -> Option<String> {
        self.token
            .as_ref()
            .filter(|t| t.is_authenticated())
            .map(|t| t.access_token.secret().clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// The token endpoint on the host for `key_type`, honoring the base URL override.
    fn token_endpoint(&self, key_type: ApiKeyType) -> String {
        let host = self.base_url.as_deref().unwrap_or(key_type.base_url());
        format!("{host}{TOKEN_PATH}")
    }

    /// Obtains a user-level token with the resource owner password grant.
    ///
    /// Returns [`OAuthToken::empty`] if the grant fails, leaving the current token in place.
    #[instrument(skip(self, password), fields(key_type = ?self.credentials.key_type))]
    pub async fn authenticate_with_password(
        &mut self,
        username: &str,
        password: &str,
        scopes: &[Scope],
    ) -> OAuthToken {
        let mut params = client_params(&self.credentials, GrantType::Password);
        params.push(("username".to_string(), username.to_string()));
        params.push(("password".to_string(), password.to_string()));
        if let Some(scope) = scope_param(scopes) {
            params.push(("scope".to_string(), scope));
        }
        self.exchange(GrantType::Password, None, params).await
    }

    /// Obtains an application-level token with the client credentials grant.
    ///
    /// `key_type` picks the host the grant is sent to. If the grant succeeds, the given key
    /// replaces the manager's credentials and every later call goes to that host. If it fails,
    /// [`OAuthToken::empty`] is returned and the credentials and current token stay as they were.
    #[instrument(skip(self, secret))]
    pub async fn authenticate_with_client_credentials(
        &mut self,
        key: &str,
        secret: &str,
        key_type: ApiKeyType,
        scopes: &[Scope],
    ) -> OAuthToken {
        let credentials = ApiCredentials::new(key, secret, key_type);
        let mut params = client_params(&credentials, GrantType::ClientCredentials);
        if let Some(scope) = scope_param(scopes) {
            params.push(("scope".to_string(), scope));
        }
        self.exchange(GrantType::ClientCredentials, Some(credentials), params)
            .await
    }

    /// Swaps the current refresh token for a new access token.
    ///
    /// If the response carries no new refresh token, the old one is kept. Returns
    /// [`OAuthToken::empty`] and leaves the current token alone if there is nothing to refresh
    /// with or the grant fails.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> OAuthToken {
        let Some(refresh_token) = self.token.as_ref().and_then(|t| t.refresh_token.clone()) else {
            tracing::warn!("no refresh token available, cannot refresh");
            return OAuthToken::empty();
        };

        let mut params = client_params(&self.credentials, GrantType::RefreshToken);
        params.push((
            "refresh_token".to_string(),
            refresh_token.secret().to_string(),
        ));

        match self.request_token(self.key_type(), params).await {
            Ok(mut token) => {
                if token.refresh_token.is_none() {
                    tracing::trace!("new token lacks refresh token, preserving original");
                    token.refresh_token = Some(refresh_token);
                }
                tracing::debug!("successfully refreshed OAuth token");
                self.token = Some(token.clone());
                token
            }
            Err(e) => {
                tracing::warn!(error = %e, "OAuth token refresh failed");
                OAuthToken::empty()
            }
        }
    }

    /// Refreshes the current token if it looks expired and can be refreshed.
    ///
    /// Returns whether a usable, unexpired token is held afterwards.
    pub async fn refresh_if_expired(&mut self) -> bool {
        let Some(token) = &self.token else {
            return false;
        };
        if !token.is_expired() {
            return token.is_authenticated();
        }
        if !token.has_refresh_capability() {
            return false;
        }
        self.refresh().await.is_authenticated()
    }

    /// Asks the API what the current token grants.
    ///
    /// Returns `None` when there is no token, the call fails, or the API rejects the token.
    #[instrument(skip(self))]
    pub async fn validate_token(&self) -> Option<TokenInfo> {
        let bearer = self.bearer()?;
        let request =
            ApiRequest::new(Method::GET, self.endpoint(VALIDATE_PATH)).bearer(Some(bearer));

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "token validation request failed");
                return None;
            }
        };
        if !response.is_success() {
            tracing::debug!(status = response.status, "token rejected");
            return None;
        }
        match serde_json::from_str(&response.body) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!(error = %e, "could not parse token validation response");
                None
            }
        }
    }

    /// Revokes the current token on the server and forgets it locally.
    ///
    /// The token is forgotten even if the server call fails. Returns whether the server
    /// confirmed the revocation.
    #[instrument(skip(self))]
    pub async fn revoke(&mut self) -> bool {
        let Some(token) = self.token.take() else {
            tracing::debug!("no token to revoke");
            return false;
        };
        if !token.is_authenticated() {
            return false;
        }

        let request = ApiRequest::new(Method::GET, self.endpoint(REVOKE_PATH))
            .bearer(Some(token.access_token.secret().clone()));
        match self.transport.send(request).await {
            Ok(response) if response.is_success() => {
                tracing::debug!("token revoked");
                true
            }
            Ok(response) => {
                tracing::warn!(status = response.status, "server refused to revoke token");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "token revocation request failed");
                false
            }
        }
    }

    /// Runs a grant and keeps the resulting token.
    ///
    /// `credentials`, when given, are the ones the grant was made with; they are adopted only if
    /// the grant succeeds.
    async fn exchange(
        &mut self,
        grant: GrantType,
        credentials: Option<ApiCredentials>,
        params: Vec<(String, String)>,
    ) -> OAuthToken {
        let key_type = credentials
            .as_ref()
            .map_or(self.key_type(), |credentials| credentials.key_type);
        match self.request_token(key_type, params).await {
            Ok(token) => {
                if let Some(credentials) = credentials {
                    self.credentials = credentials;
                }
                tracing::debug!(
                    grant = grant.as_str(),
                    user_level = token.is_user_level(),
                    "obtained OAuth token"
                );
                self.token = Some(token.clone());
                token
            }
            Err(e) => {
                tracing::warn!(grant = grant.as_str(), error = %e, "OAuth grant failed");
                OAuthToken::empty()
            }
        }
    }

    async fn request_token(
        &self,
        key_type: ApiKeyType,
        params: Vec<(String, String)>,
    ) -> eyre::Result<OAuthToken> {
        let request = ApiRequest::new(Method::POST, self.token_endpoint(key_type)).params(params);
        let response = self
            .transport
            .send(request)
            .await
            .context("send token request")?;

        if !response.is_success() {
            if let Ok(error) = serde_json::from_str::<BasicErrorResponse>(&response.body) {
                eyre::bail!(
                    "token endpoint returned {} ({}): {}",
                    response.status,
                    error.error().as_ref(),
                    error.error_description().map_or("no description", |d| d.as_str())
                );
            }
        }
        let response = response.error_for_status()?;

        let mut token: OAuthToken =
            serde_json::from_str(&response.body).context("parse token endpoint response")?;
        if !token.is_authenticated() {
            eyre::bail!("token endpoint returned an empty access token");
        }
        token.issued_at = Some(SystemTime::now());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use pretty_assertions::assert_eq;

    const USER_TOKEN: &str = r#"{
        "access_token": "acc-123",
        "token_type": "Bearer",
        "expires_in": 36000,
        "refresh_token": "ref-456",
        "scope": "manage_videos email",
        "uid": "x1abc"
    }"#;

    const APP_TOKEN: &str = r#"{
        "access_token": "app-789",
        "token_type": "Bearer",
        "expires_in": 36000
    }"#;

    fn manager(mock: &MockTransport) -> TokenManager<MockTransport> {
        TokenManager::new(
            mock.clone(),
            ApiCredentials::new("key", "secret", ApiKeyType::Public),
        )
    }

    #[tokio::test]
    async fn password_grant_yields_user_token() {
        let mock = MockTransport::new();
        mock.respond(200, USER_TOKEN);
        let mut auth = manager(&mock);

        let token = auth
            .authenticate_with_password("someone", "hunter2", &[Scope::ManageVideos, Scope::Email])
            .await;

        assert!(token.is_authenticated());
        assert_eq!(token.access_token().secret(), "acc-123");
        assert_eq!(token.user_id(), Some("x1abc"));
        assert!(token.has_refresh_capability());
        assert!(token.is_user_level());
        assert!(!token.is_application_level());
        assert!(!token.is_expired());
        assert_eq!(auth.state(), AuthState::User);
        assert_eq!(auth.bearer().as_deref(), Some("acc-123"));

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://api.dailymotion.com/oauth/token");
        assert_eq!(request.get_param("grant_type"), Some("password"));
        assert_eq!(request.get_param("client_id"), Some("key"));
        assert_eq!(request.get_param("client_secret"), Some("secret"));
        assert_eq!(request.get_param("username"), Some("someone"));
        assert_eq!(request.get_param("password"), Some("hunter2"));
        assert_eq!(request.get_param("scope"), Some("manage_videos email"));
        assert_eq!(request.bearer, None);
    }

    #[tokio::test]
    async fn failed_password_grant_returns_empty_token() {
        let mock = MockTransport::new();
        mock.respond(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid username or password"}"#,
        );
        let mut auth = manager(&mock);

        let token = auth.authenticate_with_password("someone", "wrong", &[]).await;

        assert_eq!(token.access_token().secret(), "");
        assert!(!token.is_authenticated());
        assert_eq!(auth.state(), AuthState::Unauthenticated);
        assert_eq!(mock.last_request().unwrap().get_param("scope"), None);
    }

    #[tokio::test]
    async fn transport_failure_returns_empty_token() {
        let mock = MockTransport::new();
        mock.fail("connection refused");
        let mut auth = manager(&mock);

        let token = auth.authenticate_with_password("someone", "pw", &[]).await;
        assert!(!token.is_authenticated());
    }

    #[tokio::test]
    async fn non_oauth_error_body_still_fails_softly() {
        let mock = MockTransport::new();
        mock.respond(500, "<html>oops</html>");
        let mut auth = manager(&mock);
        assert!(!auth.authenticate_with_password("a", "b", &[]).await.is_authenticated());
    }

    #[tokio::test]
    async fn client_credentials_route_by_key_type() {
        let mock = MockTransport::new();
        mock.respond(200, APP_TOKEN).respond(200, APP_TOKEN);
        let mut auth = manager(&mock);

        let token = auth
            .authenticate_with_client_credentials("pkey", "psecret", ApiKeyType::Private, &[])
            .await;
        assert!(token.is_application_level());
        assert_eq!(auth.state(), AuthState::Application);
        let request = mock.last_request().unwrap();
        assert_eq!(
            request.url,
            "https://partner.api.dailymotion.com/oauth/token"
        );
        assert_eq!(request.get_param("grant_type"), Some("client_credentials"));
        assert_eq!(request.get_param("client_id"), Some("pkey"));
        assert_eq!(auth.key_type(), ApiKeyType::Private);

        auth.authenticate_with_client_credentials("key", "secret", ApiKeyType::Public, &[])
            .await;
        assert_eq!(
            mock.last_request().unwrap().url,
            "https://api.dailymotion.com/oauth/token"
        );
    }

    #[tokio::test]
    async fn failed_client_credentials_grant_keeps_credentials_and_host() {
        let mock = MockTransport::new();
        mock.respond(200, APP_TOKEN).respond(
            401,
            r#"{"error":"invalid_client","error_description":"bad key"}"#,
        );
        let mut auth = manager(&mock);

        let token = auth
            .authenticate_with_client_credentials("k", "s", ApiKeyType::Public, &[])
            .await;
        assert!(token.is_authenticated());

        let token = auth
            .authenticate_with_client_credentials("bad", "bad", ApiKeyType::Private, &[])
            .await;
        assert!(!token.is_authenticated());
        // the failed grant itself went to the partner host
        assert_eq!(
            mock.last_request().unwrap().url,
            "https://partner.api.dailymotion.com/oauth/token"
        );

        assert_eq!(auth.base_url(), "https://api.dailymotion.com");
        assert_eq!(auth.key_type(), ApiKeyType::Public);
        assert_eq!(auth.credentials().key, "k");
        assert_eq!(auth.bearer().as_deref(), Some("app-789"));
    }

    #[tokio::test]
    async fn refresh_keeps_old_refresh_token_when_none_returned() {
        let mock = MockTransport::new();
        mock.respond(200, USER_TOKEN).respond(
            200,
            r#"{"access_token":"acc-new","token_type":"Bearer","expires_in":3600,"uid":"x1abc"}"#,
        );
        let mut auth = manager(&mock);
        auth.authenticate_with_password("someone", "pw", &[]).await;

        let token = auth.refresh().await;
        assert_eq!(token.access_token().secret(), "acc-new");
        assert_eq!(token.refresh_token().unwrap().secret(), "ref-456");
        assert_eq!(auth.bearer().as_deref(), Some("acc-new"));

        let request = mock.last_request().unwrap();
        assert_eq!(request.get_param("grant_type"), Some("refresh_token"));
        assert_eq!(request.get_param("refresh_token"), Some("ref-456"));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_current_token() {
        let mock = MockTransport::new();
        mock.respond(200, USER_TOKEN)
            .respond(400, r#"{"error":"invalid_grant"}"#);
        let mut auth = manager(&mock);
        auth.authenticate_with_password("someone", "pw", &[]).await;

        assert!(!auth.refresh().await.is_authenticated());
        assert_eq!(auth.bearer().as_deref(), Some("acc-123"));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_sends_nothing() {
        let mock = MockTransport::new();
        let mut auth = manager(&mock);
        assert!(!auth.refresh().await.is_authenticated());

        let app: OAuthToken = serde_json::from_str(APP_TOKEN).unwrap();
        let mut auth = auth.with_token(app);
        assert!(!auth.refresh().await.is_authenticated());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn refresh_if_expired_uses_refresh_token() {
        let mock = MockTransport::new();
        mock.respond(200, USER_TOKEN);
        // Loaded tokens don't know when they were issued, so they count as expired.
        let stored: OAuthToken = serde_json::from_str(USER_TOKEN).unwrap();
        assert!(stored.is_expired());

        let mut auth = manager(&mock).with_token(stored);
        assert!(auth.refresh_if_expired().await);
        assert!(!auth.token().unwrap().is_expired());
        assert_eq!(mock.requests().len(), 1);

        assert!(auth.refresh_if_expired().await);
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn validation_reports_token_info() {
        let mock = MockTransport::new();
        mock.respond(200, USER_TOKEN).respond(
            200,
            r#"{"id":"x1abc","scope":["manage_videos","email"],"roles":[],"username":"someone","screenname":"Some One"}"#,
        );
        let mut auth = manager(&mock);
        auth.authenticate_with_password("someone", "pw", &[]).await;

        let info = auth.validate_token().await.unwrap();
        assert_eq!(info.id.as_deref(), Some("x1abc"));
        assert_eq!(info.scope, vec!["manage_videos", "email"]);
        assert_eq!(info.username.as_deref(), Some("someone"));

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "https://api.dailymotion.com/auth");
        assert_eq!(request.bearer.as_deref(), Some("acc-123"));
    }

    #[tokio::test]
    async fn validation_failures_yield_none() {
        let mock = MockTransport::new();
        let mut auth = manager(&mock);
        assert_eq!(auth.validate_token().await, None);
        assert!(mock.requests().is_empty());

        mock.respond(200, USER_TOKEN)
            .respond(401, r#"{"error":{"code":401,"message":"Invalid token","type":"invalid_token"}}"#)
            .fail("timeout")
            .respond(200, "not json");
        auth.authenticate_with_password("someone", "pw", &[]).await;
        assert_eq!(auth.validate_token().await, None);
        assert_eq!(auth.validate_token().await, None);
        assert_eq!(auth.validate_token().await, None);
    }

    #[test]
    fn space_separated_scope_is_split() {
        let info: TokenInfo = serde_json::from_str(r#"{"scope":"a b"}"#).unwrap();
        assert_eq!(info.scope, vec!["a", "b"]);
        let info: TokenInfo = serde_json::from_str(r#"{"scope":null}"#).unwrap();
        assert!(info.scope.is_empty());
    }

    #[tokio::test]
    async fn revoke_forgets_token_regardless_of_server() {
        let mock = MockTransport::new();
        mock.respond(200, USER_TOKEN)
            .respond(200, "{}")
            .respond(200, USER_TOKEN)
            .respond(500, "");
        let mut auth = manager(&mock);

        auth.authenticate_with_password("someone", "pw", &[]).await;
        assert!(auth.revoke().await);
        assert_eq!(auth.state(), AuthState::Unauthenticated);
        let request = mock.last_request().unwrap();
        assert_eq!(request.url, "https://api.dailymotion.com/logout");
        assert_eq!(request.bearer.as_deref(), Some("acc-123"));

        auth.authenticate_with_password("someone", "pw", &[]).await;
        assert!(!auth.revoke().await);
        assert_eq!(auth.state(), AuthState::Unauthenticated);
        assert!(auth.token().is_none());

        assert!(!auth.revoke().await);
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn base_url_override_applies_to_token_endpoint() {
        let mock = MockTransport::new();
        mock.respond(200, APP_TOKEN);
        let mut auth = manager(&mock).with_base_url("http://localhost:9999/");
        auth.authenticate_with_client_credentials("k", "s", ApiKeyType::Private, &[])
            .await;
        assert_eq!(
            mock.last_request().unwrap().url,
            "http://localhost:9999/oauth/token"
        );
    }

    #[test]
    fn token_serializes_to_endpoint_shape() {
        let token: OAuthToken = serde_json::from_str(USER_TOKEN).unwrap();
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["access_token"], "acc-123");
        assert_eq!(json["uid"], "x1abc");
        assert_eq!(json["refresh_token"], "ref-456");

        let app: OAuthToken = serde_json::from_str(APP_TOKEN).unwrap();
        let json = serde_json::to_value(&app).unwrap();
        assert!(json.get("refresh_token").is_none());
        assert!(app.is_application_level());
    }

    #[test]
    fn token_debug_hides_secrets() {
        let token: OAuthToken = serde_json::from_str(USER_TOKEN).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("acc-123"));
        assert!(!debug.contains("ref-456"));
    }
}
