use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::api::decode;
use crate::error::{RateLimit, XrpcError};

/// A trait abstracting the XRPC transport.
///
/// Everything in the workspace that talks to a PDS is generic over this
/// trait, which keeps the live [`XrpcClient`] out of tests: a mock
/// implementation answering from canned JSON is enough to exercise the
/// higher layers.
#[async_trait]
pub trait XrpcTransport: Send + Sync {
    /// Executes an XRPC query (HTTP GET) and returns the decoded JSON body.
    async fn query(&self, nsid: &str, params: &[(&str, String)]) -> Result<Value, XrpcError>;

    /// Executes an XRPC procedure (HTTP POST) and returns the decoded JSON
    /// body, or `Value::Null` for procedures with empty output.
    async fn procedure(&self, nsid: &str, input: &Value) -> Result<Value, XrpcError>;
}

/// Identifier/app-password credentials for establishing a session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokens {
    access_jwt: String,
    refresh_jwt: String,
    did: String,
    handle: String,
}

#[derive(Clone, Copy)]
enum Call<'a> {
    Query(&'a [(&'a str, String)]),
    Procedure(&'a Value),
}

/// The live XRPC transport.
///
/// The client establishes its session lazily on the first authenticated
/// call and transparently refreshes it once when the server reports an
/// expired access token. Without credentials it still serves calls, just
/// unauthenticated.
pub struct XrpcClient {
    http: reqwest::Client,
    host: String,
    credentials: Option<Credentials>,
    session: Mutex<Option<SessionTokens>>,
}

impl XrpcClient {
    /// Creates an unauthenticated client for `host` (e.g. `https://bsky.social`).
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into(),
            credentials: None,
            session: Mutex::new(None),
        }
    }

    /// Creates a client that authenticates with an identifier and app password.
    pub fn with_credentials(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::new(host)
        }
    }

    /// Eagerly establishes a session instead of waiting for the first call.
    pub async fn login(&self) -> Result<(), XrpcError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            XrpcError::Unauthenticated("com.atproto.server.createSession".into())
        })?;
        let tokens = self.create_session(credentials).await?;
        *self.session.lock().await = Some(tokens);
        Ok(())
    }

    fn endpoint(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.host.trim_end_matches('/'), nsid)
    }

    /// Returns the current access token, establishing a session first when
    /// credentials are available and none exists yet.
    async fn access_token(&self) -> Result<Option<String>, XrpcError> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            if let Some(credentials) = &self.credentials {
                *session = Some(self.create_session(credentials).await?);
            }
        }
        Ok(session.as_ref().map(|tokens| tokens.access_jwt.clone()))
    }

    async fn create_session(&self, credentials: &Credentials) -> Result<SessionTokens, XrpcError> {
        const NSID: &str = "com.atproto.server.createSession";
        let input = serde_json::json!({
            "identifier": credentials.identifier,
            "password": credentials.password,
        });
        let response = self.http.post(self.endpoint(NSID)).json(&input).send().await?;
        let tokens: SessionTokens = decode(NSID, Self::handle_response(NSID, response).await?)?;
        tracing::info!(did = %tokens.did, handle = %tokens.handle, "established new session");
        Ok(tokens)
    }

    /// Refreshes the current session, falling back to a fresh login when the
    /// refresh token is rejected. Returns `false` if no session can be
    /// obtained at all.
    async fn refresh_session(&self) -> Result<bool, XrpcError> {
        const NSID: &str = "com.atproto.server.refreshSession";
        let refresh_jwt = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|tokens| tokens.refresh_jwt.clone());

        let Some(refresh_jwt) = refresh_jwt else {
            if self.credentials.is_some() {
                self.login().await?;
                return Ok(true);
            }
            return Ok(false);
        };

        let response = self
            .http
            .post(self.endpoint(NSID))
            .bearer_auth(&refresh_jwt)
            .send()
            .await?;
        match Self::handle_response(NSID, response).await {
            Ok(value) => {
                let tokens: SessionTokens = decode(NSID, value)?;
                tracing::debug!(did = %tokens.did, "session refreshed");
                *self.session.lock().await = Some(tokens);
                Ok(true)
            }
            Err(err) if self.credentials.is_some() => {
                tracing::warn!(error = %err, "session refresh failed, retrying with a fresh login");
                self.login().await?;
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    async fn handle_response(nsid: &str, response: reqwest::Response) -> Result<Value, XrpcError> {
        let status = response.status();
        let ratelimit = RateLimit::from_headers(response.headers());

        if status.is_success() {
            let body = response.bytes().await?;
            if body.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&body).map_err(|source| XrpcError::Decode {
                nsid: nsid.to_string(),
                source,
            });
        }

        #[derive(Default, Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            error: String,
            #[serde(default)]
            message: String,
        }
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let error = if body.error.is_empty() {
            status.canonical_reason().unwrap_or("UnknownError").to_string()
        } else {
            body.error
        };
        Err(XrpcError::Api {
            nsid: nsid.to_string(),
            status: status.as_u16(),
            error,
            message: body.message,
            ratelimit,
        })
    }

    async fn send(&self, nsid: &str, call: Call<'_>) -> Result<Value, XrpcError> {
        let mut refreshed = false;
        loop {
            let token = self.access_token().await?;
            let mut request = match call {
                Call::Query(params) => self.http.get(self.endpoint(nsid)).query(params),
                Call::Procedure(input) if input.is_null() => self.http.post(self.endpoint(nsid)),
                Call::Procedure(input) => self.http.post(self.endpoint(nsid)).json(input),
            };
            if let Some(token) = &token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            match Self::handle_response(nsid, response).await {
                Err(XrpcError::Api { error, .. }) if error == "ExpiredToken" && !refreshed => {
                    refreshed = true;
                    if !self.refresh_session().await? {
                        return Err(XrpcError::Unauthenticated(nsid.to_string()));
                    }
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl XrpcTransport for XrpcClient {
    async fn query(&self, nsid: &str, params: &[(&str, String)]) -> Result<Value, XrpcError> {
        self.send(nsid, Call::Query(params)).await
    }

    async fn procedure(&self, nsid: &str, input: &Value) -> Result<Value, XrpcError> {
        self.send(nsid, Call::Procedure(input)).await
    }
}
