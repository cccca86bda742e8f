use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RemotePolicy;
use crate::error::{Error, Result};
use crate::fetch::{BasicClient, HttpClient};

pub(crate) const SERVICE: &str = "superset";
const LOGIN_PATH: &str = "/api/v1/security/login";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    provider: &'static str,
    refresh: bool,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Authentication state of a [`Session`].
///
/// There is no automatic refresh: once a request is refused for
/// authorization reasons the session leaves `Authenticated` and every further
/// request fails until the caller authenticates again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated { token: String },
    /// The service reported the bearer token as expired.
    Expired,
}

/// An authenticated JSON connection to the dashboard service.
pub struct Session<C = BasicClient> {
    http: C,
    base_url: String,
    state: AuthState,
    policy: RemotePolicy,
    /// Spaces consecutive calls by `policy.min_interval`; `None` when the
    /// interval is zero.
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Session {
    pub fn new(base_url: &str, policy: RemotePolicy) -> Result<Self> {
        let http =
            BasicClient::new(policy.request_timeout).map_err(|e| Error::connectivity(SERVICE, e))?;
        Ok(Session::with_client(http, base_url, policy))
    }
}

impl<C: HttpClient> Session<C> {
    pub fn with_client(http: C, base_url: &str, policy: RemotePolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            state: AuthState::Unauthenticated,
            limiter: Quota::with_period(policy.min_interval).map(RateLimiter::direct),
            policy,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated { .. })
    }

    /// Exchanges credentials for a bearer token.
    #[tracing::instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        let body = serde_json::to_value(LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
            provider: "db",
            refresh: true,
        })?;

        self.state = AuthState::Unauthenticated;
        let (status, text) = self
            .dispatch(Method::POST, LOGIN_PATH, Some(&body), None)
            .await?;

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST)
        {
            return Err(Error::Authentication(text));
        }
        let text = check_status(status, text, &format!("POST {LOGIN_PATH}"))?;

        let login: LoginResponse =
            serde_json::from_str(&text).map_err(|e| Error::invalid_response(SERVICE, e))?;
        self.state = AuthState::Authenticated {
            token: login.access_token,
        };
        debug!("Session authenticated");
        Ok(())
    }

    /// Sends a JSON request with the bearer token and returns the decoded
    /// response body (`Null` for an empty body).
    ///
    /// A 401 moves the session out of `Authenticated` and surfaces as
    /// [`Error::Authentication`]; the caller decides whether to re-authenticate.
    pub async fn request(&mut self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let token = match &self.state {
            AuthState::Authenticated { token } => token.clone(),
            AuthState::Unauthenticated => {
                return Err(Error::Authentication(
                    "session is not authenticated".to_string(),
                ));
            }
            AuthState::Expired => {
                return Err(Error::Authentication(
                    "session token has expired; authenticate again".to_string(),
                ));
            }
        };

        let target = format!("{method} {path}");
        let (status, text) = self.dispatch(method, path, body, Some(&token)).await?;

        if status == StatusCode::UNAUTHORIZED {
            self.state = if text.to_ascii_lowercase().contains("expired") {
                AuthState::Expired
            } else {
                AuthState::Unauthenticated
            };
            warn!(%target, body = %text, "Request refused, session no longer authenticated");
            return Err(Error::Authentication(text));
        }

        let text = check_status(status, text, &target)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| Error::invalid_response(SERVICE, e))
    }

    /// One logical call: pacing, then up to `max_retries` extra attempts for
    /// connectivity failures with exponential backoff.
    async fn dispatch(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<(StatusCode, String)> {
        let url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| Error::Config(format!("invalid Superset URL '{}{path}': {e}", self.base_url)))?;

        let mut attempt = 0;
        loop {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }
            let req = build_request(method.clone(), url.clone(), body, token)?;

            let result = match self.http.execute(req).await {
                Ok(response) => {
                    let status = response.status();
                    match response.text().await {
                        Ok(text) if is_gateway_failure(status) => Err(Error::connectivity(
                            SERVICE,
                            format!("status {status}: {text}"),
                        )),
                        Ok(text) => Ok((status, text)),
                        Err(e) => Err(Error::connectivity(SERVICE, e)),
                    }
                }
                Err(e) => Err(Error::connectivity(SERVICE, e)),
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.backoff(attempt);
                    warn!(%method, path, attempt, ?delay, error = %err, "Retrying after connectivity failure");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

fn build_request(method: Method, url: Url, body: Option<&Value>, token: Option<&str>) -> Result<Request> {
    let mut req = Request::new(method, url);
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::invalid_response(SERVICE, format!("unusable access token: {e}")))?;
        req.headers_mut().insert(AUTHORIZATION, value);
    }
    if let Some(body) = body {
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    }
    Ok(req)
}

fn is_gateway_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Passes successful bodies through; anything else becomes a rejection that
/// carries the service's body verbatim.
fn check_status(status: StatusCode, body: String, target: &str) -> Result<String> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(Error::RemoteRejection {
            service: SERVICE.to_string(),
            target: target.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
