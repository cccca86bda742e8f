use crate::error::{Error, Result};
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects a fixed header into every request.
///
/// Used for identities that never change during a run, such as the
/// `X-Trino-User` header. The header is validated once at construction.
pub struct StaticHeader<C> {
    inner: C,
    name: HeaderName,
    value: HeaderValue,
}

impl<C> StaticHeader<C> {
    pub fn new(inner: C, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Config(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Config(format!("invalid value for header '{name}': {e}")))?;
        Ok(Self { inner, name, value })
    }

    /// `X-Trino-User: <user>`, the identity Trino attributes queries to.
    pub fn trino_user(inner: C, user: &str) -> Result<Self> {
        Self::new(inner, "X-Trino-User", user)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for StaticHeader<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}
