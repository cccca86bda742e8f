use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Wrappers (see [`crate::fetch::auth`]) layer
/// headers on top of an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
