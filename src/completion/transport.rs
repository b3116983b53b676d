//! The network seam of the completion client.
//!
//! A [`Transport`] performs exactly one HTTP POST and hands back the raw status
//! and body. It does not interpret either; that is left to the client so the
//! interpretation can be tested against a fake transport.

mod error;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::openrouter::ChatCompletionRequest;

pub(crate) use error::Error;
#[cfg(test)]
pub(crate) use error::ErrorKind;

/// The status and body of a completed HTTP exchange
#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub(crate) trait Transport: Send + Sync {
    /// POSTs `body` as JSON to `url`, authorized with the bearer `credential`.
    async fn post_json(
        &self,
        url: &Url,
        credential: &str,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<HttpResponse, Error>;
}

/// The production transport backed by a shared `reqwest::Client`. No timeout is
/// configured; reqwest's defaults apply.
#[derive(Default)]
pub(crate) struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub(crate) fn new() -> ReqwestTransport {
        ReqwestTransport::default()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &Url,
        credential: &str,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<HttpResponse, Error> {
        // `json` sets `Content-Type: application/json`
        let res = self
            .client
            .post(url.clone())
            .bearer_auth(credential)
            .json(body)
            .send()
            .await?;

        let status = res.status().as_u16();

        let body = res.text().await?;

        Ok(HttpResponse { status, body })
    }
}
