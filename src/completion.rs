//! The completion client and its error taxonomy.
//!
//! A [`CompletionClient`] performs exactly one request/response exchange with the
//! chat completion endpoint per call to [`CompletionClient::complete`]. It holds no
//! conversation state: every call receives the full list of turns, serializes them
//! in order, and either returns the reply text or an [`Error`]. Nothing is retried.
//!
//! ## Error Handling
//!
//! Every failure is terminal for the turn that caused it. The [`ErrorKind`] enum
//! names the category of failure:
//! - [`ErrorKind::MissingCredential`]: no API key, the network was never touched.
//! - [`ErrorKind::Transport`]: no response was obtained.
//! - [`ErrorKind::Remote`]: a response other than `200 OK`. The raw body is kept
//!   verbatim as the diagnostic.
//! - [`ErrorKind::MalformedResponse`]: a `200 OK` whose body holds no reply.

mod openrouter;
pub(crate) mod transport;

use std::borrow::Cow;
use std::sync::Arc;

use reqwest::Url;

use crate::chat::Turn;
use transport::Transport;

pub(crate) use openrouter::{MalformedReply, DEFAULT_API_BASE};

/// The category of a completion failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    MissingCredential,
    Transport,
    Remote,
    MalformedResponse,
}

/// A coarse reading of a non-200 status, used to hint at a remedy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteStatus {
    /// The API key was rejected or lacks the needed permissions.
    Authentication,
    /// A rate limit was reached or the credits ran out.
    ExcessUsage,
    /// The requested model was not found.
    NotFound,
    /// The request was malformed or otherwise improper.
    BadRequest,
    /// The server encountered an error.
    InternalError,
    /// The upstream provider is overloaded or unreachable.
    ApiOverloaded,
    /// A status that does not fit into any of the other categories.
    Unspecified,
}

impl RemoteStatus {
    pub(crate) fn from_status(status: u16) -> RemoteStatus {
        match status {
            401 | 403 => RemoteStatus::Authentication,
            402 | 429 => RemoteStatus::ExcessUsage,
            404 => RemoteStatus::NotFound,
            400 | 409 | 422 => RemoteStatus::BadRequest,
            500 => RemoteStatus::InternalError,
            502 | 503 | 504 => RemoteStatus::ApiOverloaded,
            _ => RemoteStatus::Unspecified,
        }
    }

    pub(crate) fn message(&self) -> &'static str {
        match self {
            RemoteStatus::Authentication => "authentication failed or not provided",
            RemoteStatus::ExcessUsage => "rate limit exceeded or quota crossed",
            RemoteStatus::NotFound => "the requested resource was not found",
            RemoteStatus::BadRequest => "the request was bad or malformed",
            RemoteStatus::InternalError => "the server encountered an internal error",
            RemoteStatus::ApiOverloaded => "API server(s) are currently overloaded",
            RemoteStatus::Unspecified => "an unspecified error occurred",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    /// No API key was supplied
    #[error("no API key was provided")]
    MissingCredential,

    /// The exchange failed before a response was obtained
    #[error("the request could not be completed")]
    Transport(#[from] transport::Error),

    /// The endpoint answered with a status other than 200
    #[error("the API responded with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// The endpoint answered 200 but the body held no reply
    #[error("the API response was malformed")]
    MalformedResponse(#[from] MalformedReply),
}

impl Error {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingCredential => ErrorKind::MissingCredential,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Remote { .. } => ErrorKind::Remote,
            Error::MalformedResponse(_) => ErrorKind::MalformedResponse,
        }
    }

    /// The text shown to the user. For remote failures this is the raw body.
    pub(crate) fn diagnostic(&self) -> Cow<'_, str> {
        match self {
            Error::Remote { body, .. } => Cow::Borrowed(body),
            Error::Transport(err) => Cow::Owned(format!("{}: {}", self, err)),
            Error::MalformedResponse(err) => Cow::Owned(format!("{}: {}", self, err)),
            Error::MissingCredential => Cow::Owned(self.to_string()),
        }
    }

    pub(crate) fn remote_status(&self) -> Option<RemoteStatus> {
        match self {
            Error::Remote { status, .. } => Some(RemoteStatus::from_status(*status)),
            _ => None,
        }
    }
}

/// Issues chat completions against a single endpoint.
pub(crate) struct CompletionClient {
    transport: Arc<dyn Transport>,
    endpoint: Url,
}

impl CompletionClient {
    /// Builds a client posting to the chat completions route under `api_base`.
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        api_base: &str,
    ) -> Result<CompletionClient, url::ParseError> {
        let endpoint = Url::parse(api_base)?.join(openrouter::CHAT_COMPLETIONS_PATH)?;

        Ok(CompletionClient {
            transport,
            endpoint,
        })
    }

    pub(crate) fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends `turns` to `model` and returns the reply text.
    ///
    /// `turns` must hold at least the latest user turn. A `credential` that is
    /// absent or blank fails with [`Error::MissingCredential`] before any network
    /// activity.
    pub(crate) async fn complete(
        &self,
        turns: &[Turn],
        model: &str,
        credential: Option<&str>,
    ) -> Result<String, Error> {
        debug_assert!(!turns.is_empty(), "a completion needs at least one turn");

        let credential = match credential.map(str::trim) {
            Some(credential) if !credential.is_empty() => credential,
            _ => return Err(Error::MissingCredential),
        };

        let request = openrouter::ChatCompletionRequest::new(model, turns);

        tracing::debug!(
            model,
            turns = turns.len(),
            endpoint = %self.endpoint,
            "sending completion request"
        );

        let response = self
            .transport
            .post_json(&self.endpoint, credential, &request)
            .await
            .map_err(|err| {
                tracing::warn!(kind = ?err.kind(), "completion request failed: {}", err);
                err
            })?;

        if response.status != 200 {
            tracing::warn!(status = response.status, "completion endpoint returned an error");

            return Err(Error::Remote {
                status: response.status,
                body: response.body,
            });
        }

        let reply = openrouter::extract_reply(&response.body).map_err(|err| {
            tracing::warn!("completion response was malformed: {}", err);
            err
        })?;

        tracing::debug!(chars = reply.chars().count(), "received completion");

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::transport::fake::{FakeTransport, Reply};
    use super::transport::ErrorKind as TransportErrorKind;
    use super::*;
    use serde_json::json;

    fn client(transport: &Arc<FakeTransport>) -> CompletionClient {
        CompletionClient::new(transport.clone(), DEFAULT_API_BASE).unwrap()
    }

    #[test]
    fn test_default_endpoint() {
        let transport = Arc::new(FakeTransport::new(vec![]));

        assert_eq!(
            client(&transport).endpoint().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_invalid_api_base() {
        let transport = Arc::new(FakeTransport::new(vec![]));

        assert!(CompletionClient::new(transport, "not a url").is_err());
    }

    #[tokio::test]
    async fn test_missing_credential_skips_network() {
        let transport = Arc::new(FakeTransport::new(vec![]));
        let client = client(&transport);
        let turns = [Turn::user("hi")];

        for credential in [None, Some(""), Some("   ")] {
            let res = client.complete(&turns, "m", credential).await;

            assert!(matches!(res, Err(Error::MissingCredential)));
        }

        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_reply() {
        let transport = Arc::new(FakeTransport::responding(
            200,
            r#"{"choices":[{"message":{"content":"hello"}}]}"#,
        ));
        let client = client(&transport);

        let reply = client
            .complete(&[Turn::user("hi")], "m", Some("k"))
            .await
            .unwrap();

        assert_eq!(reply, "hello");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_history_and_credential() {
        let transport = Arc::new(FakeTransport::replying("ok"));
        let client = client(&transport);
        let turns = [Turn::user("hi"), Turn::assistant("hello"), Turn::user("again")];

        client
            .complete(&turns, "deepseek/deepseek-chat-v3-0324:free", Some("sk-or-v1-x"))
            .await
            .unwrap();

        let requests = transport.requests();

        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url.as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(requests[0].credential, "sk-or-v1-x");
        assert_eq!(
            requests[0].body,
            json!({
                "model": "deepseek/deepseek-chat-v3-0324:free",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "again"},
                ],
                "max_tokens": 1000,
                "temperature": 0.7,
            })
        );
    }

    #[tokio::test]
    async fn test_remote_error_keeps_raw_body() {
        let transport = Arc::new(FakeTransport::responding(500, "server exploded"));
        let client = client(&transport);

        let err = client
            .complete(&[Turn::user("hi")], "m", Some("k"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(err.diagnostic(), "server exploded");
        assert_eq!(err.remote_status(), Some(RemoteStatus::InternalError));
        assert!(matches!(err, Error::Remote { status: 500, ref body } if body == "server exploded"));
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_remote_error() {
        let transport = Arc::new(FakeTransport::responding(204, ""));
        let client = client(&transport);

        let err = client
            .complete(&[Turn::user("hi")], "m", Some("k"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Remote { status: 204, .. }));
    }

    #[tokio::test]
    async fn test_missing_choices_is_malformed() {
        let transport = Arc::new(FakeTransport::responding(200, r#"{"id":"gen-1"}"#));
        let client = client(&transport);

        let err = client
            .complete(&[Turn::user("hi")], "m", Some("k"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(matches!(
            err,
            Error::MalformedResponse(MalformedReply::MissingChoices)
        ));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let transport = Arc::new(FakeTransport::failing(TransportErrorKind::TimedOut));
        let client = client(&transport);

        let err = client
            .complete(&[Turn::user("hi")], "m", Some("k"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(
            err.diagnostic(),
            "the request could not be completed: timed out"
        );
    }

    #[tokio::test]
    async fn test_no_retry_after_failure() {
        let transport = Arc::new(FakeTransport::new(vec![
            Reply::Status(503, "busy".to_string()),
            Reply::Status(200, r#"{"choices":[{"message":{"content":"late"}}]}"#.to_string()),
        ]));
        let client = client(&transport);

        let res = client.complete(&[Turn::user("hi")], "m", Some("k")).await;

        assert!(matches!(res, Err(Error::Remote { status: 503, .. })));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_remote_status_hints() {
        assert_eq!(RemoteStatus::from_status(401), RemoteStatus::Authentication);
        assert_eq!(RemoteStatus::from_status(402), RemoteStatus::ExcessUsage);
        assert_eq!(RemoteStatus::from_status(429), RemoteStatus::ExcessUsage);
        assert_eq!(RemoteStatus::from_status(404), RemoteStatus::NotFound);
        assert_eq!(RemoteStatus::from_status(502), RemoteStatus::ApiOverloaded);
        assert_eq!(RemoteStatus::from_status(418), RemoteStatus::Unspecified);
    }
}
