//! A chat session: one conversation and the turn loop that extends it.
//!
//! The host owns the `Session` for as long as the chat lasts and drops it when
//! the chat ends (or when the user clears it). Sessions share nothing mutable.

use crate::chat::{Conversation, Turn};
use crate::completion::{self, CompletionClient};

pub(crate) struct Session<'c> {
    client: &'c CompletionClient,
    conversation: Conversation,
}

impl<'c> Session<'c> {
    pub(crate) fn new(client: &'c CompletionClient) -> Session<'c> {
        Session {
            client,
            conversation: Conversation::new(),
        }
    }

    pub(crate) fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Records a user turn. This happens before, and regardless of, any
    /// completion.
    pub(crate) fn submit_user_message(&mut self, text: String) {
        self.conversation.append(Turn::user(text));
    }

    /// Requests a reply to the conversation as it stands.
    ///
    /// On success the reply is appended as an assistant turn and returned. On
    /// failure the conversation is left untouched; a user turn without a reply
    /// stays in the history and is resent with the next exchange.
    pub(crate) async fn advance(
        &mut self,
        model: &str,
        credential: Option<&str>,
    ) -> Result<&Turn, completion::Error> {
        let reply = self
            .client
            .complete(self.conversation.turns(), model, credential)
            .await?;

        self.conversation.append(Turn::assistant(reply));

        // The turn was appended just above
        Ok(&self.conversation.turns()[self.conversation.len() - 1])
    }

    /// Handles one message from the user: records it, then advances.
    pub(crate) async fn on_user_submit(
        &mut self,
        text: String,
        model: &str,
        credential: Option<&str>,
    ) -> Result<&Conversation, completion::Error> {
        self.submit_user_message(text);

        self.advance(model, credential).await?;

        Ok(&self.conversation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::chat::Role;
    use crate::completion::transport::fake::{success_body, FakeTransport, Reply};
    use crate::completion::transport::ErrorKind as TransportErrorKind;
    use crate::completion::{ErrorKind, DEFAULT_API_BASE};

    fn client(transport: &Arc<FakeTransport>) -> CompletionClient {
        CompletionClient::new(transport.clone(), DEFAULT_API_BASE).unwrap()
    }

    #[test]
    fn test_submit_appends_user_turn() {
        let transport = Arc::new(FakeTransport::new(vec![]));
        let client = client(&transport);
        let mut session = Session::new(&client);

        session.submit_user_message("hi".to_string());

        assert_eq!(session.conversation().turns(), &[Turn::user("hi")]);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        let transport = Arc::new(FakeTransport::replying("hello"));
        let client = client(&transport);
        let mut session = Session::new(&client);

        assert!(session.conversation().is_empty());

        session.submit_user_message("hi".to_string());

        assert_eq!(session.conversation().turns(), &[Turn::user("hi")]);

        let reply = session.advance("m", Some("k")).await.unwrap();

        assert_eq!(reply, &Turn::assistant("hello"));
        assert_eq!(
            session.conversation().turns(),
            &[Turn::user("hi"), Turn::assistant("hello")]
        );
    }

    #[tokio::test]
    async fn test_request_excludes_pending_reply() {
        let transport = Arc::new(FakeTransport::replying("hello"));
        let client = client(&transport);
        let mut session = Session::new(&client);

        session.submit_user_message("hi".to_string());
        session.advance("m", Some("k")).await.unwrap();

        let messages = transport.requests()[0].body["messages"].clone();

        assert_eq!(messages, serde_json::json!([{"role": "user", "content": "hi"}]));
    }

    #[tokio::test]
    async fn test_rate_limited_exchange_keeps_user_turn() {
        let transport = Arc::new(FakeTransport::responding(429, "rate limited"));
        let client = client(&transport);
        let mut session = Session::new(&client);

        session.submit_user_message("hi".to_string());

        let err = session.advance("m", Some("k")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(err.diagnostic(), "rate limited");
        assert_eq!(session.conversation().turns(), &[Turn::user("hi")]);
    }

    #[tokio::test]
    async fn test_successful_turns_alternate() {
        let transport = Arc::new(FakeTransport::new(vec![
            Reply::Status(200, success_body("one")),
            Reply::Status(200, success_body("two")),
            Reply::Status(200, success_body("three")),
        ]));
        let client = client(&transport);
        let mut session = Session::new(&client);

        for (n, text) in ["a", "b", "c"].into_iter().enumerate() {
            let conversation = session
                .on_user_submit(text.to_string(), "m", Some("k"))
                .await
                .unwrap();

            assert_eq!(conversation.len(), 2 * (n + 1));
        }

        let roles: Vec<Role> = session
            .conversation()
            .turns()
            .iter()
            .map(|t| t.role())
            .collect();

        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_exchange_grows_by_one() {
        let transport = Arc::new(FakeTransport::new(vec![
            Reply::Status(200, success_body("hello")),
            Reply::Fail(TransportErrorKind::ConnectFailed),
            Reply::Status(200, r#"{"id":"gen-1"}"#.to_string()),
        ]));
        let client = client(&transport);
        let mut session = Session::new(&client);

        session
            .on_user_submit("hi".to_string(), "m", Some("k"))
            .await
            .unwrap();

        assert_eq!(session.conversation().len(), 2);

        let err = session
            .on_user_submit("still there?".to_string(), "m", Some("k"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(session.conversation().len(), 3);

        let err = session
            .on_user_submit("hello?".to_string(), "m", Some("k"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert_eq!(session.conversation().len(), 4);
        assert_eq!(session.conversation().last(), Some(&Turn::user("hello?")));
    }

    #[tokio::test]
    async fn test_orphaned_user_turn_is_resent() {
        let transport = Arc::new(FakeTransport::new(vec![
            Reply::Status(500, "server exploded".to_string()),
            Reply::Status(200, success_body("sorry, I'm back")),
        ]));
        let client = client(&transport);
        let mut session = Session::new(&client);

        assert!(session
            .on_user_submit("hi".to_string(), "m", Some("k"))
            .await
            .is_err());

        session
            .on_user_submit("hi again".to_string(), "m", Some("k"))
            .await
            .unwrap();

        let requests = transport.requests();

        assert_eq!(
            requests[1].body["messages"],
            serde_json::json!([
                {"role": "user", "content": "hi"},
                {"role": "user", "content": "hi again"},
            ])
        );
        assert_eq!(
            session.conversation().turns(),
            &[
                Turn::user("hi"),
                Turn::user("hi again"),
                Turn::assistant("sorry, I'm back")
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_credential_still_records_user_turn() {
        let transport = Arc::new(FakeTransport::new(vec![]));
        let client = client(&transport);
        let mut session = Session::new(&client);

        let err = session
            .on_user_submit("hi".to_string(), "m", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingCredential);
        assert_eq!(session.conversation().turns(), &[Turn::user("hi")]);
        assert_eq!(transport.calls(), 0);
    }
}
