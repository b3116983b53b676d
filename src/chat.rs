//! Type definitions for chat primitives
//!

use std::fmt;

/// The author of a `Turn`
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Role {
    /// A message authored by the user
    User,

    /// A message authored by the model
    Assistant,
}

/// A single message in a conversation. Turns cannot be modified once
/// they are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub(crate) fn new(role: Role, content: String) -> Turn {
        Turn { role, content }
    }

    pub(crate) fn user<S: Into<String>>(content: S) -> Turn {
        Turn::new(Role::User, content.into())
    }

    pub(crate) fn assistant<S: Into<String>>(content: S) -> Turn {
        Turn::new(Role::Assistant, content.into())
    }

    /// The author of the turn
    pub(crate) fn role(&self) -> Role {
        self.role
    }

    /// The text of the turn
    pub(crate) fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.content)
    }
}

/// An ordered, append-only sequence of turns.
///
/// The order is the order of insertion, which is also chronological. An empty
/// conversation is the initial state of every session.
#[derive(Debug, Clone, Default)]
pub(crate) struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub(crate) fn new() -> Conversation {
        Conversation::default()
    }

    pub(crate) fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub(crate) fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub(crate) fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub(crate) fn len(&self) -> usize {
        self.turns.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let conversation = Conversation::new();

        assert!(conversation.is_empty());
        assert_eq!(conversation.len(), 0);
        assert!(conversation.last().is_none());
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut conversation = Conversation::new();

        conversation.append(Turn::user("one"));
        conversation.append(Turn::assistant("two"));
        conversation.append(Turn::user("three"));

        let contents: Vec<&str> = conversation.turns().iter().map(|t| t.content()).collect();

        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(conversation.last(), Some(&Turn::user("three")));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Turn::assistant("hi").to_string(), "assistant: hi");
    }
}
