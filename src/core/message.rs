//! Conversation messages and the append-only conversation log

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

/// A model's request to invoke a registered function. `arguments` is the raw
/// payload text and is only parsed at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// A single conversation turn, shaped like a chat-completions message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: &str) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::text(Role::Assistant, content)
    }

    fn text(role: Role, content: &str) -> Self {
        Message {
            role,
            content: Some(content.to_string()),
            function_call: None,
            name: None,
        }
    }

    fn function_call(call: FunctionCall) -> Self {
        Message {
            role: Role::Assistant,
            content: None,
            function_call: Some(call),
            name: None,
        }
    }

    fn function_result(name: &str, content: String) -> Self {
        Message {
            role: Role::Function,
            content: Some(content),
            function_call: None,
            name: Some(name.to_string()),
        }
    }
}

/// Ordered message history for one session.
///
/// A function call is only ever appended together with its result, so the
/// log never holds an unanswered call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, content: &str) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(Message::assistant(content));
    }

    /// Appends the assistant's call and the function's textual result as one
    /// unit.
    pub fn push_function_exchange(&mut self, call: FunctionCall, result: String) {
        let name = call.name.clone();
        self.messages.push(Message::function_call(call));
        self.messages.push(Message::function_result(&name, result));
    }

    /// Drops every message after the first `len`. Only called with lengths
    /// recorded between exchanges, so no call is separated from its result.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Checks the stored log: it opens with a user message, holds no system
    /// messages, and pairs every call with its result.
    pub fn validate(messages: &[Message]) -> Result<(), String> {
        if messages.first().is_some_and(|m| m.role != Role::User) {
            return Err("conversation must start with a user message".to_string());
        }

        let mut i = 0;
        while i < messages.len() {
            let message = &messages[i];
            match message.role {
                Role::System => {
                    return Err(format!("system message at {i} is never stored"));
                }
                Role::User if message.content.is_none() => {
                    return Err(format!("user message {i} has no content"));
                }
                _ => {}
            }
            if let Some(call) = &message.function_call {
                if message.role != Role::Assistant {
                    return Err(format!(
                        "message {i} carries a function call but is not from the assistant"
                    ));
                }
                match messages.get(i + 1) {
                    Some(next)
                        if next.role == Role::Function
                            && next.name.as_deref() == Some(call.name.as_str()) =>
                    {
                        i += 2;
                        continue;
                    }
                    _ => {
                        return Err(format!(
                            "function call {} at message {i} has no matching result",
                            call.name
                        ));
                    }
                }
            }
            if message.role == Role::Function {
                return Err(format!("function result at message {i} has no preceding call"));
            }
            i += 1;
        }
        Ok(())
    }
}

impl TryFrom<Vec<Message>> for Conversation {
    type Error = String;

    fn try_from(messages: Vec<Message>) -> Result<Self, Self::Error> {
        Conversation::validate(&messages)?;
        Ok(Conversation { messages })
    }
}

impl From<Conversation> for Vec<Message> {
    fn from(conversation: Conversation) -> Self {
        conversation.messages
    }
}
