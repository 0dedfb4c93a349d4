use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Target used when the caller names nobody.
pub const DEFAULT_GREETING_TARGET: &str = "World";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub message: String,
    pub target: String,
    pub created_at: OffsetDateTime,
}

impl Greeting {
    /// Wire shape shared by the CLI `--json` output and the REST response.
    pub fn payload(&self) -> GreetingPayload {
        GreetingPayload {
            message: self.message.clone(),
            target: self.target.clone(),
        }
    }

    pub fn timestamp(&self) -> Result<String, time::error::Format> {
        self.created_at.format(&Rfc3339)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetingPayload {
    pub message: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GreetingInput {
    pub name: Option<String>,
    pub message: Option<String>,
}

pub fn create_greeting(target: impl Into<String>, message: impl Into<String>) -> Greeting {
    Greeting {
        message: message.into(),
        target: target.into(),
        created_at: OffsetDateTime::now_utc(),
    }
}

/// Resolves the target (trimmed name, else [`DEFAULT_GREETING_TARGET`]) and
/// the message (explicit message, else `Hello, {target}!`).
pub fn create_greeting_use_case(input: GreetingInput) -> Greeting {
    let target = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_GREETING_TARGET)
        .to_string();
    let message = input
        .message
        .unwrap_or_else(|| format!("Hello, {target}!"));
    create_greeting(target, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_greets_the_world() {
        let greeting = create_greeting_use_case(GreetingInput::default());
        assert_eq!(greeting.message, "Hello, World!");
        assert_eq!(greeting.target, "World");
    }

    #[test]
    fn names_are_trimmed() {
        let greeting = create_greeting_use_case(GreetingInput {
            name: Some(" Dev ".into()),
            message: None,
        });
        assert_eq!(
            greeting.payload(),
            GreetingPayload {
                message: "Hello, Dev!".into(),
                target: "Dev".into(),
            }
        );
    }

    #[test]
    fn blank_name_falls_back_to_default() {
        let greeting = create_greeting_use_case(GreetingInput {
            name: Some("   ".into()),
            message: None,
        });
        assert_eq!(greeting.target, DEFAULT_GREETING_TARGET);
    }

    #[test]
    fn explicit_message_wins() {
        let greeting = create_greeting_use_case(GreetingInput {
            name: Some("Dev".into()),
            message: Some("Welcome back".into()),
        });
        assert_eq!(greeting.message, "Welcome back");
        assert_eq!(greeting.target, "Dev");
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let greeting = create_greeting("a", "b");
        let stamp = greeting.timestamp().unwrap();
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }
}
