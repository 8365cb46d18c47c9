use super::ui;
use crate::core::{Conversation, Message, Role};
use comfy_table::Cell;

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Function => "function",
    }
}

fn describe(message: &Message) -> String {
    match (&message.function_call, message.role) {
        (Some(call), _) => format!("call {}({})", call.name, call.arguments),
        (None, Role::Function) => format!(
            "{} -> {}",
            message.name.as_deref().unwrap_or("?"),
            message.content.as_deref().unwrap_or_default()
        ),
        (None, _) => message.content.clone().unwrap_or_default(),
    }
}

/// Renders the conversation as a numbered table.
pub fn display_as_table(conversation: &Conversation) -> String {
    if conversation.is_empty() {
        return ui::style_text("No conversation yet.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Role"),
        ui::header_cell("Content"),
    ]);

    for (i, message) in conversation.messages().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(role_label(message.role)),
            Cell::new(describe(message)),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::FunctionCall;

    #[test]
    fn test_history_table() {
        let mut conversation = Conversation::new();
        conversation.push_user("RSI for TSLA?");
        conversation.push_function_exchange(
            FunctionCall {
                name: "calculate_rsi".to_string(),
                arguments: r#"{"ticker":"TSLA"}"#.to_string(),
            },
            "61.2".to_string(),
        );
        conversation.push_assistant("It is 61.2.");

        let output = display_as_table(&conversation);
        assert!(output.contains("RSI for TSLA?"));
        assert!(output.contains("calculate_rsi"));
        assert!(output.contains("61.2"));
        assert!(output.contains("assistant"));
    }

    #[test]
    fn test_empty_history() {
        let output = display_as_table(&Conversation::new());
        assert!(output.contains("No conversation yet."));
    }
}
