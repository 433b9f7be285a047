//! Conversation construction for SQL resolution.

use crate::models::message::ConversationMessage;

/// Corrective instruction appended after a failed attempt.
pub const RETRY_INSTRUCTION: &str = "That query is invalid. Please try again.";

/// System message grounding the model in `schema`.
#[must_use]
pub fn system_message(schema: &str) -> ConversationMessage {
    ConversationMessage::system(
        [
            "Given the following SQLite tables, your job is to write queries given a user’s request.",
            "Escape table and column names with double quotes.",
            "",
            schema,
            "",
            "Write a SQLite query for the following request:",
        ]
        .join("\n"),
    )
}

/// User message carrying the request and, optionally, the expected columns.
#[must_use]
pub fn user_message(request: &str, expected_columns: Option<&[String]>) -> ConversationMessage {
    match expected_columns {
        Some(columns) => {
            let column_list = columns.join(", ");
            ConversationMessage::user(
                [
                    request,
                    "",
                    "the output should have the following columns:",
                    column_list.as_str(),
                ]
                .join("\n"),
            )
        }
        None => ConversationMessage::user(request),
    }
}

/// Initial two-message conversation for a resolution.
#[must_use]
pub fn initial_conversation(
    schema: &str,
    request: &str,
    expected_columns: Option<&[String]>,
) -> Vec<ConversationMessage> {
    vec![
        system_message(schema),
        user_message(request, expected_columns),
    ]
}

/// Messages appended after the model's completion failed to execute.
#[must_use]
pub fn retry_messages(completion: &str) -> [ConversationMessage; 2] {
    [
        ConversationMessage::assistant(completion),
        ConversationMessage::user(RETRY_INSTRUCTION),
    ]
}
