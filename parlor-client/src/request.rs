//! Request construction and input validation shared by both clients.
//!
//! Validation runs before any network traffic; a rejected input is always
//! recoverable by correcting it and calling again.

use parlor_types::{ChatBody, ClientError, GenerateBody, Message, ModelTag};

pub(crate) fn generate_body<'a>(
    model: &'a str,
    prompt: &'a str,
    system: Option<&'a str>,
    stream: bool,
) -> Result<GenerateBody<'a>, ClientError> {
    validate_model(model)?;
    Ok(GenerateBody {
        model,
        prompt,
        stream,
        // The system field is carried only when it has content.
        system: system.filter(|s| !s.is_empty()),
    })
}

pub(crate) fn chat_body<'a>(
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
) -> Result<ChatBody<'a>, ClientError> {
    validate_model(model)?;
    if messages.is_empty() {
        return Err(ClientError::InvalidArgument(
            "messages must not be empty".into(),
        ));
    }
    Ok(ChatBody {
        model,
        messages,
        stream,
    })
}

fn validate_model(model: &str) -> Result<(), ClientError> {
    if model.trim().is_empty() {
        return Err(ClientError::InvalidArgument("no model provided".into()));
    }
    Ok(())
}

/// Listing entries mapped to bare names, `:latest` suffix stripped, order
/// preserved.
pub(crate) fn model_names(tags: &[ModelTag]) -> Vec<String> {
    tags.iter().map(|tag| tag.short_name().to_string()).collect()
}
