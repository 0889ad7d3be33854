//! Chat model trait: the boundary to the external language model.

use async_trait::async_trait;

use crate::error::Result;
use crate::prompt::Prompt;
use crate::reply::ChatReply;

/// A chat-completion service answering a grounded [`Prompt`].
///
/// Implementations send the system instruction and the user message as two
/// messages and return the model's raw text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the raw response text for `prompt`.
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Return the model name, for logs and error messages.
    fn name(&self) -> &str;

    /// Complete and split the response into a [`ChatReply`].
    async fn reply(&self, prompt: &Prompt) -> Result<ChatReply> {
        Ok(ChatReply::parse(&self.complete(prompt).await?))
    }
}
