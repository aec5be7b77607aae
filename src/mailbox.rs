use crate::error::Result;
use crate::models::{Label, LabelChange, Message, MessagePage};
use async_trait::async_trait;

pub const INBOX: &str = "INBOX";
pub const UNREAD: &str = "UNREAD";

/// The remote calls the processor needs from a mail provider.
#[async_trait]
pub trait Mailbox: Send + Sync {
    async fn list_messages(&self, query: &str, page_token: Option<&str>) -> Result<MessagePage>;

    async fn get_message(&self, id: &str) -> Result<Message>;

    /// Returns the attachment's URL-safe base64 data.
    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String>;

    async fn modify_message(&self, id: &str, change: LabelChange) -> Result<()>;

    async fn list_labels(&self) -> Result<Vec<Label>>;
}
