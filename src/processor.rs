//! Turns matching gateway emails into files on disk, then archives them.
//!
//! One cycle lists unread matches, and for each message in listing order:
//! fetch, extract, write, mark read, move to the archive label. A message
//! only leaves the query's result set once it is marked read, so anything
//! that fails earlier is retried by the next poll. Files are overwritten on
//! such a retry.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mailbox::{INBOX, Mailbox, UNREAD};
use crate::models::{Attachment, LabelChange, Message, MessagePart, PartBody, decode_data};
use crate::report::{CycleReport, MessageOutcome, ProcessedMessage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PLAIN_TEXT: &str = "text/plain";

/// Characters replaced by `_` when a subject becomes a file name.
const UNSAFE_SUBJECT_CHARS: &[char] = &[
    ' ', '[', ']', '/', '\\', ';', ',', '>', '<', '&', '*', ':', '%', '=', '+', '@', '!', '#',
    '^', '(', ')', '|', '?',
];

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub query: String,
    pub folder: String,
    pub output_dir: PathBuf,
    pub save_attachments: bool,
    pub save_body: bool,
}

impl From<&Config> for ProcessorConfig {
    fn from(config: &Config) -> Self {
        Self {
            query: config.query.clone(),
            folder: config.folder.clone(),
            output_dir: config.output_dir.clone(),
            save_attachments: config.save_attachments,
            save_body: config.save_body,
        }
    }
}

pub struct MessageProcessor<M> {
    mailbox: M,
    config: ProcessorConfig,
}

impl<M: Mailbox> MessageProcessor<M> {
    pub fn new(mailbox: M, config: ProcessorConfig) -> Self {
        Self { mailbox, config }
    }

    /// Every message ID matching `query`, across all result pages.
    pub async fn list_unprocessed(&self, query: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .mailbox
                .list_messages(query, page_token.as_deref())
                .await?;
            ids.extend(page.ids);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(ids)
    }

    pub async fn extract_attachments(&self, id: &str) -> Result<Vec<Attachment>> {
        let message = self.mailbox.get_message(id).await?;
        self.attachments_of(&message).await
    }

    pub async fn extract_body(&self, id: &str) -> Result<Option<String>> {
        let message = self.mailbox.get_message(id).await?;
        plain_text_body(&message)
    }

    pub async fn subject(&self, id: &str) -> Result<String> {
        let message = self.mailbox.get_message(id).await?;
        Ok(message.subject().to_string())
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        self.mailbox
            .modify_message(
                id,
                LabelChange {
                    add: Vec::new(),
                    remove: vec![UNREAD.to_string()],
                },
            )
            .await
    }

    /// Adds `label_name` and drops `INBOX` in one modify call.
    pub async fn move_to_folder(&self, id: &str, label_name: &str) -> Result<()> {
        let label_id = self.resolve_label(label_name).await?;
        self.mailbox
            .modify_message(
                id,
                LabelChange {
                    add: vec![label_id],
                    remove: vec![INBOX.to_string()],
                },
            )
            .await
    }

    /// Looks the label up fresh every time; IDs are provider-assigned.
    pub async fn resolve_label(&self, label_name: &str) -> Result<String> {
        self.mailbox
            .list_labels()
            .await?
            .into_iter()
            .find(|label| label.name == label_name)
            .map(|label| label.id)
            .ok_or_else(|| Error::LabelNotFound(label_name.to_string()))
    }

    /// One polling pass. Only a failed listing aborts the cycle; per-message
    /// failures are recorded in the report and the next message is processed.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let ids = self.list_unprocessed(&self.config.query).await?;
        if ids.is_empty() {
            debug!("No messages found");
        }

        let mut report = CycleReport::default();
        for id in ids {
            let result = self.process_message(&id).await;
            report.outcomes.push(MessageOutcome { id, result });
        }

        Ok(report)
    }

    async fn process_message(&self, id: &str) -> Result<ProcessedMessage> {
        let message = self.mailbox.get_message(id).await?;
        let subject = message.subject().to_string();
        info!(id, subject = %subject, "Processing");

        let mut written = Vec::new();

        if self.config.save_body {
            match plain_text_body(&message)? {
                Some(body) => {
                    let name = body_file_name(&subject);
                    written.push(write_artifact(&self.config.output_dir, &name, body.as_bytes()).await?);
                }
                None => debug!(id, "No plaintext body"),
            }
        }

        if self.config.save_attachments {
            for attachment in self.attachments_of(&message).await? {
                written.push(
                    write_artifact(&self.config.output_dir, &attachment.filename, &attachment.data)
                        .await?,
                );
            }
        }

        self.mark_read(id).await?;
        self.move_to_folder(id, &self.config.folder).await?;

        Ok(ProcessedMessage { subject, written })
    }

    async fn attachments_of(&self, message: &Message) -> Result<Vec<Attachment>> {
        let mut attachments = Vec::new();

        for part in top_level_parts(message)? {
            let Some(filename) = part.filename.as_deref().filter(|f| !f.is_empty()) else {
                continue;
            };

            let body = part.body.as_ref();
            let encoded = match (
                body.and_then(|b| b.data.as_deref()),
                body.and_then(|b| b.attachment_id.as_deref()),
            ) {
                (Some(data), _) => data.to_string(),
                (None, Some(attachment_id)) => {
                    debug!(id = %message.id, attachment_id, "Fetching attachment");
                    self.mailbox
                        .get_attachment(&message.id, attachment_id)
                        .await?
                }
                (None, None) => {
                    return Err(Error::decode(format!(
                        "attachment {filename:?} has neither data nor an attachment id"
                    )));
                }
            };

            let data = decode_data(&encoded)
                .map_err(|e| Error::decode(format!("attachment {filename:?}: {e}")))?;

            attachments.push(Attachment {
                filename: filename.to_string(),
                data,
            });
        }

        Ok(attachments)
    }
}

fn top_level_parts(message: &Message) -> Result<&[MessagePart]> {
    message
        .payload
        .as_ref()
        .ok_or_else(|| Error::decode(format!("message {} has no payload", message.id)))?
        .parts
        .as_deref()
        .ok_or_else(|| Error::decode(format!("message {} has no MIME parts", message.id)))
}

fn is_plain_text(part: &MessagePart) -> bool {
    part.mime_type.as_deref() == Some(PLAIN_TEXT)
}

/// First `text/plain` part among the top-level parts and their direct
/// children. Anything nested deeper is not searched.
pub fn plain_text_body(message: &Message) -> Result<Option<String>> {
    for part in top_level_parts(message)? {
        if is_plain_text(part) {
            return decode_text(part.body.as_ref()).map(Some);
        }
        if let Some(sub_parts) = &part.parts {
            if let Some(sub_part) = sub_parts.iter().find(|p| is_plain_text(p)) {
                return decode_text(sub_part.body.as_ref()).map(Some);
            }
        }
    }
    Ok(None)
}

fn decode_text(body: Option<&PartBody>) -> Result<String> {
    let data = body
        .and_then(|b| b.data.as_deref())
        .ok_or_else(|| Error::decode("text/plain part has no data"))?;
    let bytes = decode_data(data).map_err(|e| Error::decode(format!("message body: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::decode(format!("message body is not UTF-8: {e}")))
}

pub fn body_file_name(subject: &str) -> String {
    let mut name: String = subject
        .chars()
        .map(|c| if UNSAFE_SUBJECT_CHARS.contains(&c) { '_' } else { c })
        .collect();
    name.push_str(".txt");
    name
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

async fn write_artifact(dir: &Path, name: &str, data: &[u8]) -> Result<PathBuf> {
    if !is_plain_file_name(name) {
        return Err(Error::UnsafeFileName(name.to_string()));
    }
    let path = dir.join(name);
    tokio::fs::write(&path, data)
        .await
        .map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), bytes = data.len(), "Saved");
    Ok(path)
}
