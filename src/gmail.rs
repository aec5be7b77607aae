use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::models::{self, encode_data};
use async_trait::async_trait;
use google_gmail1::Gmail;
use google_gmail1::api::{MessagePart, MessagePartBody, ModifyMessageRequest};
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use tracing::debug;

const USER_ID: &str = "me";

#[derive(Clone)]
pub struct GmailClient {
    hub: Gmail<HttpsConnector<HttpConnector>>,
    scope: String,
}

impl GmailClient {
    pub fn new(hub: Gmail<HttpsConnector<HttpConnector>>, scope: impl Into<String>) -> Self {
        Self {
            hub,
            scope: scope.into(),
        }
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_messages(&self, query: &str, page_token: Option<&str>) -> Result<models::MessagePage> {
        let mut req = self
            .hub
            .users()
            .messages_list(USER_ID)
            .q(query)
            .add_scope(&self.scope);

        if let Some(token) = page_token {
            req = req.page_token(token);
        }

        let (_, message_list) = req
            .doit()
            .await
            .map_err(|e| Error::remote("list messages", e))?;

        let ids = message_list
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .collect();

        Ok(models::MessagePage {
            ids,
            next_page_token: message_list.next_page_token,
        })
    }

    async fn get_message(&self, id: &str) -> Result<models::Message> {
        let (_, msg) = self
            .hub
            .users()
            .messages_get(USER_ID, id)
            .format("full")
            .add_scope(&self.scope)
            .doit()
            .await
            .map_err(|e| Error::remote("get message", e))?;

        Ok(models::Message {
            id: msg.id.unwrap_or_else(|| id.to_string()),
            label_ids: msg.label_ids.unwrap_or_default(),
            payload: msg.payload.map(convert_part),
        })
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String> {
        let (_, body) = self
            .hub
            .users()
            .messages_attachments_get(USER_ID, message_id, attachment_id)
            .add_scope(&self.scope)
            .doit()
            .await
            .map_err(|e| Error::remote("get attachment", e))?;

        body.data
            .map(|data| encode_data(&data))
            .ok_or_else(|| Error::decode(format!("attachment {attachment_id} returned no data")))
    }

    async fn modify_message(&self, id: &str, change: models::LabelChange) -> Result<()> {
        debug!(id, add = ?change.add, remove = ?change.remove, "Modifying labels");
        let req = ModifyMessageRequest {
            add_label_ids: (!change.add.is_empty()).then_some(change.add),
            remove_label_ids: (!change.remove.is_empty()).then_some(change.remove),
        };
        self.hub
            .users()
            .messages_modify(req, USER_ID, id)
            .add_scope(&self.scope)
            .doit()
            .await
            .map_err(|e| Error::remote("modify message", e))?;
        Ok(())
    }

    async fn list_labels(&self) -> Result<Vec<models::Label>> {
        let (_, label_list) = self
            .hub
            .users()
            .labels_list(USER_ID)
            .add_scope(&self.scope)
            .doit()
            .await
            .map_err(|e| Error::remote("list labels", e))?;

        let labels = label_list
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| models::Label {
                id: l.id.unwrap_or_default(),
                name: l.name.unwrap_or_default(),
            })
            .collect();

        Ok(labels)
    }
}

// The SDK already base64-decodes body data while deserializing. Re-encode it so
// the processor always sees the wire form, whichever Mailbox it talks to.
fn convert_part(part: MessagePart) -> models::MessagePart {
    models::MessagePart {
        mime_type: part.mime_type,
        filename: part.filename,
        headers: part
            .headers
            .unwrap_or_default()
            .into_iter()
            .map(|h| models::Header {
                name: h.name.unwrap_or_default(),
                value: h.value.unwrap_or_default(),
            })
            .collect(),
        body: part.body.map(convert_body),
        parts: part
            .parts
            .map(|parts| parts.into_iter().map(convert_part).collect()),
    }
}

fn convert_body(body: MessagePartBody) -> models::PartBody {
    models::PartBody {
        data: body.data.map(|data| encode_data(&data)),
        attachment_id: body.attachment_id,
    }
}
