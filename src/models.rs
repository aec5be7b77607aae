//! Provider-neutral shapes of what the mailbox hands back.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// One page of a message listing.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Message {
    pub id: String,
    pub label_ids: Vec<String>,
    pub payload: Option<MessagePart>,
}

impl Message {
    /// Value of the first `Subject` header on the top-level payload, or empty.
    pub fn subject(&self) -> &str {
        self.payload
            .as_ref()
            .and_then(|p| {
                p.headers
                    .iter()
                    .find(|h| h.name == "Subject")
                    .map(|h| h.value.as_str())
            })
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct MessagePart {
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub headers: Vec<Header>,
    pub body: Option<PartBody>,
    /// `None` for leaf parts.
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Default)]
pub struct PartBody {
    /// URL-safe base64 text exactly as the provider transmits it.
    pub data: Option<String>,
    pub attachment_id: Option<String>,
}

/// Labels to add and remove in a single modify call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelChange {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

/// An attachment materialized for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

const WIRE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes body data in the provider's URL-safe base64, padded or not.
pub fn decode_data(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    WIRE_BASE64.decode(text.trim())
}

pub fn encode_data(bytes: &[u8]) -> String {
    WIRE_BASE64.encode(bytes)
}
