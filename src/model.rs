use serde::Serialize;

use crate::block::MessageBlock;
use crate::cell::CellIdentifier;
use crate::sip::SipMessage;
use crate::standards::MessageKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub uri: Option<String>,
    pub phone_number: Option<String>,
    pub caller_name: Option<String>,
    pub headers: Vec<String>,
}

impl Party {
    pub fn is_empty(&self) -> bool {
        self.uri.is_none() && self.phone_number.is_none() && self.caller_name.is_none() && self.headers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Codec {
    pub payload_type: u16,
    pub encoding: String,
    pub clock_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub source_type: String,
    pub raw_data: String,
    pub timestamp: Option<String>,
    pub cell: Option<CellIdentifier>,
}

impl LocationRecord {
    /// Identity used to drop repeats within a call: the raw cell id when one was
    /// decoded, otherwise the whole record text.
    pub fn dedup_key(&self) -> String {
        match &self.cell {
            Some(cell) => format!("cell:{}", cell.raw.to_ascii_lowercase()),
            None => format!("raw:{}|{}", self.source_type, self.raw_data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SmsDirection {
    Sent,
    Received,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SmsChannel {
    Sms,
    Mms,
    SipMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsEntry {
    pub from: Option<String>,
    pub to: Option<String>,
    pub content: Option<String>,
    pub direction: SmsDirection,
    pub timestamp: Option<String>,
    pub channel: SmsChannel,
}

/// One variant per message kind; `Attempt` covers term and orig, `SignalReport` covers
/// direct signal reporting and subject signal, `ContentChannel` covers CC open and close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "variant", rename_all = "camelCase")]
pub enum TypedPayload {
    #[serde(rename_all = "camelCase")]
    Attempt {
        calling: Option<Party>,
        called: Option<Party>,
        sdp: Option<String>,
        codecs: Vec<Codec>,
        locations: Vec<LocationRecord>,
    },
    #[serde(rename_all = "camelCase")]
    SignalReport {
        sip_messages: Vec<SipMessage>,
        correlation_id: Option<String>,
        /// SMS events synthesized from SIP messages that turned out to carry SMS.
        sms: Vec<SmsEntry>,
    },
    #[serde(rename_all = "camelCase")]
    ContentChannel {
        sdp: Option<String>,
        codecs: Vec<Codec>,
    },
    #[serde(rename_all = "camelCase")]
    Answer {
        answering_party: Option<Party>,
        locations: Vec<LocationRecord>,
    },
    #[serde(rename_all = "camelCase")]
    Release {
        cause: Option<String>,
        locations: Vec<LocationRecord>,
    },
    #[serde(rename_all = "camelCase")]
    Sms {
        from: Option<String>,
        to: Option<String>,
        content: Option<String>,
        direction: SmsDirection,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    #[serde(rename = "type")]
    pub kind: Option<MessageKind>,
    pub timestamp: Option<String>,
    pub case_id: Option<String>,
    pub call_id: Option<String>,
    pub payload: Option<TypedPayload>,
    pub block: MessageBlock,
}
