//! The slice of SIP needed to classify intercepted signaling: start line, headers
//! (repeats coalesced), body, plus SMS-over-SIP detection.

use std::sync::LazyLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::model::{SmsChannel, SmsDirection, SmsEntry};
use crate::parsers::party::phone_from_text;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_.!%*+`'~-]*)\s*:\s*(.*)$").unwrap());
static DISPLAY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static VERSTAT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)verstat=([^;>,\s]+)").unwrap());

const COMPACT_FORMS: &[(&str, &str)] = &[
    ("call-id", "i"),
    ("from", "f"),
    ("to", "t"),
    ("content-type", "c"),
    ("contact", "m"),
    ("via", "v"),
    ("accept-contact", "a"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::Multi(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Single(v) => vec![v.as_str()],
            HeaderValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = HeaderValue::Multi(vec![first, value]);
            }
            HeaderValue::Multi(vs) => vs.push(value),
        }
    }
}

/// Header map in first-seen order. Names compare case-insensitively; the first spelling
/// seen is the one kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SipHeaders(Vec<(String, HeaderValue)>);

impl SipHeaders {
    pub fn append(&mut self, name: &str, value: String) {
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => existing.push(value),
            None => self.0.push((name.to_string(), HeaderValue::Single(value))),
        }
    }

    /// Lookup by full name, falling back to the RFC 3261 compact form.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let direct = self.0.iter().find(|(n, _)| n.eq_ignore_ascii_case(name));
        if direct.is_some() {
            return direct.map(|(_, v)| v);
        }
        let compact = COMPACT_FORMS
            .iter()
            .find(|(full, _)| full.eq_ignore_ascii_case(name))
            .map(|(_, short)| *short)?;
        self.0.iter().find(|(n, _)| n.eq_ignore_ascii_case(compact)).map(|(_, v)| v)
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderValue::first)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SipHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SipMessage {
    pub is_request: bool,
    pub is_response: bool,
    pub method: Option<String>,
    pub status_code: Option<u16>,
    pub status_text: Option<String>,
    pub headers: SipHeaders,
    pub body: Option<String>,
    /// Set when the message was recognized as an SMS carried over SIP.
    pub sms_over_sip: bool,
}

impl SipMessage {
    /// Parse a signaling body. The first non-empty line decides request vs response;
    /// `Name: Value` lines up to the first blank line are headers, the rest is body.
    /// `None` only for an all-blank input.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines().map(str::trim).skip_while(|l| l.is_empty());
        let start = lines.next()?;

        let mut msg = SipMessage {
            is_request: false,
            is_response: false,
            method: None,
            status_code: None,
            status_text: None,
            headers: SipHeaders::default(),
            body: None,
            sms_over_sip: false,
        };

        if let Some(rest) = start.strip_prefix("SIP/2.0") {
            msg.is_response = true;
            let rest = rest.trim();
            let (code, reason) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            msg.status_code = code.parse().ok();
            let reason = reason.trim();
            if !reason.is_empty() {
                msg.status_text = Some(reason.to_string());
            }
        } else {
            msg.is_request = true;
            msg.method = start.split_whitespace().next().map(str::to_string);
        }

        let mut body: Vec<&str> = Vec::new();
        let mut in_body = false;
        for line in lines {
            if in_body {
                body.push(line);
                continue;
            }
            if line.is_empty() {
                in_body = true;
                continue;
            }
            if let Some(caps) = HEADER_RE.captures(line) {
                msg.headers.append(&caps[1], caps[2].trim().to_string());
            }
        }

        let body = body.join("\n");
        let body = body.trim();
        if !body.is_empty() {
            msg.body = Some(body.to_string());
        }
        Some(msg)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.headers.first("Call-ID").filter(|v| !v.is_empty())
    }

    /// Quoted display name from P-Asserted-Identity, then From.
    pub fn display_name(&self) -> Option<String> {
        ["P-Asserted-Identity", "From"].iter().find_map(|h| {
            let value = self.headers.first(h)?;
            DISPLAY_NAME_RE.captures(value).map(|c| c[1].trim().to_string())
        })
    }

    /// `verstat=` token, preferring headers whose name mentions reputation or verification.
    pub fn verstat(&self) -> Option<String> {
        let preferred = self.headers.iter().filter(|(n, _)| {
            let n = n.to_ascii_lowercase();
            n.contains("reputation") || n.contains("verstat") || n.contains("verification")
        });
        let find = |(_, v): (&str, &HeaderValue)| {
            v.values()
                .into_iter()
                .find_map(|val| VERSTAT_RE.captures(val).map(|c| c[1].to_string()))
        };
        preferred
            .filter_map(find)
            .next()
            .or_else(|| self.headers.iter().filter_map(find).next())
    }

    /// Whether this message carries an SMS. `block_lower` is the enclosing record,
    /// lower-cased, for the GSM SMS markers.
    pub fn is_sms_over_sip(&self, block_lower: &str) -> bool {
        if self.method.as_deref().is_some_and(|m| m.eq_ignore_ascii_case("MESSAGE")) {
            return true;
        }
        if self
            .headers
            .first("Content-Type")
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("3gpp.sms"))
        {
            return true;
        }
        if self
            .headers
            .get("Accept-Contact")
            .is_some_and(|v| v.values().iter().any(|a| a.to_ascii_lowercase().contains("smsip")))
        {
            return true;
        }
        block_lower.contains("gsm sms") || block_lower.contains("sms-deliver")
    }

    /// Build the SMS event for a message recognized as SMS-over-SIP. The terminating leg
    /// carries `P-Called-Party-ID`, so its presence marks the SMS as received.
    pub fn to_sms_entry(&self, timestamp: Option<String>, block_lower: &str) -> SmsEntry {
        let phone_of = |names: &[&str]| {
            names
                .iter()
                .find_map(|h| self.headers.first(h).and_then(phone_from_text))
        };
        let direction = if self.headers.contains("P-Called-Party-ID") {
            SmsDirection::Received
        } else if self.headers.contains("P-Asserted-Identity") || block_lower.contains("originating") {
            SmsDirection::Sent
        } else {
            SmsDirection::Received
        };

        SmsEntry {
            from: phone_of(&["From", "P-Asserted-Identity"]),
            to: phone_of(&["To", "P-Called-Party-ID"]),
            content: self.body.clone(),
            direction,
            timestamp,
            channel: SmsChannel::SipMessage,
        }
    }
}
