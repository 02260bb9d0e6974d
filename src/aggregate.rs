//! Grouping of parsed messages into per-call timelines.
//!
//! Calls are keyed by the trimmed, lower-cased call identifier. Lower-casing means two
//! identifiers from different dialects that differ only by case land in the same call;
//! that merge is current behavior and is pinned by tests. Messages with no identifier go
//! to the [`GLOBAL_EVENTS_KEY`] bucket.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::model::{Codec, LocationRecord, ParsedMessage, Party, SmsChannel, SmsEntry, TypedPayload};
use crate::parsers::location::location_from_pani;
use crate::parsers::sdp::has_video;
use crate::sip::SipMessage;
use crate::standards::MessageKind;
use crate::timestamp::{millis_between, parse_timestamp, round_seconds};

pub const GLOBAL_EVENTS_KEY: &str = "__global__";

static APPLE_UA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAPPLE---(.+?)---([^\s;]+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallStatus {
    Initiated,
    Answered,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallType {
    Voice,
    Video,
    #[serde(rename = "SMS/MMS")]
    SmsMms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub os_version: Option<String>,
    pub user_agent: String,
}

impl DeviceInfo {
    pub fn from_user_agent(ua: &str) -> Option<Self> {
        let ua = ua.trim();
        if ua.is_empty() {
            return None;
        }
        let mut info = DeviceInfo {
            vendor: None,
            model: None,
            os_version: None,
            user_agent: ua.to_string(),
        };
        if let Some(caps) = APPLE_UA_RE.captures(ua) {
            info.vendor = Some("Apple".to_string());
            info.model = Some(caps[1].to_string());
            info.os_version = Some(caps[2].to_string());
        }
        Some(info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub key: String,
    /// Identifier as first seen, before normalization.
    pub call_id: Option<String>,
    pub case_id: Option<String>,
    pub calling: Option<Party>,
    pub called: Option<Party>,
    pub caller_name: Option<String>,
    pub call_direction: Option<CallDirection>,
    pub start_time: Option<String>,
    pub answer_time: Option<String>,
    pub end_time: Option<String>,
    /// Seconds from answer to end.
    pub duration: Option<i64>,
    pub call_type: Option<CallType>,
    pub call_status: Option<CallStatus>,
    pub release_cause: Option<String>,
    pub verification_status: Option<String>,
    pub device: Option<DeviceInfo>,
    pub codecs: Vec<Codec>,
    pub locations: Vec<LocationRecord>,
    pub sip_messages: Vec<SipMessage>,
    pub sms: Vec<SmsEntry>,
    pub messages: Vec<ParsedMessage>,
}

impl Call {
    fn new(key: String, call_id: Option<String>) -> Self {
        Self {
            key,
            call_id,
            case_id: None,
            calling: None,
            called: None,
            caller_name: None,
            call_direction: None,
            start_time: None,
            answer_time: None,
            end_time: None,
            duration: None,
            call_type: None,
            call_status: None,
            release_cause: None,
            verification_status: None,
            device: None,
            codecs: Vec::new(),
            locations: Vec::new(),
            sip_messages: Vec::new(),
            sms: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.key == GLOBAL_EVENTS_KEY
    }

    /// SIP log without the messages that were re-read as SMS.
    pub fn signaling_log(&self) -> impl Iterator<Item = &SipMessage> {
        self.sip_messages.iter().filter(|m| !m.sms_over_sip)
    }

    pub fn calling_number(&self) -> Option<&str> {
        self.calling.as_ref()?.phone_number.as_deref()
    }

    pub fn called_number(&self) -> Option<&str> {
        self.called.as_ref()?.phone_number.as_deref()
    }

    fn add_location(&mut self, loc: LocationRecord) {
        let key = loc.dedup_key();
        if !self.locations.iter().any(|l| l.dedup_key() == key) {
            self.locations.push(loc);
        }
    }

    fn add_locations(&mut self, locs: &[LocationRecord]) {
        for loc in locs {
            self.add_location(loc.clone());
        }
    }

    fn merge_codecs(&mut self, codecs: &[Codec]) {
        for c in codecs {
            if !self.codecs.contains(c) {
                self.codecs.push(c.clone());
            }
        }
    }

    fn absorb(&mut self, msg: &ParsedMessage) {
        self.messages.push(msg.clone());
        if self.case_id.is_none() {
            self.case_id = msg.case_id.clone();
        }

        let Some(payload) = &msg.payload else { return };
        let ts = msg.timestamp.as_deref();

        match payload {
            TypedPayload::Attempt {
                calling,
                called,
                sdp,
                codecs,
                locations,
            } => {
                self.call_direction = Some(match msg.kind {
                    Some(MessageKind::OrigAttempt) => CallDirection::Outgoing,
                    _ => CallDirection::Incoming,
                });
                if let Some(ts) = ts {
                    self.start_time = Some(ts.to_string());
                }
                if let Some(party) = calling {
                    if let Some(name) = &party.caller_name {
                        self.caller_name = Some(name.clone());
                    }
                    self.calling = Some(party.clone());
                }
                if let Some(party) = called {
                    self.called = Some(party.clone());
                }
                if !codecs.is_empty() {
                    self.codecs = codecs.clone();
                }
                self.call_type = Some(if sdp.as_deref().is_some_and(has_video) {
                    CallType::Video
                } else {
                    CallType::Voice
                });
                self.add_locations(locations);
            }
            TypedPayload::SignalReport { sip_messages, sms, .. } => {
                for sip in sip_messages {
                    self.absorb_sip(sip, ts);
                }
                for entry in sms {
                    self.sms.push(entry.clone());
                    self.call_type = Some(CallType::SmsMms);
                }
            }
            TypedPayload::ContentChannel { codecs, .. } => self.merge_codecs(codecs),
            TypedPayload::Answer { locations, .. } => {
                if let Some(ts) = ts {
                    self.answer_time = Some(ts.to_string());
                }
                self.call_status = Some(CallStatus::Answered);
                self.add_locations(locations);
            }
            TypedPayload::Release { cause, locations } => {
                if let Some(ts) = ts {
                    self.end_time = Some(ts.to_string());
                }
                if cause.is_some() {
                    self.release_cause = cause.clone();
                }
                self.add_locations(locations);
            }
            TypedPayload::Sms {
                from,
                to,
                content,
                direction,
            } => {
                self.call_type = Some(CallType::SmsMms);
                self.sms.push(SmsEntry {
                    from: from.clone(),
                    to: to.clone(),
                    content: content.clone(),
                    direction: *direction,
                    timestamp: ts.map(str::to_string),
                    channel: match msg.kind {
                        Some(MessageKind::MmsMessage) => SmsChannel::Mms,
                        _ => SmsChannel::Sms,
                    },
                });
            }
        }
    }

    fn absorb_sip(&mut self, sip: &SipMessage, ts: Option<&str>) {
        if self.caller_name.is_none() {
            self.caller_name = sip.display_name();
        }
        if self.device.is_none() {
            self.device = sip.headers.first("User-Agent").and_then(DeviceInfo::from_user_agent);
        }
        if let Some(pani) = sip.headers.get("P-Access-Network-Info") {
            for value in pani.values() {
                if let Some(loc) = location_from_pani(value, ts) {
                    self.add_location(loc);
                }
            }
        }
        if let Some(verstat) = sip.verstat() {
            self.verification_status = Some(verstat);
        }
        self.sip_messages.push(sip.clone());
    }

    fn finalize(&mut self) {
        if let (Some(answer), Some(end)) = (&self.answer_time, &self.end_time) {
            self.duration = millis_between(answer, end).map(round_seconds);
        }

        self.messages
            .sort_by_key(|m| m.timestamp.as_deref().and_then(parse_timestamp));

        if self.call_status.is_none() {
            if self.end_time.is_some() {
                self.call_status = Some(CallStatus::Ended);
            } else if self.start_time.is_some() {
                self.call_status = Some(CallStatus::Initiated);
            }
        }
    }

    /// Weight used to pick the call a viewer should open first.
    pub fn preference_score(&self) -> u32 {
        let mut score = 0;
        if self.start_time.is_some() {
            score += 3;
        }
        if self.calling_number().is_some() {
            score += 4;
        }
        if self.caller_name.is_some() {
            score += 1;
        }
        if self.call_status == Some(CallStatus::Answered) {
            score += 1;
        }
        if self.answer_time.is_some() {
            score += 2;
        }
        if self.end_time.is_some() {
            score += 1;
        }
        score
    }
}

/// Trimmed, lower-cased call id, or the global bucket key.
pub fn call_key(call_id: Option<&str>) -> String {
    match call_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_lowercase(),
        None => GLOBAL_EVENTS_KEY.to_string(),
    }
}

/// Calls in first-reference order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMap {
    calls: Vec<Call>,
    index: HashMap<String, usize>,
}

impl CallMap {
    pub fn get(&self, key: &str) -> Option<&Call> {
        self.index.get(key).map(|&i| &self.calls[i])
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().map(|c| c.key.as_str())
    }

    /// Calls that carried an identifier, i.e. everything but the global bucket.
    pub fn identified(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter().filter(|c| !c.is_global())
    }

    fn entry(&mut self, key: String, call_id: Option<&str>) -> &mut Call {
        let idx = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.calls.len();
                let original = call_id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
                self.calls.push(Call::new(key.clone(), original));
                self.index.insert(key, i);
                i
            }
        };
        &mut self.calls[idx]
    }
}

impl Serialize for CallMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.calls.len()))?;
        for call in &self.calls {
            map.serialize_entry(&call.key, call)?;
        }
        map.end()
    }
}

/// Build the finalized call map from the full message stream.
pub fn aggregate(messages: &[ParsedMessage]) -> CallMap {
    let mut map = CallMap::default();
    for msg in messages {
        let key = call_key(msg.call_id.as_deref());
        map.entry(key, msg.call_id.as_deref()).absorb(msg);
    }
    for call in &mut map.calls {
        call.finalize();
    }
    map
}

/// Highest `preference_score`; ties go to the call referenced first.
pub fn preferred_call(calls: &CallMap) -> Option<&Call> {
    let mut best: Option<(&Call, u32)> = None;
    for call in calls.iter() {
        let score = call.preference_score();
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((call, score));
        }
    }
    best.map(|(c, _)| c)
}
