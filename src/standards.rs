//! Message-kind keyword registry and field-alias table.
//!
//! Both tables are plain data: the built-in defaults cover the common T1.678 / 3GPP
//! dialect, and carrier variants are layered on top from TOML files (or a bincode
//! snapshot of an already merged table) without touching any parsing code.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literals that always open a block and classify as SMS/MMS, whatever the registry says.
pub const SMS_LITERAL: &str = "smsmessage";
pub const MMS_LITERAL: &str = "mmsmessage";

#[derive(Debug, Error)]
pub enum StandardsError {
    #[error("failed to read standards file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid standards table: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid compiled standards snapshot: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("message kind '{0}' declares an empty keyword")]
    EmptyKeyword(MessageKind),
    #[error("message kind '{0}' declares no keywords")]
    NoKeywords(MessageKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    TermAttempt,
    OrigAttempt,
    DirectSignalReporting,
    SubjectSignal,
    CcOpen,
    CcClose,
    Answer,
    Release,
    SmsMessage,
    MmsMessage,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::TermAttempt => "termAttempt",
            MessageKind::OrigAttempt => "origAttempt",
            MessageKind::DirectSignalReporting => "directSignalReporting",
            MessageKind::SubjectSignal => "subjectSignal",
            MessageKind::CcOpen => "ccOpen",
            MessageKind::CcClose => "ccClose",
            MessageKind::Answer => "answer",
            MessageKind::Release => "release",
            MessageKind::SmsMessage => "smsMessage",
            MessageKind::MmsMessage => "mmsMessage",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDescriptor {
    pub id: MessageKind,
    pub keywords: Vec<String>,
}

/// Logical field name -> ordered alias spellings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldAliases(HashMap<String, Vec<String>>);

impl FieldAliases {
    /// Aliases for `logical`, or the logical name itself when the table has no entry.
    pub fn resolve<'a>(&'a self, logical: &'a str) -> Vec<&'a str> {
        match self.0.get(logical) {
            Some(list) if !list.is_empty() => list.iter().map(String::as_str).collect(),
            _ => vec![logical],
        }
    }

    pub fn insert(&mut self, logical: impl Into<String>, aliases: Vec<String>) {
        self.0.insert(logical.into(), aliases);
    }

    fn extend_from(&mut self, other: FieldAliases) {
        for (name, aliases) in other.0 {
            let entry = self.0.entry(name).or_default();
            for alias in aliases {
                if !entry.contains(&alias) {
                    entry.push(alias);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standards {
    #[serde(default)]
    pub kinds: Vec<KindDescriptor>,
    #[serde(default)]
    pub aliases: FieldAliases,
}

const DEFAULT_KINDS: &[(MessageKind, &[&str])] = &[
    (MessageKind::TermAttempt, &["termattempt", "terminationattempt"]),
    (MessageKind::OrigAttempt, &["origattempt", "originationattempt"]),
    (MessageKind::DirectSignalReporting, &["directsignalreporting"]),
    (MessageKind::SubjectSignal, &["subjectsignal"]),
    (MessageKind::CcOpen, &["ccopen"]),
    (MessageKind::CcClose, &["ccclose"]),
    (MessageKind::Release, &["release"]),
    (MessageKind::Answer, &["answer"]),
];

const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    ("callId", &["callId", "callID", "call-ID", "call_id", "callIdentifier"]),
    ("caseId", &["caseId", "caseID", "case-ID", "case_id", "liid"]),
    ("timestamp", &["timestamp", "timeStamp", "eventTime", "time"]),
    ("correlationID", &["correlationID", "correlationId", "correlation-ID"]),
    ("signalingMsg", &["sigMsg", "signalingMsg"]),
    ("smsContent", &["userInput", "smsMessage"]),
    ("originator", &["originator", "sender"]),
    ("recipient", &["recipient", "recipients", "destination"]),
];

impl Default for Standards {
    fn default() -> Self {
        let kinds = DEFAULT_KINDS
            .iter()
            .map(|(id, kws)| KindDescriptor {
                id: *id,
                keywords: kws.iter().map(|k| k.to_string()).collect(),
            })
            .collect();

        let mut aliases = FieldAliases::default();
        for (name, list) in DEFAULT_ALIASES {
            aliases.insert(*name, list.iter().map(|a| a.to_string()).collect());
        }

        Self { kinds, aliases }
    }
}

impl Standards {
    /// An empty table: no registry keywords, every field looked up by its own name.
    pub fn empty() -> Self {
        Self {
            kinds: Vec::new(),
            aliases: FieldAliases::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, StandardsError> {
        let mut parsed: Standards = toml::from_str(text)?;
        parsed.normalize()?;
        Ok(parsed)
    }

    pub fn load(path: &Path) -> Result<Self, StandardsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn load_compiled(path: &Path) -> Result<Self, StandardsError> {
        let file = File::open(path)?;
        let mut decoded: Standards = bincode::deserialize_from(BufReader::new(file))?;
        decoded.normalize()?;
        Ok(decoded)
    }

    pub fn compile_to(&self, path: &Path) -> Result<(), StandardsError> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Layer `other` on top of `self`: known kinds gain keywords, new kinds are appended
    /// after the existing ones, alias lists grow.
    pub fn merge(&mut self, other: Standards) {
        for desc in other.kinds {
            match self.kinds.iter_mut().find(|d| d.id == desc.id) {
                Some(existing) => {
                    for kw in desc.keywords {
                        if !existing.keywords.contains(&kw) {
                            existing.keywords.push(kw);
                        }
                    }
                }
                None => self.kinds.push(desc),
            }
        }
        self.aliases.extend_from(other.aliases);
    }

    pub fn block_keywords(&self) -> Vec<&str> {
        block_keywords(&self.kinds)
    }

    fn normalize(&mut self) -> Result<(), StandardsError> {
        for desc in &mut self.kinds {
            if desc.keywords.is_empty() {
                return Err(StandardsError::NoKeywords(desc.id));
            }
            for kw in &mut desc.keywords {
                let lowered = kw.trim().to_ascii_lowercase();
                if lowered.is_empty() {
                    return Err(StandardsError::EmptyKeyword(desc.id));
                }
                *kw = lowered;
            }
        }
        Ok(())
    }
}

/// Every keyword that opens a new block: registry entries plus the SMS/MMS literals.
pub fn block_keywords(kinds: &[KindDescriptor]) -> Vec<&str> {
    let mut out: Vec<&str> = kinds
        .iter()
        .flat_map(|d| d.keywords.iter().map(String::as_str))
        .collect();
    out.push(SMS_LITERAL);
    out.push(MMS_LITERAL);
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let table = Standards::default();
        assert_eq!(table.kinds[0].id, MessageKind::TermAttempt);
        let pos = |kind: MessageKind| table.kinds.iter().position(|d| d.id == kind);
        assert!(pos(MessageKind::Release) < pos(MessageKind::Answer));
    }

    #[test]
    fn test_alias_fallback_to_logical_name() {
        let table = Standards::default();
        assert_eq!(table.aliases.resolve("callId")[2], "call-ID");
        assert_eq!(table.aliases.resolve("nonexistent"), vec!["nonexistent"]);
    }

    #[test]
    fn test_toml_lowercases_keywords() {
        let text = r#"
            [[kinds]]
            id = "termAttempt"
            keywords = ["TermAttemptV2"]

            [aliases]
            callId = ["cid"]
        "#;
        let parsed = Standards::from_toml_str(text).unwrap();
        assert_eq!(parsed.kinds[0].keywords, vec!["termattemptv2"]);
        assert_eq!(parsed.aliases.resolve("callId"), vec!["cid"]);
    }

    #[test]
    fn test_toml_rejects_empty_keyword() {
        let text = r#"
            [[kinds]]
            id = "answer"
            keywords = ["  "]
        "#;
        assert!(matches!(
            Standards::from_toml_str(text),
            Err(StandardsError::EmptyKeyword(MessageKind::Answer))
        ));
    }

    #[test]
    fn test_toml_rejects_unknown_kind() {
        let text = r#"
            [[kinds]]
            id = "teleport"
            keywords = ["beam"]
        "#;
        assert!(matches!(Standards::from_toml_str(text), Err(StandardsError::Toml(_))));
    }

    #[test]
    fn test_merge_extends_and_appends() {
        let mut base = Standards::default();
        let overlay = Standards::from_toml_str(
            r#"
            [[kinds]]
            id = "answer"
            keywords = ["answer", "callanswered"]

            [aliases]
            callId = ["callId", "cin"]
            "#,
        )
        .unwrap();
        base.merge(overlay);

        let answer = base.kinds.iter().find(|d| d.id == MessageKind::Answer).unwrap();
        assert_eq!(answer.keywords, vec!["answer", "callanswered"]);
        let call_aliases = base.aliases.resolve("callId");
        assert_eq!(call_aliases.last(), Some(&"cin"));
        assert_eq!(call_aliases.iter().filter(|a| **a == "callId").count(), 1);
    }

    #[test]
    fn test_block_keywords_include_sms_literals() {
        let standards = Standards::empty();
        let kws = standards.block_keywords();
        assert_eq!(kws, vec![MMS_LITERAL, SMS_LITERAL]);
    }

    #[test]
    fn test_compiled_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standards.bin");
        let table = Standards::default();
        table.compile_to(&path).unwrap();
        assert_eq!(Standards::load_compiled(&path).unwrap(), table);
    }
}
