//! Segmentation of a raw intercept log into message blocks, and the line tokenizer the
//! field extractor and type parsers walk over.

use serde::Serialize;
use tracing::debug;

use crate::standards::{block_keywords, KindDescriptor};

/// One message record as it appeared in the source. Immutable once segmented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBlock {
    /// Position of the block in the log, starting at 0.
    pub index: usize,
    /// 1-based line number of the block's first line.
    pub start_line: usize,
    pub text: String,
}

impl MessageBlock {
    pub fn lines(&self) -> Vec<Line<'_>> {
        tokenize(&self.text, self.start_line)
    }
}

/// A tokenized source line: either `key = value`, a bare `label` (section marker), or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
    pub key: Option<&'a str>,
    pub value: Option<&'a str>,
    pub label: Option<&'a str>,
}

impl<'a> Line<'a> {
    fn parse(number: usize, raw: &'a str) -> Self {
        let text = raw.trim();
        let mut line = Line {
            number,
            text,
            key: None,
            value: None,
            label: None,
        };
        if text.is_empty() {
            return line;
        }
        if let Some((k, v)) = text.split_once('=') {
            let k = k.trim();
            if is_field_key(k) {
                line.key = Some(k);
                line.value = Some(v.trim());
                return line;
            }
        }
        line.label = Some(text);
        line
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    /// Key or label with a trailing `[n]` index removed.
    pub fn name(&self) -> Option<&'a str> {
        let head = self.key.or(self.label)?;
        Some(strip_index(head))
    }

    /// Case-insensitive match of `name()` against `marker`. A dotted key such as
    /// `callId.main` matches on its first segment.
    pub fn is_named(&self, marker: &str) -> bool {
        match self.name() {
            Some(name) => {
                name.eq_ignore_ascii_case(marker)
                    || name
                        .split_once('.')
                        .is_some_and(|(head, _)| head.eq_ignore_ascii_case(marker))
            }
            None => false,
        }
    }

    pub fn key_is(&self, alias: &str) -> bool {
        self.key.is_some_and(|k| k.eq_ignore_ascii_case(alias))
    }

    /// `location[3]` -> `Some(3)`.
    pub fn index(&self) -> Option<usize> {
        let head = self.key.or(self.label)?;
        let open = head.rfind('[')?;
        head[open + 1..].strip_suffix(']')?.parse().ok()
    }
}

fn is_field_key(k: &str) -> bool {
    !k.is_empty()
        && k.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'[' | b']'))
}

fn strip_index(head: &str) -> &str {
    match head.rfind('[') {
        Some(open) if head.ends_with(']') => head[..open].trim_end(),
        _ => head,
    }
}

pub fn tokenize(text: &str, first_line: usize) -> Vec<Line<'_>> {
    text.lines()
        .enumerate()
        .map(|(i, raw)| Line::parse(first_line + i, raw))
        .collect()
}

/// Lines from the one named `marker` up to (not including) the first later line named by
/// any of `terminators`, or the end of the block. The marker line itself is included.
pub fn section<'s, 'a>(lines: &'s [Line<'a>], marker: &str, terminators: &[&str]) -> Option<&'s [Line<'a>]> {
    let start = lines.iter().position(|l| l.is_named(marker))?;
    let end = lines[start + 1..]
        .iter()
        .position(|l| terminators.iter().any(|t| l.is_named(t)))
        .map(|off| start + 1 + off)
        .unwrap_or(lines.len());
    Some(&lines[start..end])
}

/// Original text of a run of lines, joined with newlines.
pub fn join_text(lines: &[Line<'_>]) -> String {
    let mut out = String::new();
    for (i, l) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(l.text);
    }
    out
}

/// Splits raw log text into blocks at lines that exactly match a registered keyword.
pub struct Segmenter {
    keywords: Vec<String>,
}

impl Segmenter {
    pub fn new(kinds: &[KindDescriptor]) -> Self {
        Self {
            keywords: block_keywords(kinds).into_iter().map(str::to_string).collect(),
        }
    }

    fn opens_block(&self, line: &str) -> bool {
        let lowered = line.trim().to_ascii_lowercase();
        !lowered.is_empty() && self.keywords.iter().any(|k| *k == lowered)
    }

    pub fn segment(&self, raw: &str) -> Vec<MessageBlock> {
        let mut blocks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_start = 1usize;

        for (i, line) in raw.lines().enumerate() {
            if self.opens_block(line) {
                self.flush(&mut blocks, &mut current, current_start);
                current_start = i + 1;
            }
            current.push(line);
        }
        self.flush(&mut blocks, &mut current, current_start);

        debug!(blocks = blocks.len(), "segmented intercept log");
        blocks
    }

    fn flush(&self, blocks: &mut Vec<MessageBlock>, current: &mut Vec<&str>, start_line: usize) {
        if current.iter().all(|l| l.trim().is_empty()) {
            current.clear();
            return;
        }
        blocks.push(MessageBlock {
            index: blocks.len(),
            start_line,
            text: current.join("\n"),
        });
        current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standards::Standards;

    const LOG: &str = "\
preamble line
termAttempt
  caseId = CASE-1
  callId
    main = ABC
DirectSignalReporting
  sigMsg = INVITE sip:x SIP/2.0

smsMessage
  smsMessage = hi there
";

    #[test]
    fn test_segment_splits_on_exact_keywords() {
        let seg = Segmenter::new(&Standards::default().kinds);
        let blocks = seg.segment(LOG);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].text, "preamble line");
        assert!(blocks[1].text.starts_with("termAttempt"));
        assert_eq!(blocks[1].start_line, 2);
        assert!(blocks[2].text.starts_with("DirectSignalReporting"));
        assert!(blocks[3].text.contains("hi there"));
        assert_eq!(blocks.iter().map(|b| b.index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_field_line_with_keyword_does_not_split() {
        let seg = Segmenter::new(&Standards::default().kinds);
        let blocks = seg.segment("smsMessage\n  smsMessage = answer\n  note = release\n");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_segment_empty_input() {
        let seg = Segmenter::new(&Standards::default().kinds);
        assert!(seg.segment("").is_empty());
        assert!(seg.segment("\n\n  \n").is_empty());
    }

    #[test]
    fn test_registry_is_swappable() {
        let custom = Standards::from_toml_str(
            r#"
            [[kinds]]
            id = "answer"
            keywords = ["connected"]
            "#,
        )
        .unwrap();
        let seg = Segmenter::new(&custom.kinds);
        assert_eq!(seg.segment("CONNECTED\n a = 1\nconnected\n b = 2").len(), 2);
        assert_eq!(Segmenter::new(&Standards::empty().kinds).segment("CONNECTED\nconnected").len(), 1);
    }

    #[test]
    fn test_line_tokens() {
        let lines = tokenize("  uri[0] = sip:+1@x\n  calling\n  Via: SIP/2.0/UDP h;branch=z9\n\n", 10);
        assert_eq!(lines[0].key, Some("uri[0]"));
        assert_eq!(lines[0].name(), Some("uri"));
        assert_eq!(lines[0].index(), Some(0));
        assert_eq!(lines[0].value, Some("sip:+1@x"));
        assert_eq!(lines[1].label, Some("calling"));
        assert_eq!(lines[2].key, None);
        assert!(lines[3].is_blank());
        assert_eq!(lines[3].number, 13);
    }

    #[test]
    fn test_section_bounds() {
        let lines = tokenize("calling\n uri[0] = a\ncalled\n uri[0] = b\nlocation[0]\n x = 1", 1);
        let calling = section(&lines, "calling", &["called"]).unwrap();
        assert_eq!(calling.len(), 2);
        let called = section(&lines, "called", &["associateMedia", "location"]).unwrap();
        assert_eq!(join_text(called), "called\nuri[0] = b");
        assert!(section(&lines, "answering", &[]).is_none());
    }

    #[test]
    fn test_dotted_key_matches_parent() {
        let lines = tokenize("callId.main = X", 1);
        assert!(lines[0].is_named("callId"));
        assert!(!lines[0].is_named("main"));
    }
}
