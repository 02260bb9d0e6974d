use std::sync::LazyLock;

use regex::Regex;

use crate::block::Line;
use crate::model::Codec;

static RTPMAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^a=rtpmap:(\d+)\s+([^/\s]+)(?:/(\d+))?").unwrap());

/// SDP lines are a single lower-case type letter followed by `=`.
fn is_sdp_line(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() >= 2 && b[0].is_ascii_lowercase() && b[1] == b'='
}

/// The `sdp = ...` block: its own value plus following SDP lines, stopping at a blank
/// line, a non-SDP line (the next top-level field) or any of `terminators`.
pub fn sdp_block(lines: &[Line<'_>], terminators: &[&str]) -> Option<String> {
    let start = lines.iter().position(|l| l.key_is("sdp"))?;
    let mut out: Vec<&str> = Vec::new();
    if let Some(v) = lines[start].value.filter(|v| !v.is_empty()) {
        out.push(v);
    }
    for line in &lines[start + 1..] {
        if line.is_blank() || terminators.iter().any(|t| line.is_named(t)) || !is_sdp_line(line.text) {
            break;
        }
        out.push(line.text);
    }
    if out.is_empty() {
        None
    } else {
        Some(out.join("\n"))
    }
}

pub fn parse_codecs(sdp: &str) -> Vec<Codec> {
    let mut codecs: Vec<Codec> = Vec::new();
    for caps in RTPMAP_RE.captures_iter(sdp) {
        let Ok(payload_type) = caps[1].parse::<u16>() else { continue };
        let codec = Codec {
            payload_type,
            encoding: caps[2].to_string(),
            clock_rate: caps.get(3).and_then(|m| m.as_str().parse().ok()),
        };
        if !codecs.contains(&codec) {
            codecs.push(codec);
        }
    }
    codecs
}

pub fn has_video(sdp: &str) -> bool {
    sdp.lines().any(|l| l.trim_start().starts_with("m=video"))
}
