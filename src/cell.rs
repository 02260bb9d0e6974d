//! 3GPP composite cell identifier decoding (MCC + MNC + LAC + CellID).

use serde::Serialize;

/// Identifiers shorter than this are kept raw.
pub const MIN_CELL_ID_LEN: usize = 15;

const MCC_LEN: usize = 3;
const MNC_LEN: usize = 3;
const CELL_PART_LEN: usize = 8;
const LAC_MIN_WIDTH: usize = 4;

/// Why a radix was picked for the LAC / CellID tail. The identifier carries no marker,
/// so this is the only confidence signal available to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CellRadix {
    /// The tail contains `a-f` letters.
    HexLetters,
    /// All digits, but too long to be a decimal LAC/CellID pair.
    HexLength,
    Decimal,
}

/// A decomposed numeric component, or the raw substring when it did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellComponent {
    Number(u64),
    Raw(String),
}

impl std::fmt::Display for CellComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellComponent::Number(n) => write!(f, "{}", n),
            CellComponent::Raw(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellIdentifier {
    pub raw: String,
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub lac: Option<CellComponent>,
    pub cell_id: Option<CellComponent>,
    pub radix: Option<CellRadix>,
}

impl CellIdentifier {
    fn undecoded(raw: String) -> Self {
        Self {
            raw,
            mcc: None,
            mnc: None,
            lac: None,
            cell_id: None,
            radix: None,
        }
    }

    /// `LAC-CellID`, used to match serving towers across calls.
    pub fn tower_key(&self) -> Option<String> {
        match (&self.lac, &self.cell_id) {
            (Some(lac), Some(ci)) => Some(format!("{}-{}", lac, ci)),
            _ => None,
        }
    }
}

/// Split `raw` into MCC/MNC/LAC/CellID. Identifiers that are too short, not ASCII, or
/// whose MCC/MNC are not digits come back with only `raw` set.
pub fn decode_cell_identifier(raw: &str) -> CellIdentifier {
    let raw = raw.trim().to_string();
    if raw.len() < MIN_CELL_ID_LEN || !raw.is_ascii() {
        return CellIdentifier::undecoded(raw);
    }

    let mcc = &raw[..MCC_LEN];
    let mnc = &raw[MCC_LEN..MCC_LEN + MNC_LEN];
    if !mcc.bytes().all(|b| b.is_ascii_digit()) || !mnc.bytes().all(|b| b.is_ascii_digit()) {
        return CellIdentifier::undecoded(raw);
    }

    let tail = &raw[MCC_LEN + MNC_LEN..];
    let radix = tail_radix(tail);
    let split = tail.len() - CELL_PART_LEN;
    let lac_part = pad_left(&tail[..split], LAC_MIN_WIDTH);
    let cell_part = &tail[split..];

    let lac = parse_component(&lac_part, radix);
    let cell_id = parse_component(cell_part, radix);

    CellIdentifier {
        mcc: Some(mcc.to_string()),
        mnc: Some(mnc.to_string()),
        lac: Some(lac),
        cell_id: Some(cell_id),
        radix: Some(radix),
        raw,
    }
}

fn tail_radix(tail: &str) -> CellRadix {
    if tail.bytes().any(|b| matches!(b, b'a'..=b'f' | b'A'..=b'F')) {
        CellRadix::HexLetters
    } else if tail.len() > CELL_PART_LEN {
        CellRadix::HexLength
    } else {
        CellRadix::Decimal
    }
}

fn pad_left(s: &str, width: usize) -> String {
    if s.len() >= width {
        s.to_string()
    } else {
        format!("{}{}", "0".repeat(width - s.len()), s)
    }
}

fn parse_component(part: &str, radix: CellRadix) -> CellComponent {
    let parsed = match radix {
        CellRadix::HexLetters | CellRadix::HexLength => u64::from_str_radix(part, 16),
        CellRadix::Decimal => part.parse::<u64>(),
    };
    match parsed {
        Ok(n) => CellComponent::Number(n),
        Err(_) => CellComponent::Raw(part.to_string()),
    }
}
