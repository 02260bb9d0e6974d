//! Cross-call analysis: overlapping activity, shared contacts and towers, and call-forwarding
//! chains. The global bucket of unidentified messages never takes part.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{Call, CallMap};
use crate::parsers::party::normalize_number;
use crate::timestamp::{parse_timestamp, round_seconds};

/// Largest gap between one call finishing and the next starting for the pair to count as
/// forwarding.
pub const FORWARDING_WINDOW_MS: i64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOverlap {
    pub call_a: String,
    pub call_b: String,
    /// `None` when both calls are still open, so the overlap has no end.
    pub overlap_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedContact {
    pub call_a: String,
    pub call_b: String,
    pub numbers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedTower {
    pub call_a: String,
    pub call_b: String,
    pub tower_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingSequence {
    pub call_a: String,
    pub call_b: String,
    pub forwarding_number: String,
    pub gap_seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationResult {
    pub time_overlaps: Vec<TimeOverlap>,
    pub shared_contacts: Vec<SharedContact>,
    pub shared_towers: Vec<SharedTower>,
    pub forwarding_sequences: Vec<ForwardingSequence>,
}

impl CorrelationResult {
    pub fn is_empty(&self) -> bool {
        self.time_overlaps.is_empty()
            && self.shared_contacts.is_empty()
            && self.shared_towers.is_empty()
            && self.forwarding_sequences.is_empty()
    }
}

fn contact_numbers(call: &Call) -> BTreeSet<String> {
    [call.calling_number(), call.called_number()]
        .into_iter()
        .flatten()
        .map(normalize_number)
        .filter(|n| !n.is_empty())
        .collect()
}

fn tower_keys(call: &Call) -> BTreeSet<String> {
    call.locations
        .iter()
        .filter_map(|l| l.cell.as_ref()?.tower_key())
        .collect()
}

type Instant = DateTime<Utc>;

/// Interval start is the answer time when known, otherwise the start time.
fn interval(call: &Call) -> Option<(Instant, Option<Instant>)> {
    let start = call
        .answer_time
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| call.start_time.as_deref().and_then(parse_timestamp))?;
    Some((start, call.end_time.as_deref().and_then(parse_timestamp)))
}

fn time_overlap(a: &Call, b: &Call) -> Option<TimeOverlap> {
    let (a_start, a_end) = interval(a)?;
    let (b_start, b_end) = interval(b)?;

    let start = a_start.max(b_start);
    let end = match (a_end, b_end) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    };
    if end.is_some_and(|end| end <= start) {
        return None;
    }

    Some(TimeOverlap {
        call_a: a.key.clone(),
        call_b: b.key.clone(),
        overlap_seconds: end.map(|end| round_seconds((end - start).num_milliseconds())),
    })
}

fn forwarding(prev: &Call, next: &Call, next_start: Instant) -> Option<ForwardingSequence> {
    let prev_called = normalize_number(prev.called_number()?);
    let next_calling = normalize_number(next.calling_number()?);
    if prev_called.is_empty() || prev_called != next_calling {
        return None;
    }

    let prev_done = prev
        .end_time
        .as_deref()
        .or(prev.start_time.as_deref())
        .and_then(parse_timestamp)?;
    let gap = (next_start - prev_done).num_milliseconds();
    if !(0..=FORWARDING_WINDOW_MS).contains(&gap) {
        return None;
    }

    Some(ForwardingSequence {
        call_a: prev.key.clone(),
        call_b: next.key.clone(),
        forwarding_number: prev_called,
        gap_seconds: gap / 1000,
    })
}

/// Run every pairwise analysis over the identified calls. Fewer than two calls yields an
/// empty result.
pub fn correlate(calls: &CallMap) -> CorrelationResult {
    let calls: Vec<&Call> = calls.identified().collect();
    let mut result = CorrelationResult::default();
    if calls.len() < 2 {
        return result;
    }

    let contacts: Vec<BTreeSet<String>> = calls.iter().map(|c| contact_numbers(c)).collect();
    let towers: Vec<BTreeSet<String>> = calls.iter().map(|c| tower_keys(c)).collect();

    for i in 0..calls.len() {
        for j in i + 1..calls.len() {
            let (a, b) = (calls[i], calls[j]);

            if let Some(overlap) = time_overlap(a, b) {
                result.time_overlaps.push(overlap);
            }

            let numbers: Vec<String> = contacts[i].intersection(&contacts[j]).cloned().collect();
            if !numbers.is_empty() {
                result.shared_contacts.push(SharedContact {
                    call_a: a.key.clone(),
                    call_b: b.key.clone(),
                    numbers,
                });
            }

            let tower_keys: Vec<String> = towers[i].intersection(&towers[j]).cloned().collect();
            if !tower_keys.is_empty() {
                result.shared_towers.push(SharedTower {
                    call_a: a.key.clone(),
                    call_b: b.key.clone(),
                    tower_keys,
                });
            }
        }
    }

    let mut started: Vec<(&Call, Instant)> = calls
        .iter()
        .filter_map(|c| Some((*c, parse_timestamp(c.start_time.as_deref()?)?)))
        .collect();
    started.sort_by_key(|(_, t)| *t);
    for pair in started.windows(2) {
        if let Some(seq) = forwarding(pair[0].0, pair[1].0, pair[1].1) {
            result.forwarding_sequences.push(seq);
        }
    }

    debug!(
        overlaps = result.time_overlaps.len(),
        contacts = result.shared_contacts.len(),
        towers = result.shared_towers.len(),
        forwarding = result.forwarding_sequences.len(),
        "correlated calls"
    );
    result
}
