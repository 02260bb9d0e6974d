//! Parsing and correlation of CDC/LAES lawful-intercept logs.
//!
//! A raw log is split into message blocks at registered keyword lines, each block is
//! classified and mined for its fields, and the resulting messages are grouped into
//! per-call timelines. [`correlate`] then cross-references the calls of one log.
//!
//! The keyword registry and field aliases live in a [`Standards`] table that callers load
//! from TOML and pass in explicitly, so new carrier dialects need no code change.

pub mod aggregate;
pub mod block;
pub mod cell;
pub mod classify;
pub mod correlate;
pub mod fields;
pub mod hexnorm;
pub mod model;
pub mod parsers;
pub mod pipeline;
pub mod sip;
pub mod standards;
pub mod timestamp;

pub use aggregate::{preferred_call, Call, CallDirection, CallMap, CallStatus, CallType, DeviceInfo, GLOBAL_EVENTS_KEY};
pub use cell::{decode_cell_identifier, CellIdentifier};
pub use correlate::{correlate, CorrelationResult};
pub use model::{ParsedMessage, TypedPayload};
pub use pipeline::{parse, parse_with, ParseOutput};
pub use standards::{FieldAliases, KindDescriptor, MessageKind, Standards, StandardsError};
