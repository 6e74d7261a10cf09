//! Newline-delimited JSON event stream handling
//!
//! [`decoder`] reassembles complete lines from arbitrarily split byte
//! chunks; [`event`] turns each line into a typed [`VerificationEvent`].

pub mod decoder;
pub mod event;

pub use decoder::{ndjson_lines, LineDecoder};
pub use event::{classify, FinalTotals, Malformed, ResultRecord, VerificationEvent};
