//! Fee & Path Economics (C3), §4.3.
//!
//! Two distinct fee models live side by side, per the specification's own
//! wording: a transaction-level quotation ([`fees`]) snapshotted once at
//! creation and never recomputed, and a path-level multiplicative decay
//! ([`preview`]) used only by the read-only route preview.

pub mod fees;
pub mod preview;
