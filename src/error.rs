//! Error kinds for the scheduling core.
//!
//! Mirrors the teacher's hand-rolled `Display`/`std::error::Error` style
//! rather than reaching for a derive macro: each variant carries the
//! context a caller needs to log or report without re-deriving it.

use std::fmt;

use serde::Serialize;

/// All fallible outcomes documented in spec.md §7.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TtError {
    /// A table or cache allocation could not be grown.
    OutOfMemory,
    /// A control-plane message arrived while the session was in the wrong state.
    WrongState { expected: &'static str, found: &'static str },
    /// `EndAdd` fired before `received` reached `expected`.
    Incomplete { expected: u32, received: u32 },
    /// `BeginAdd` announced more entries than `max_flows` allows.
    TooMany { expected: u32, max: u32 },
    /// The dispatcher was asked to build a `SendCache` from an empty table.
    NothingToSchedule,
    /// The frame buffer could not be made writable in place for `pop_tt`.
    NotWritable,
    /// The frame could not be headroom-extended for `push_tt`.
    OutOfHeadroom,
    /// A `FlowMod.flow_id` did not fit in the 16-bit dataplane width.
    InvalidFlowId { flow_id: u32 },
}

impl fmt::Display for TtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtError::OutOfMemory => write!(f, "allocation failed while growing a table or cache"),
            TtError::WrongState { expected, found } => {
                write!(
                    f,
                    "control session expected state {expected} but found {found}"
                )
            }
            TtError::Incomplete { expected, received } => {
                write!(
                    f,
                    "EndAdd with {received}/{expected} entries received, session stays MUTABLE"
                )
            }
            TtError::TooMany { expected, max } => {
                write!(f, "BeginAdd announced {expected} entries, max is {max}")
            }
            TtError::NothingToSchedule => {
                write!(f, "dispatcher has no entries to build a send cache from")
            }
            TtError::NotWritable => write!(f, "frame buffer is not writable in place for pop_tt"),
            TtError::OutOfHeadroom => write!(f, "frame has no headroom left for push_tt"),
            TtError::InvalidFlowId { flow_id } => {
                write!(f, "flow_id {flow_id} does not fit in 16 bits")
            }
        }
    }
}

impl std::error::Error for TtError {}

/// Non-fatal events that are logged and do not abort the caller.
///
/// `Miss` and `Collision` are "errors" in spec.md §7's vocabulary but are
/// reported, not propagated: the timer handler keeps running and the
/// dispatcher still installs a collided schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TtEvent {
    /// Two flows' expanded instants collided within one macro period.
    Collision { flow_a: u16, flow_b: u16, instant_ns: u64 },
    /// The timer handler woke after the intended send instant had already passed.
    Miss { flow_id: u16, late_by_ns: u64 },
}

impl fmt::Display for TtEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtEvent::Collision { flow_a, flow_b, instant_ns } => write!(
                f,
                "collision at instant {instant_ns}ns between flow {flow_a} and flow {flow_b}"
            ),
            TtEvent::Miss { flow_id, late_by_ns } => {
                write!(f, "missed send for flow {flow_id}, {late_by_ns}ns late")
            }
        }
    }
}
