//! Time-Triggered (TT) packet scheduling for a software switch datapath.
//!
//! A TT header (4 bytes: `flow_id`, `len`) is pushed onto frames entering a
//! switch over a dedicated UDP port, classified by [`header::classify`], and
//! scheduled per egress port against a macro-period timeline built by
//! [`dispatcher::build_send_cache`]. [`port::ScheduleState`] owns the two
//! per-port [`flow_table::FlowTable`]s (send/arrive) and the background
//! timer thread that walks the schedule; [`control::ControlPlane`] is the
//! session-guarded interface a controller uses to install a new schedule.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tt_scheduler::{ScheduleState, FlowEntry, Direction, FrameSink, PortId};
//! use tt_scheduler::clock::TestClock;
//! use tt_scheduler::config::ScheduleConfig;
//!
//! struct NullSink;
//! impl FrameSink for NullSink {
//!     fn send(&self, _port: PortId, _flow_id: u16, _frame: Arc<Vec<u8>>) {}
//! }
//!
//! let clock = Arc::new(TestClock::default());
//! let state = Arc::new(ScheduleState::alloc(ScheduleConfig::default(), clock, Arc::new(NullSink)));
//! state
//!     .insert(Direction::Send, FlowEntry { flow_id: 7, period: 1_000, offset: 250, packet_size: 64, buffer_id: 0 })
//!     .unwrap();
//! state.start().unwrap();
//! assert!(state.is_running());
//! state.finish();
//! ```

pub mod clock;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod flow_table;
pub mod header;
pub mod port;
pub mod protocol;
pub mod timer;

pub use control::{ControlPlane, FlowMod};
pub use dispatcher::{build_send_cache, SendCache};
pub use error::{TtError, TtEvent};
pub use flow_table::{FlowEntry, FlowTable};
pub use header::{classify, pop_tt, push_tt, FrameClass, TtHeader};
pub use port::{Direction, FrameSink, PortId, ScheduleState, StagedFrame};
