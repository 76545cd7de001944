//! Control-plane assembly (spec.md §4.6, §6): the `BeginAdd`/`AddEntry`/
//! `EndAdd`/`Clear`/`Query` session that guards committing a new schedule
//! until an expected flow count has been received.
//!
//! Grounded on the teacher's builder/session split (`NetflowParserBuilder`
//! accumulates configuration, then `.build()` commits it) generalized to
//! an explicit state machine, since spec.md names the states (`MUTABLE`,
//! `CONST`) the teacher's builder leaves implicit.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::TtError;
use crate::port::{Direction, PortId};

/// `MUTABLE`/`CONST` from spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Mutable,
    Const,
}

/// One decoded `FlowMod` record (spec.md §6). The wire framing that
/// produces this value is out of scope (spec.md §1); this is the shape
/// the core consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowMod {
    pub port: PortId,
    pub direction: Direction,
    /// 32-bit on the wire; validated to fit `u16` at commit (spec.md §9).
    pub flow_id: u32,
    pub offset: u64,
    pub period: u64,
    pub buffer_id: u32,
    pub packet_size: u32,
}

impl FlowMod {
    fn into_entry(self) -> Result<(PortId, Direction, crate::flow_table::FlowEntry), TtError> {
        if self.flow_id > u16::MAX as u32 {
            return Err(TtError::InvalidFlowId { flow_id: self.flow_id });
        }
        Ok((
            self.port,
            self.direction,
            crate::flow_table::FlowEntry {
                flow_id: self.flow_id as u16,
                period: self.period,
                offset: self.offset,
                packet_size: self.packet_size,
                buffer_id: self.buffer_id,
            },
        ))
    }
}

/// Transient session attached to one (port, direction) pair (spec.md §3).
struct ControlSession {
    expected: u32,
    received: u32,
    state: SessionState,
    entry_list: Vec<FlowMod>,
}

/// Registry of in-flight control sessions, keyed by (port, direction).
/// spec.md §4.6 describes the session's state machine but not its
/// container; a session exists for as long as a controller connection is
/// assembling a table for that port/direction, so a keyed map is the
/// natural carrier (see SPEC_FULL.md §3).
pub struct ControlPlane {
    max_flows: usize,
    sessions: Mutex<HashMap<(PortId, Direction), ControlSession>>,
}

impl ControlPlane {
    pub fn new(max_flows: usize) -> Self {
        ControlPlane {
            max_flows,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// `BeginAdd(expected_count)` (spec.md §4.6 step 1).
    pub fn begin_add(&self, port: PortId, direction: Direction, expected: u32) -> Result<(), TtError> {
        if expected as usize > self.max_flows {
            return Err(TtError::TooMany { expected, max: self.max_flows as u32 });
        }
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(&(port, direction)) {
            if existing.state == SessionState::Mutable {
                return Err(TtError::WrongState { expected: "no prior MUTABLE session", found: "MUTABLE" });
            }
        }
        sessions.insert(
            (port, direction),
            ControlSession {
                expected,
                received: 0,
                state: SessionState::Mutable,
                entry_list: Vec::new(),
            },
        );
        Ok(())
    }

    /// `AddEntry(entry)` (spec.md §4.6 step 2).
    pub fn add_entry(&self, port: PortId, direction: Direction, entry: FlowMod) -> Result<(), TtError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&(port, direction))
            .ok_or(TtError::WrongState { expected: "MUTABLE", found: "no session" })?;
        if session.state != SessionState::Mutable {
            return Err(TtError::WrongState { expected: "MUTABLE", found: "CONST" });
        }
        session.entry_list.push(entry);
        session.received += 1;
        Ok(())
    }

    /// `EndAdd` (spec.md §4.6 step 3): commit `entry_list` to the given
    /// port's tables, routed by each entry's own port/direction fields,
    /// and transition the session to `CONST`.
    ///
    /// Commit is not atomic across entries, by design (spec.md §4.6): each
    /// table insert becomes visible under `FlowTable`'s own replacement
    /// semantics as soon as it happens.
    pub fn end_add<C: crate::clock::Clock + 'static>(
        &self,
        port: PortId,
        direction: Direction,
        ports: &HashMap<PortId, std::sync::Arc<crate::port::ScheduleState<C>>>,
    ) -> Result<(), TtError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&(port, direction))
            .ok_or(TtError::WrongState { expected: "MUTABLE", found: "no session" })?;
        if session.state != SessionState::Mutable {
            return Err(TtError::WrongState { expected: "MUTABLE", found: "CONST" });
        }
        if session.received != session.expected {
            return Err(TtError::Incomplete { expected: session.expected, received: session.received });
        }

        for mod_entry in &session.entry_list {
            let (entry_port, entry_direction, entry) =
                mod_entry.into_entry().map_err(|e| {
                    // Leave the session MUTABLE so a bad entry does not
                    // silently finalize a partial commit.
                    e
                })?;
            if let Some(state) = ports.get(&entry_port) {
                state.insert(entry_direction, entry)?;
            }
        }

        session.state = SessionState::Const;
        Ok(())
    }

    /// `Clear` (spec.md §4.6 step 4).
    pub fn clear(&self, port: PortId, direction: Direction) {
        self.sessions.lock().remove(&(port, direction));
    }

    /// `Query` (spec.md §4.6 step 5): a snapshot copy of the entries
    /// accumulated in the current session, if any.
    pub fn query(&self, port: PortId, direction: Direction) -> Vec<FlowMod> {
        self.sessions
            .lock()
            .get(&(port, direction))
            .map(|s| s.entry_list.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_mod(port: PortId, flow_id: u32) -> FlowMod {
        FlowMod {
            port,
            direction: Direction::Send,
            flow_id,
            offset: 0,
            period: 1_000,
            buffer_id: 0,
            packet_size: 64,
        }
    }

    /// S4 — Control-plane commit (spec.md §8).
    #[test]
    fn full_commit_transitions_to_const() {
        let control = ControlPlane::new(255);
        control.begin_add(1, Direction::Send, 3).unwrap();
        for i in 0..3 {
            control.add_entry(1, Direction::Send, flow_mod(1, i)).unwrap();
        }
        let ports = HashMap::<PortId, std::sync::Arc<crate::port::ScheduleState<crate::clock::TestClock>>>::new();
        control.end_add(1, Direction::Send, &ports).unwrap();
        assert_eq!(control.query(1, Direction::Send).len(), 3);
    }

    /// S4 — partial commit stays MUTABLE and reports Incomplete.
    #[test]
    fn partial_commit_reports_incomplete() {
        let control = ControlPlane::new(255);
        control.begin_add(1, Direction::Send, 3).unwrap();
        control.add_entry(1, Direction::Send, flow_mod(1, 0)).unwrap();
        control.add_entry(1, Direction::Send, flow_mod(1, 1)).unwrap();
        let ports = HashMap::<PortId, std::sync::Arc<crate::port::ScheduleState<crate::clock::TestClock>>>::new();
        let result = control.end_add(1, Direction::Send, &ports);
        assert_eq!(result, Err(TtError::Incomplete { expected: 3, received: 2 }));
    }

    #[test]
    fn begin_add_over_max_flows_is_rejected() {
        let control = ControlPlane::new(4);
        let result = control.begin_add(1, Direction::Send, 5);
        assert_eq!(result, Err(TtError::TooMany { expected: 5, max: 4 }));
    }

    #[test]
    fn add_entry_without_session_is_wrong_state() {
        let control = ControlPlane::new(255);
        let result = control.add_entry(1, Direction::Send, flow_mod(1, 0));
        assert!(result.is_err());
    }

    #[test]
    fn clear_drops_the_session() {
        let control = ControlPlane::new(255);
        control.begin_add(1, Direction::Send, 1).unwrap();
        control.add_entry(1, Direction::Send, flow_mod(1, 0)).unwrap();
        control.clear(1, Direction::Send);
        assert!(control.query(1, Direction::Send).is_empty());
    }

    #[test]
    fn commit_rejects_flow_id_over_16_bits() {
        let control = ControlPlane::new(255);
        control.begin_add(1, Direction::Send, 1).unwrap();
        control.add_entry(1, Direction::Send, flow_mod(1, 1 << 20)).unwrap();
        let ports = HashMap::<PortId, std::sync::Arc<crate::port::ScheduleState<crate::clock::TestClock>>>::new();
        let result = control.end_add(1, Direction::Send, &ports);
        assert!(matches!(result, Err(TtError::InvalidFlowId { .. })));
    }
}
