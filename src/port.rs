//! Per-port schedule state (spec.md §3, §4.5): owns a port's send/arrive
//! tables, send cache, timer thread, and frame-staging slots.
//!
//! Grounded on the teacher's top-level `NetflowParser` (one struct that
//! owns a handful of sub-caches and exposes lifecycle methods like
//! `with_cache_size`/`cache_stats`) generalized from "one parser, many
//! template caches" to "one port, two flow tables plus a timer".

use std::sync::Arc;
use std::thread::JoinHandle;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::ScheduleConfig;
use crate::dispatcher::{build_send_cache, SendCache};
use crate::error::{TtError, TtEvent};
use crate::flow_table::{FlowEntry, FlowTable};
use crate::timer::{self, TightSpin, TimerState, WaitStrategy};

/// A caller-assigned identifier for a switch port. Opaque to this crate.
pub type PortId = u32;

/// One flow's staged outbound frame, captured at ingress/encode time.
#[derive(Debug, Clone)]
pub struct StagedFrame {
    pub bytes: Arc<Vec<u8>>,
    pub captured_at_ns: u64,
}

/// The callback surface spec.md §1 calls "emit this frame on this port
/// now" — the only thing the timer handler knows about the world outside
/// this crate.
pub trait FrameSink: Send + Sync {
    fn send(&self, port: PortId, flow_id: u16, frame: Arc<Vec<u8>>);
}

/// Which table a control-plane entry or lookup targets (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Send,
    Arrive,
}

struct SendInfo {
    cache: SendCache,
    advance_time_ns: u64,
}

/// Per-port scheduling state (spec.md §3's `ScheduleState`).
///
/// Allocated lazily on first entry insertion ([`ScheduleState::insert_send`]/
/// [`ScheduleState::insert_arrive`] auto-alloc); the mutex in
/// `send_info`/`timer_state` serializes the control-path writers named in
/// spec.md §5, while `send_table`/`arrive_table`/`frame_buffer` stay
/// lock-free for the data path and timer callback.
pub struct ScheduleState<C: Clock + 'static> {
    config: ScheduleConfig,
    clock: Arc<C>,
    wait_strategy: Arc<dyn WaitStrategy>,
    sink: Arc<dyn FrameSink>,

    send_table: FlowTable,
    arrive_table: FlowTable,
    send_info: Mutex<Option<SendInfo>>,
    frame_buffer: Vec<ArcSwapOption<StagedFrame>>,

    active: Arc<std::sync::atomic::AtomicBool>,
    running: Arc<std::sync::atomic::AtomicBool>,
    timer_thread: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clock + 'static> ScheduleState<C> {
    /// `alloc` (spec.md §4.5): allocate scheduling state for a port.
    /// Idempotent in the sense that constructing a fresh `ScheduleState`
    /// is always safe; callers that want true per-port idempotence hold
    /// one instance per `PortId` in their own registry (see
    /// [`crate::control::ControlPlane`]).
    pub fn alloc(config: ScheduleConfig, clock: Arc<C>, sink: Arc<dyn FrameSink>) -> Self {
        let frame_buffer_len = config.max_flows;
        ScheduleState {
            send_table: FlowTable::new(config.min_cap),
            arrive_table: FlowTable::new(config.min_cap),
            send_info: Mutex::new(None),
            frame_buffer: (0..frame_buffer_len).map(|_| ArcSwapOption::empty()).collect(),
            active: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            running: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            timer_thread: Mutex::new(None),
            config,
            clock,
            wait_strategy: Arc::new(TightSpin),
            sink,
        }
    }

    pub fn with_wait_strategy(mut self, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    fn table(&self, direction: Direction) -> &FlowTable {
        match direction {
            Direction::Send => &self.send_table,
            Direction::Arrive => &self.arrive_table,
        }
    }

    /// `insert_send`/`insert_arrive` (spec.md §4.5).
    pub fn insert(&self, direction: Direction, entry: FlowEntry) -> Result<(), TtError> {
        self.table(direction).insert(entry)
    }

    /// `delete_send`/`delete_arrive` (spec.md §4.5). No-op if missing.
    pub fn delete(&self, direction: Direction, flow_id: u16) {
        self.table(direction).delete(flow_id);
    }

    /// `lookup_*` (spec.md §4.5), RCU-safe.
    pub fn lookup(&self, direction: Direction, flow_id: u16) -> Option<FlowEntry> {
        self.table(direction).lookup(flow_id)
    }

    /// `drop_send_table` (spec.md §4.5): reset `send_info`, leaving the
    /// send table itself to be torn down by the caller's port-destroy path.
    pub fn drop_send_info(&self) {
        *self.send_info.lock() = None;
    }

    /// Stage an outbound frame for `flow_id`, for the timer to pick up at
    /// its next fire. Single-writer from the ingress/encode fast path
    /// (spec.md §5: "single-writer ... timer consumes with an
    /// exchange-to-null").
    pub fn stage_frame(&self, flow_id: u16, frame: StagedFrame) {
        if let Some(slot) = self.frame_buffer.get(flow_id as usize) {
            slot.store(Some(Arc::new(frame)));
        }
    }

    /// `is_running` (spec.md §4.5).
    pub fn is_running(&self) -> bool {
        self.active.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// `start` (spec.md §4.5, §4.4): cancel any running timer, run the
    /// dispatcher, arm the loop.
    pub fn start(self: &Arc<Self>) -> Result<(), TtError> {
        self.cancel();

        let entries: Vec<FlowEntry> = {
            // Snapshot the send table's present entries. The table itself
            // stays index-addressed; the dispatcher only needs the
            // occupied slots.
            let mut out = Vec::new();
            for flow_id in 0..self.send_table.capacity() as u16 {
                if let Some(entry) = self.send_table.lookup(flow_id) {
                    out.push(entry);
                }
            }
            out
        };

        let cache = build_send_cache(&entries).ok_or(TtError::NothingToSchedule)?;
        for event in &cache.collisions {
            log::warn!("tt schedule: {event}");
        }

        *self.send_info.lock() = Some(SendInfo {
            cache,
            advance_time_ns: self.config.advance_time_ns,
        });

        self.active.store(true, std::sync::atomic::Ordering::SeqCst);
        self.spawn_timer_thread();
        Ok(())
    }

    fn spawn_timer_thread(self: &Arc<Self>) {
        let state = Arc::clone(self);
        let handle = std::thread::spawn(move || state.run_timer_loop());
        *self.timer_thread.lock() = Some(handle);
    }

    fn run_timer_loop(self: Arc<Self>) {
        loop {
            if !self.active.load(std::sync::atomic::Ordering::SeqCst) {
                return;
            }
            self.running.store(true, std::sync::atomic::Ordering::SeqCst);
            let restart = self.fire_one_expiry();
            self.running.store(false, std::sync::atomic::Ordering::SeqCst);
            if !restart {
                return;
            }
        }
    }

    /// One pass through spec.md §4.4's handler contract (steps 1-8).
    /// Returns whether the loop should keep running (`active` is still
    /// set, per step 8's "Restart").
    fn fire_one_expiry(&self) -> bool {
        let (wait_ns, flow_id, send_time_abs_ns) = {
            let guard = self.send_info.lock();
            let Some(info) = guard.as_ref() else {
                return false;
            };
            let global_time_ns = self.clock.global_time_ns();
            let wall_now_ns = self.clock.wall_now_ns();
            let outcome = timer::next(&info.cache, global_time_ns, wall_now_ns, info.advance_time_ns);
            (outcome.wait_ns, outcome.flow_id, outcome.send_time_abs_ns)
        };

        // Park for the coarse portion of the wait; real hardware arms a
        // one-shot hrtimer here instead of sleeping.
        let coarse = wait_ns.saturating_sub(self.config.advance_time_ns);
        if coarse > 0 {
            std::thread::sleep(std::time::Duration::from_nanos(coarse));
        }

        let wall_now_ns = self.clock.wall_now_ns();
        if timer::is_miss(send_time_abs_ns, wall_now_ns) {
            log::warn!(
                "{}",
                TtEvent::Miss { flow_id, late_by_ns: wall_now_ns - send_time_abs_ns }
            );
        } else {
            self.wait_strategy
                .spin_until(self.clock.as_ref(), self.config.advance_time_ns, send_time_abs_ns);
            self.emit_staged_frame(flow_id);
        }

        self.active.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn emit_staged_frame(&self, flow_id: u16) {
        let Some(slot) = self.frame_buffer.get(flow_id as usize) else {
            return;
        };
        // Exchange-to-null: single consumer, matches spec.md §5's staging
        // discipline.
        let Some(frame) = slot.swap(None) else {
            return;
        };
        let macro_period = self
            .send_info
            .lock()
            .as_ref()
            .map(|info| info.cache.macro_period)
            .unwrap_or(u64::MAX);
        let age = self.clock.global_time_ns().saturating_sub(frame.captured_at_ns);
        if age <= macro_period {
            self.sink.send(0, flow_id, Arc::clone(&frame.bytes));
        }
    }

    /// `cancel` (spec.md §4.4, §5): synchronous and idempotent.
    pub fn cancel(&self) {
        self.active.store(false, std::sync::atomic::Ordering::SeqCst);
        while self.running.load(std::sync::atomic::Ordering::SeqCst) {
            std::thread::yield_now();
        }
        if let Some(handle) = self.timer_thread.lock().take() {
            let _ = handle.join();
        }
    }

    /// `finish` (spec.md §4.5): cancel the timer and drop scheduling
    /// state. The `ScheduleState` itself is reclaimed by `Drop` once the
    /// caller's last `Arc` goes away.
    pub fn finish(&self) {
        self.cancel();
        self.drop_send_info();
    }
}
