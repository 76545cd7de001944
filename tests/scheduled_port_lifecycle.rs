//! End-to-end coverage of a port's schedule lifecycle: insert entries,
//! start the timer loop, stage a frame, let the timer actually emit it
//! through a real `FrameSink`, then cancel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tt_scheduler::clock::TestClock;
use tt_scheduler::config::ScheduleConfigBuilder;
use tt_scheduler::port::StagedFrame;
use tt_scheduler::{Direction, FlowEntry, FrameSink, PortId, ScheduleState};

struct CountingSink {
    count: AtomicUsize,
}

impl FrameSink for CountingSink {
    fn send(&self, _port: PortId, _flow_id: u16, _frame: Arc<Vec<u8>>) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn staged_frame_is_emitted_once_the_clock_reaches_its_instant() {
    let clock = Arc::new(TestClock::new());
    let sink = Arc::new(CountingSink {
        count: AtomicUsize::new(0),
    });
    let config = ScheduleConfigBuilder::default()
        .with_advance_time_ns(1_000)
        .build();
    let state = Arc::new(ScheduleState::alloc(
        config,
        Arc::clone(&clock),
        Arc::clone(&sink) as Arc<dyn FrameSink>,
    ));

    state
        .insert(Direction::Send, FlowEntry { flow_id: 3, period: 1_000_000, offset: 0, packet_size: 64, buffer_id: 0 })
        .unwrap();
    state.stage_frame(
        3,
        StagedFrame {
            bytes: Arc::new(vec![0u8; 64]),
            captured_at_ns: 0,
        },
    );

    clock.set_global(0);
    clock.set_wall(0);
    state.start().unwrap();

    // The entry's single instant is at offset 0 and the clock never moves
    // past it, so the handler's miss check and spin-wait both resolve on
    // their first read: no real-time race to win.
    std::thread::sleep(Duration::from_millis(50));

    state.finish();
    assert!(sink.count.load(Ordering::SeqCst) >= 1);
}

#[test]
fn starting_with_an_empty_send_table_reports_nothing_to_schedule() {
    let clock = Arc::new(TestClock::new());
    let sink = Arc::new(CountingSink {
        count: AtomicUsize::new(0),
    });
    let state = Arc::new(ScheduleState::alloc(
        Default::default(),
        clock,
        sink as Arc<dyn FrameSink>,
    ));
    assert!(state.start().is_err());
    assert!(!state.is_running());
}
