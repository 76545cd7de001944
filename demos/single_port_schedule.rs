//! Build a two-flow schedule for a single port and print the timeline a
//! controller would see after calling `start`.

use std::sync::Arc;

use tt_scheduler::config::ScheduleConfig;
use tt_scheduler::{build_send_cache, Direction, FlowEntry, FrameSink, PortId, ScheduleState};
use tt_scheduler::clock::SystemClock;

struct LoggingSink;

impl FrameSink for LoggingSink {
    fn send(&self, port: PortId, flow_id: u16, frame: Arc<Vec<u8>>) {
        println!("port {port}: sent flow {flow_id} ({} bytes)", frame.len());
    }
}

fn main() {
    let entries = [
        FlowEntry { flow_id: 0, period: 300, offset: 0, packet_size: 64, buffer_id: 0 },
        FlowEntry { flow_id: 1, period: 500, offset: 100, packet_size: 64, buffer_id: 0 },
    ];
    let cache = build_send_cache(&entries).expect("non-empty table");
    println!("macro_period = {}ns, {} instants", cache.macro_period, cache.size());
    for (t, id) in cache.times.iter().zip(cache.flow_ids.iter()) {
        println!("  t={t:>6}ns  flow={id}");
    }
    for event in &cache.collisions {
        println!("  collision: {event}");
    }

    let clock = Arc::new(SystemClock::new());
    let state = Arc::new(ScheduleState::alloc(
        ScheduleConfig::default(),
        clock,
        Arc::new(LoggingSink),
    ));
    for entry in entries {
        state.insert(Direction::Send, entry).expect("insert");
    }
    state.start().expect("nonempty table starts cleanly");
    std::thread::sleep(std::time::Duration::from_millis(5));
    state.finish();
}
