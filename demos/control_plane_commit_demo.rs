//! Drive a `ControlPlane` session the way a controller's FlowMod decoder
//! would: `BeginAdd`, stream in `AddEntry`s, `EndAdd` to commit.

use std::collections::HashMap;
use std::sync::Arc;

use tt_scheduler::clock::SystemClock;
use tt_scheduler::config::ScheduleConfig;
use tt_scheduler::{ControlPlane, Direction, FlowMod, FrameSink, PortId, ScheduleState};

struct LoggingSink;

impl FrameSink for LoggingSink {
    fn send(&self, port: PortId, flow_id: u16, frame: Arc<Vec<u8>>) {
        println!("port {port}: sent flow {flow_id} ({} bytes)", frame.len());
    }
}

fn main() {
    let state = Arc::new(ScheduleState::alloc(
        ScheduleConfig::default(),
        Arc::new(SystemClock::new()),
        Arc::new(LoggingSink),
    ));
    let mut ports = HashMap::new();
    ports.insert(1u32, Arc::clone(&state));

    let control = ControlPlane::new(255);
    control.begin_add(1, Direction::Send, 2).expect("begin_add");
    control
        .add_entry(
            1,
            Direction::Send,
            FlowMod { port: 1, direction: Direction::Send, flow_id: 0, offset: 0, period: 300, buffer_id: 0, packet_size: 64 },
        )
        .expect("add_entry 0");
    control
        .add_entry(
            1,
            Direction::Send,
            FlowMod { port: 1, direction: Direction::Send, flow_id: 1, offset: 100, period: 500, buffer_id: 0, packet_size: 64 },
        )
        .expect("add_entry 1");

    match control.end_add(1, Direction::Send, &ports) {
        Ok(()) => println!("committed {} entries", control.query(1, Direction::Send).len()),
        Err(e) => println!("commit rejected: {e}"),
    }

    state.start().expect("schedule installed");
    println!("port 1 running: {}", state.is_running());
    state.finish();
}
