//! Tunables enumerated in spec.md §6, gathered behind a builder.
//!
//! Grounded on the teacher's `NetflowParserBuilder`: a plain struct with
//! `with_*` setters and a `build()` that only fails if a tunable is
//! internally inconsistent.

/// UDP destination port a `TrdpOverUdp` frame must target.
pub const DEFAULT_TT_PORT: u16 = 50_000;

/// EtherType carried by a native TT frame.
pub const DEFAULT_ETH_P_TT: u16 = 0x88B6;

/// Size in bytes of the TT header (`flow_id` + `len`).
pub const TT_HLEN: usize = 4;

/// Floor capacity a `FlowTable` never shrinks below.
pub const DEFAULT_MIN_CAP: u16 = 8;

/// Per-table cap on the number of entries a control session may commit.
pub const DEFAULT_MAX_FLOWS: usize = 255;

/// Default pre-arm slack for the timer loop (sub-millisecond).
pub const DEFAULT_ADVANCE_TIME_NS: u64 = 50_000;

/// Per-port configuration assembled once and handed to `ScheduleState::alloc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub tt_port: u16,
    pub eth_p_tt: u16,
    pub min_cap: u16,
    pub max_flows: usize,
    pub advance_time_ns: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            tt_port: DEFAULT_TT_PORT,
            eth_p_tt: DEFAULT_ETH_P_TT,
            min_cap: DEFAULT_MIN_CAP,
            max_flows: DEFAULT_MAX_FLOWS,
            advance_time_ns: DEFAULT_ADVANCE_TIME_NS,
        }
    }
}

/// Builder for [`ScheduleConfig`].
///
/// # Examples
///
/// ```rust
/// use tt_scheduler::config::ScheduleConfigBuilder;
///
/// let config = ScheduleConfigBuilder::default()
///     .with_max_flows(64)
///     .with_advance_time_ns(20_000)
///     .build();
/// assert_eq!(config.max_flows, 64);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleConfigBuilder {
    config: ScheduleConfig,
}

impl ScheduleConfigBuilder {
    pub fn with_tt_port(mut self, tt_port: u16) -> Self {
        self.config.tt_port = tt_port;
        self
    }

    pub fn with_eth_p_tt(mut self, eth_p_tt: u16) -> Self {
        self.config.eth_p_tt = eth_p_tt;
        self
    }

    pub fn with_min_cap(mut self, min_cap: u16) -> Self {
        self.config.min_cap = min_cap.max(1);
        self
    }

    pub fn with_max_flows(mut self, max_flows: usize) -> Self {
        self.config.max_flows = max_flows;
        self
    }

    pub fn with_advance_time_ns(mut self, advance_time_ns: u64) -> Self {
        self.config.advance_time_ns = advance_time_ns;
        self
    }

    pub fn build(self) -> ScheduleConfig {
        self.config
    }
}

impl From<ScheduleConfig> for ScheduleConfigBuilder {
    fn from(config: ScheduleConfig) -> Self {
        ScheduleConfigBuilder { config }
    }
}
