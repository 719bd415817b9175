// Worker constants (no magic values)
use std::time::Duration;

/// Sleep duration after a store error before polling again (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Default idle sleep when nothing is eligible (1s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default heartbeat period while a handler runs (10s)
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Default wait for in-flight handlers on close (30s)
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Heartbeats per stalled interval, so one missed beat is not a stall
pub const HEARTBEATS_PER_STALLED_INTERVAL: u32 = 3;
