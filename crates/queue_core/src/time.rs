use std::time::Duration;

/// Time elapsed since the session started. The core never reads a clock;
/// every message that needs the current time carries one of these.
pub type Timestamp = Duration;

/// Timers the core asks the runtime to arm. The payload is a generation
/// number: a fired timer whose generation is no longer armed is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerId {
    PollTick(u64),
    Retry(u64),
    QuickRefresh(u64),
    FailSafe(u64),
}

/// Correlates a status fetch with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);
