use core::fmt::{Debug, Display, Formatter};

/// Identifies a logical client ("process") of the system under test. A process has at most one
/// outstanding operation at a time. Any integer is accepted, negative ones included.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct ProcId(i64);

/// Correlates a call with its return. Assigned in log order when a call is replayed and never
/// reused within one replay.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct EventId(usize);

impl EventId {
    /// Returns this ID and advances to the next one.
    pub fn next(&mut self) -> EventId {
        let id = *self;
        self.0 += 1;
        id
    }
}

impl Debug for ProcId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for ProcId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str("p")?;
        Display::fmt(&self.0, f)
    }
}

impl Debug for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str("#")?;
        Display::fmt(&self.0, f)
    }
}

impl From<ProcId> for i64 {
    fn from(proc: ProcId) -> Self {
        proc.0
    }
}

impl From<i64> for ProcId {
    fn from(n: i64) -> Self {
        ProcId(n)
    }
}

impl From<EventId> for usize {
    fn from(id: EventId) -> Self {
        id.0
    }
}

impl From<usize> for EventId {
    fn from(n: usize) -> Self {
        EventId(n)
    }
}
