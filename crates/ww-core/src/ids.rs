use core::fmt;
use core::num::NonZeroU32;

/// Stable identifier of a process or connection.
///
/// Stored as `index + 1` in a `NonZeroU32`, so an optional endpoint
/// (`Option<ProcessId>`) costs no more than a present one. Ordering follows
/// the index, so ordered maps keyed by `Id` iterate in creation order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(NonZeroU32);

impl Id {
    /// `None` for `u32::MAX`, the one index with no room for the offset.
    pub fn try_from_index(index: u32) -> Option<Self> {
        index.checked_add(1).and_then(NonZeroU32::new).map(Self)
    }

    /// Like [`Id::try_from_index`], saturating at the largest id.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::new(index.saturating_add(1)).unwrap_or(NonZeroU32::MAX))
    }

    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// A unit operation in the plant.
pub type ProcessId = Id;
/// A stream between two processes, or across the plant boundary.
pub type ConnectionId = Id;

/// Monotonic id allocator. Ids handed out are never handed out again, even
/// when ids were also observed from outside (see [`IdAllocator::observe`]).
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unused id, or `None` once the id space is used up.
    /// An exhausted allocator stays exhausted.
    pub fn next_id(&mut self) -> Option<Id> {
        let id = Id::try_from_index(self.next)?;
        self.next = self.next.saturating_add(1);
        Some(id)
    }

    /// Record an externally supplied id so later allocations skip past it.
    pub fn observe(&mut self, id: Id) {
        self.next = self.next.max(id.index().saturating_add(1));
    }
}
