//! Scene identifiers

use std::fmt;

use crate::error::{BridgeError, BridgeResult};

/// Number of renderer slots; valid scene ids are `0..CACHE_CAPACITY`
pub const CACHE_CAPACITY: usize = 10;

/// A scene id already checked against [`CACHE_CAPACITY`]
///
/// The only way to build one is [`SceneId::new`], so anything holding a
/// `SceneId` can index the cache table without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u32);

impl SceneId {
    /// Validate a raw id
    pub fn new(raw: u64) -> BridgeResult<Self> {
        match u32::try_from(raw) {
            Ok(id) if (id as usize) < CACHE_CAPACITY => Ok(Self(id)),
            _ => Err(BridgeError::SceneOutOfRange {
                scene: raw,
                capacity: CACHE_CAPACITY,
            }),
        }
    }

    /// Parse a query-string value
    ///
    /// Returns `None` for anything that is not a base-10 unsigned integer;
    /// range checking is left to [`SceneId::new`].
    pub fn parse_raw(value: &str) -> Option<u64> {
        value.trim().parse::<u64>().ok()
    }

    /// Raw value passed to the native engine
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Slot index in the renderer cache
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Every valid scene id, in slot order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..CACHE_CAPACITY as u32).map(Self)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
