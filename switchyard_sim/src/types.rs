// Core types shared across the command pipeline.
//
// Defines map coordinates (`TileIndex`), the money type, company identifiers,
// the pause-mode bit set and the small ID newtypes used by towns and signs.
// All types derive `Serialize` and `Deserialize` because they are part of
// replicated world state or of the command wire record.
//
// **Critical constraint: determinism.** Everything here is plain data with a
// total order so it can live in `BTreeMap`s; no hashing with random state.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed currency amount. Costs are positive, income is negative.
pub type Money = i64;

// ---------------------------------------------------------------------------
// Map coordinates
// ---------------------------------------------------------------------------

/// Linear index of a map tile, row-major: `y * size_x + x`.
///
/// `TileIndex::INVALID` is the "no tile" sentinel used by commands that do
/// not target a location (pause, settings, money transfers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex(pub u32);

impl TileIndex {
    pub const INVALID: TileIndex = TileIndex(u32::MAX);

    /// Build a tile index from map coordinates.
    pub const fn from_xy(x: u32, y: u32, size_x: u32) -> Self {
        Self(y * size_x + x)
    }

    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }

    pub const fn x(self, size_x: u32) -> u32 {
        self.0 % size_x
    }

    pub const fn y(self, size_x: u32) -> u32 {
        self.0 / size_x
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("<no tile>")
        }
    }
}

// ---------------------------------------------------------------------------
// Owners and entity IDs
// ---------------------------------------------------------------------------

/// Identifier of a company (player-controlled economic entity).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyId(pub u8);

impl CompanyId {
    /// Issuer without a company: spectators, scripts, and town-issued
    /// sub-commands. Has unlimited funds for the purpose of the money check.
    pub const SPECTATOR: CompanyId = CompanyId(u8::MAX);

    pub const fn is_spectator(self) -> bool {
        self.0 == u8::MAX
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_spectator() {
            f.write_str("spectator")
        } else {
            write!(f, "company {}", self.0)
        }
    }
}

/// Identifier of a town.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TownId(pub u32);

/// Identifier of a map sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignId(pub u32);

// ---------------------------------------------------------------------------
// Pause state
// ---------------------------------------------------------------------------

bitflags! {
    /// Reasons the game is paused. The game is paused while any bit is set.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PauseMode: u8 {
        /// Paused by the player or the host.
        const NORMAL = 1 << 0;
        /// Paused while a client joins a replicated session.
        const JOIN = 1 << 1;
        /// Paused because a fatal script error was reported.
        const ERROR = 1 << 2;
    }
}

impl PauseMode {
    pub fn is_paused(self) -> bool {
        !self.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Expense bookkeeping
// ---------------------------------------------------------------------------

/// Ledger category a cost is booked under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExpensesType {
    Construction,
    Property,
    Transfer,
    #[default]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_index_xy_roundtrip() {
        let tile = TileIndex::from_xy(5, 7, 64);
        assert_eq!(tile.0, 7 * 64 + 5);
        assert_eq!(tile.x(64), 5);
        assert_eq!(tile.y(64), 7);
    }

    #[test]
    fn invalid_tile_sentinel() {
        assert!(!TileIndex::INVALID.is_valid());
        assert!(TileIndex(0).is_valid());
        assert_eq!(TileIndex::INVALID.to_string(), "<no tile>");
    }

    #[test]
    fn pause_mode_is_paused_when_any_bit_set() {
        assert!(!PauseMode::empty().is_paused());
        assert!(PauseMode::JOIN.is_paused());
        assert!((PauseMode::NORMAL | PauseMode::ERROR).is_paused());
    }

    #[test]
    fn spectator_company() {
        assert!(CompanyId::SPECTATOR.is_spectator());
        assert!(!CompanyId(0).is_spectator());
        assert_eq!(CompanyId(3).to_string(), "company 3");
    }
}
