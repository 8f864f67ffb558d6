// Relay-scoped identifiers.
//
// The relay assigns compact integer ids to players in join order (the first
// player to join is the host), numbers turns from 0, and each client numbers
// its own commands. These ids never appear inside command payloads; the game
// maps a `RelayPlayerId` to a company on its side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relay-assigned player id. Ids are never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelayPlayerId(pub u32);

impl fmt::Display for RelayPlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.0)
    }
}

/// Position of a turn in the session's global command order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnNumber(pub u64);

impl TurnNumber {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Per-player command counter. Within one turn the relay orders commands by
/// `(player, sequence)`, so a player's commands keep their send order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionSequence(pub u64);
