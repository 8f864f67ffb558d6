// Replicated game state: the tile map, companies, towns, signs and settings.
//
// The map is stored as a flat `Vec<Tile>` indexed by `TileIndex` (row-major,
// `y * size_x + x`), giving O(1) access. Out-of-bounds lookups return `None`.
// Border tiles (x or y equal to 0 or the last row/column) exist but are off
// limits for most construction unless the command carries `ALL_TILES`.
//
// Companies, towns and signs live in `BTreeMap`s so iteration order, and
// therefore the serialized form and the checksum, is identical on every
// peer. `World::checksum()` hashes the serialized state with `FxHasher` and
// is what the relay compares to detect desyncs.
//
// `LocalState` holds per-peer data that is never replicated (bookmarks set
// by `LOCAL` commands). It is `#[serde(skip)]`, so it never feeds the
// checksum and peers may disagree on it freely.
//
// See also: `config.rs` for `GameConfig`, `executor.rs` which calls
// `apply_cost()` after a successful exec run, and the handler modules
// (`landscape.rs`, `road.rs`, `town.rs`, `sign.rs`, `company.rs`,
// `game.rs`) which mutate this state.
//
// **Critical constraint: determinism.** All mutations go through command
// handlers. Map generation draws from a `ChaCha8Rng` seeded by the host, so
// every peer builds the same map from the same seed.

use crate::config::{GameConfig, GameSettings};
use crate::cost::CommandCost;
use crate::types::{CompanyId, ExpensesType, Money, PauseMode, SignId, TileIndex, TownId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// What occupies a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Clear,
    Water,
    Road,
    House { town: TownId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    /// Terrain level; 0 is sea level.
    pub height: u8,
    /// Owner of the structure on the tile. `SPECTATOR` means unowned.
    pub owner: CompanyId,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            kind: TileKind::Clear,
            height: 1,
            owner: CompanyId::SPECTATOR,
        }
    }
}

/// Flat 2D tile grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    pub size_x: u32,
    pub size_y: u32,
    tiles: Vec<Tile>,
}

impl Map {
    /// A map of clear land at height 1.
    pub fn new(size_x: u32, size_y: u32) -> Self {
        Self {
            size_x,
            size_y,
            tiles: vec![Tile::default(); (size_x as usize) * (size_y as usize)],
        }
    }

    pub fn contains(&self, tile: TileIndex) -> bool {
        (tile.0 as usize) < self.tiles.len()
    }

    pub fn tile(&self, tile: TileIndex) -> Option<&Tile> {
        self.tiles.get(tile.0 as usize)
    }

    pub fn tile_mut(&mut self, tile: TileIndex) -> Option<&mut Tile> {
        self.tiles.get_mut(tile.0 as usize)
    }

    pub fn tile_xy(&self, x: u32, y: u32) -> Option<TileIndex> {
        (x < self.size_x && y < self.size_y).then(|| TileIndex::from_xy(x, y, self.size_x))
    }

    /// Whether the tile lies on the outermost ring of the map.
    pub fn is_border(&self, tile: TileIndex) -> bool {
        let x = tile.x(self.size_x);
        let y = tile.y(self.size_x);
        x == 0 || y == 0 || x + 1 >= self.size_x || y + 1 >= self.size_y
    }

    /// Manhattan distance between two tiles.
    pub fn distance_manhattan(&self, a: TileIndex, b: TileIndex) -> u32 {
        a.x(self.size_x).abs_diff(b.x(self.size_x)) + a.y(self.size_x).abs_diff(b.y(self.size_x))
    }

    /// The four orthogonal neighbours of a tile that lie on the map.
    pub fn neighbours(&self, tile: TileIndex) -> impl Iterator<Item = TileIndex> + '_ {
        let x = tile.x(self.size_x) as i64;
        let y = tile.y(self.size_x) as i64;
        [(0, -1), (1, 0), (0, 1), (-1, 0)]
            .into_iter()
            .filter_map(move |(dx, dy)| {
                let nx = u32::try_from(x + dx).ok()?;
                let ny = u32::try_from(y + dy).ok()?;
                self.tile_xy(nx, ny)
            })
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub money: Money,
    /// Running totals per ledger category.
    pub expenses: BTreeMap<ExpensesType, Money>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Town {
    pub name: String,
    pub center: TileIndex,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sign {
    pub tile: TileIndex,
    pub text: String,
    pub owner: CompanyId,
}

/// Per-peer state that is never replicated or checksummed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalState {
    /// Saved viewport locations, by slot.
    pub bookmarks: BTreeMap<u32, TileIndex>,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The complete game state that commands operate on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    pub config: GameConfig,
    pub map: Map,
    pub companies: BTreeMap<CompanyId, Company>,
    pub towns: BTreeMap<TownId, Town>,
    pub signs: BTreeMap<SignId, Sign>,
    next_town_id: u32,
    next_sign_id: u32,
    /// Live runtime settings, initialised from `config.settings`.
    pub settings: GameSettings,
    pub pause_mode: PauseMode,
    #[serde(skip)]
    pub local: LocalState,
}

impl World {
    /// A flat map of clear land with `config.company_count` companies, each
    /// holding the starting money.
    pub fn new(config: GameConfig) -> Self {
        let companies = (0..config.company_count)
            .map(|i| {
                (
                    CompanyId(i),
                    Company {
                        name: format!("Company {}", u32::from(i) + 1),
                        money: config.starting_money,
                        expenses: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self {
            map: Map::new(config.map_size_x, config.map_size_y),
            companies,
            towns: BTreeMap::new(),
            signs: BTreeMap::new(),
            next_town_id: 0,
            next_sign_id: 0,
            settings: config.settings.clone(),
            pause_mode: PauseMode::empty(),
            local: LocalState::default(),
            config,
        }
    }

    /// Generate the starting world from a host-chosen seed. Interior tiles
    /// become sea-level water with probability `water_per_mille / 1000`.
    pub fn generate(seed: u64, config: GameConfig) -> Self {
        let mut world = Self::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let water_per_mille = world.config.water_per_mille;
        for y in 1..world.map.size_y - 1 {
            for x in 1..world.map.size_x - 1 {
                if rng.gen_range(0..1000) < water_per_mille {
                    let idx = TileIndex::from_xy(x, y, world.map.size_x);
                    if let Some(tile) = world.map.tile_mut(idx) {
                        tile.kind = TileKind::Water;
                        tile.height = 0;
                    }
                }
            }
        }
        log::debug!(
            target: "switchyard::world",
            "generated {}x{} map from seed {seed}",
            world.map.size_x,
            world.map.size_y
        );
        world
    }

    pub fn company(&self, id: CompanyId) -> Option<&Company> {
        self.companies.get(&id)
    }

    pub fn company_mut(&mut self, id: CompanyId) -> Option<&mut Company> {
        self.companies.get_mut(&id)
    }

    /// Book a successful command result against the issuing company: the cost
    /// is subtracted from its money and added to the matching expense tally.
    /// Failed results and spectator issuers are ignored.
    pub fn apply_cost(&mut self, company: CompanyId, result: &CommandCost) {
        if result.failed() || result.cost() == 0 {
            return;
        }
        if let Some(c) = self.companies.get_mut(&company) {
            c.money = c.money.saturating_sub(result.cost());
            *c.expenses.entry(result.expense_type()).or_insert(0) += result.cost();
        }
    }

    /// Register a new town and return its id.
    pub fn add_town(&mut self, town: Town) -> TownId {
        let id = TownId(self.next_town_id);
        self.next_town_id += 1;
        self.towns.insert(id, town);
        id
    }

    /// Register a new sign and return its id.
    pub fn add_sign(&mut self, sign: Sign) -> SignId {
        let id = SignId(self.next_sign_id);
        self.next_sign_id += 1;
        self.signs.insert(id, sign);
        id
    }

    /// Id the next `add_sign()` will return. Lets a test run report the id
    /// without reserving it.
    pub fn peek_next_sign_id(&self) -> SignId {
        SignId(self.next_sign_id)
    }

    /// Deterministic hash of all replicated state.
    pub fn checksum(&self) -> u64 {
        let mut hasher = FxHasher::default();
        match serde_json::to_vec(self) {
            Ok(bytes) => hasher.write(&bytes),
            Err(e) => log::error!(target: "switchyard::world", "world serialization failed: {e}"),
        }
        hasher.finish()
    }
}
