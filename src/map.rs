//! Battle grids: immutable terrain, derived tile views and the stock maps.

use crate::errors::ConfigError;
use crate::unit::{Unit, UnitId};
use rand::Rng;
use schema::{Position, Terrain};
use std::sync::Arc;
use tracing::info;

/// Read-only view of one grid square.
///
/// Tiles are derived on demand: terrain from the map, occupant from the unit
/// registry, flags from the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    pub terrain: Terrain,
    pub occupant: Option<UnitId>,
    pub highlighted: bool,
    pub selectable: bool,
}

/// Grid queries the planner and resolver need.
pub trait MapAccessor {
    fn tile(&self, position: Position) -> Option<Tile>;

    fn is_valid_position(&self, position: Position) -> bool;

    fn unit_at(&self, position: Position) -> Option<&Unit>;

    fn terrain_at(&self, position: Position) -> Option<Terrain> {
        self.tile(position).map(|tile| tile.terrain)
    }
}

/// Row-major terrain. Cloning shares the terrain buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleMap {
    width: usize,
    height: usize,
    terrain: Arc<[Terrain]>,
}

impl BattleMap {
    pub fn filled(width: usize, height: usize, terrain: Terrain) -> Self {
        Self::from_fn(width, height, |_| terrain)
    }

    pub fn from_fn(width: usize, height: usize, mut terrain_at: impl FnMut(Position) -> Terrain) -> Self {
        let mut terrain = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                terrain.push(terrain_at(Position::new(x as i32, y as i32)));
            }
        }
        Self {
            width,
            height,
            terrain: terrain.into(),
        }
    }

    pub fn from_rows(rows: Vec<Vec<Terrain>>) -> Result<Self, ConfigError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(ConfigError::Invalid("map must have at least one tile".to_string()));
        }
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(ConfigError::Invalid(format!(
                "row {} has {} tiles, expected {}",
                y,
                row.len(),
                width
            )));
        }
        Ok(Self {
            width,
            height,
            terrain: rows.into_iter().flatten().collect(),
        })
    }

    /// Parse a character layout, one line per row:
    /// `.` plain, `,` grass, `~` water, `^` mountain, `T` forest.
    pub fn from_ascii(layout: &str) -> Result<Self, ConfigError> {
        let rows = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.chars()
                    .map(|c| match c {
                        '.' => Ok(Terrain::Plain),
                        ',' => Ok(Terrain::Grass),
                        '~' => Ok(Terrain::Water),
                        '^' => Ok(Terrain::Mountain),
                        'T' => Ok(Terrain::Forest),
                        other => Err(ConfigError::Invalid(format!("unknown terrain '{}'", other))),
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(rows)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as usize) < self.width
            && (position.y as usize) < self.height
    }

    pub fn terrain(&self, position: Position) -> Option<Terrain> {
        if !self.contains(position) {
            return None;
        }
        self.terrain
            .get(position.y as usize * self.width + position.x as usize)
            .copied()
    }

    /// All positions, row by row.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| Position::new(x as i32, y as i32))
        })
    }

    pub fn shares_terrain_with(&self, other: &BattleMap) -> bool {
        Arc::ptr_eq(&self.terrain, &other.terrain)
    }
}

/// Bare terrain has no occupants and nothing highlighted.
impl MapAccessor for BattleMap {
    fn tile(&self, position: Position) -> Option<Tile> {
        self.terrain(position).map(|terrain| Tile {
            position,
            terrain,
            occupant: None,
            highlighted: false,
            selectable: true,
        })
    }

    fn is_valid_position(&self, position: Position) -> bool {
        self.contains(position)
    }

    fn unit_at(&self, _position: Position) -> Option<&Unit> {
        None
    }
}

/// A stock battlefield and its lobby metadata.
#[derive(Debug, Clone, Copy)]
pub struct MapConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub recommended_level: Option<u8>,
    pub suggested_team_size: Option<u8>,
    generator: fn() -> BattleMap,
}

impl MapConfig {
    pub fn build(&self) -> BattleMap {
        (self.generator)()
    }
}

const STOCK_MAP_SIZE: usize = 8;

/// Central valley ringed by mountains and forest, with a lake in the middle.
pub fn valley_map() -> BattleMap {
    BattleMap::from_fn(STOCK_MAP_SIZE, STOCK_MAP_SIZE, |Position { x, y }| {
        if (x == 0 || x == 7) && y > 1 && y < 6 {
            Terrain::Mountain
        } else if (y == 0 || y == 7) && x > 1 && x < 6 {
            Terrain::Forest
        } else if x == 3 && y == 3 {
            Terrain::Water
        } else if y > 2 && y < 5 && x > 2 && x < 5 {
            Terrain::Grass
        } else {
            Terrain::Plain
        }
    })
}

/// A river split in two reaches, crossable at (3, 3).
pub fn river_map() -> BattleMap {
    BattleMap::from_fn(STOCK_MAP_SIZE, STOCK_MAP_SIZE, |Position { x, y }| {
        if (x == 2 && y < 4) || (x == 4 && y > 3) {
            Terrain::Water
        } else if x == 3 && y == 3 {
            Terrain::Plain
        } else if x < 2 && y < 2 {
            Terrain::Forest
        } else if x > 5 && y > 5 {
            Terrain::Mountain
        } else if (x + y) % 3 == 0 {
            Terrain::Grass
        } else {
            Terrain::Plain
        }
    })
}

/// Mountain keep behind forest walls, surrounded by a moat.
pub fn fortress_map() -> BattleMap {
    BattleMap::from_fn(STOCK_MAP_SIZE, STOCK_MAP_SIZE, |Position { x, y }| {
        if (x == 3 || x == 4) && (y == 3 || y == 4) {
            Terrain::Mountain
        } else if ((x == 2 || x == 5) && (2..=5).contains(&y))
            || ((y == 2 || y == 5) && (2..=5).contains(&x))
        {
            Terrain::Forest
        } else if x == 0 || x == 7 || y == 0 || y == 7 {
            Terrain::Water
        } else {
            Terrain::Grass
        }
    })
}

pub static PREDEFINED_MAPS: [MapConfig; 3] = [
    MapConfig {
        id: "valley",
        name: "Valley of Decisions",
        description: "A strategic valley surrounded by mountains and forests, with a central lake creating choke points.",
        recommended_level: Some(1),
        suggested_team_size: Some(4),
        generator: valley_map,
    },
    MapConfig {
        id: "river",
        name: "River Crossing",
        description: "A winding river divides the map, with a crucial crossing point in the center.",
        recommended_level: Some(3),
        suggested_team_size: Some(5),
        generator: river_map,
    },
    MapConfig {
        id: "fortress",
        name: "Ancient Fortress",
        description: "A mountain fortress protected by forest walls and a water moat.",
        recommended_level: Some(5),
        suggested_team_size: Some(6),
        generator: fortress_map,
    },
];

pub fn map_by_id(id: &str) -> Option<&'static MapConfig> {
    PREDEFINED_MAPS.iter().find(|config| config.id == id)
}

pub fn select_random_map<R: Rng + ?Sized>(rng: &mut R) -> &'static MapConfig {
    let config = &PREDEFINED_MAPS[rng.random_range(0..PREDEFINED_MAPS.len())];
    info!(map = config.name, "selected map");
    config
}
