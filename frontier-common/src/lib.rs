// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

mod random;
mod world;

pub use random::{RandomSource, StdRandom};
pub use world::{
    Grid, World, WorldError, WorldSettings, adjacent_cells, factory_zone, generate_map,
    place_factories, random_action,
};

pub const DEFAULT_MAP_SIZE_MIN: usize = 20;
pub const DEFAULT_MAP_SIZE_MAX: usize = 25;
pub const DEFAULT_MAX_FACTORIES: usize = 3;
/// Upper bound accepted for a configured map side.
pub const MAX_MAP_SIZE: usize = 256;
pub const DEFAULT_BOT_ENERGY: i32 = 100;

pub const INIT_MESSAGE: &str = "Game initialized";
pub const BUILD_MESSAGE: &str = "Engineer bot built";

/// All terrain labels, in the order the map generator draws from.
pub const ALL_TERRAINS: [Terrain; 5] = [
    Terrain::Plains,
    Terrain::Ocean,
    Terrain::Desert,
    Terrain::River,
    Terrain::Mountains,
];

pub type FactoryId = u32;
pub type BotId = u32;

/// `(x, y)` where `x` indexes the grid row and `y` the column.
///
/// Signed because bots built next to an edge factory may sit off the grid.
pub type Coord = (i32, i32);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Plains,
    Ocean,
    Desert,
    River,
    Mountains,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerType {
    Windmill,
    SolarPanels,
    Geothermal,
    Dam,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Factory {
    pub id: FactoryId,
    pub location: Coord,
    /// Reserved for a resource economy; always empty for now.
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bot {
    pub id: BotId,
    pub location: Coord,
    pub energy: i32,
}

/// Instruction handed back to a bot, serialized as `{"type": ..., "params": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotAction {
    Move {
        d_loc: [i32; 2],
    },
    Explore {},
    Deploy {
        power_type: PowerType,
        d_loc: [i32; 2],
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResponse {
    pub message: String,
    pub map_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildBotResponse {
    pub message: String,
    pub bot_id: BotId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapResponse {
    pub map: Grid,
}

/// Replace `${VAR_NAME}` patterns in a string with values from environment variables.
/// Unknown or unset variables are replaced with an empty string.
pub fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}
