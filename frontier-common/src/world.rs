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

use std::{collections::BTreeMap, ops::Range};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    ALL_TERRAINS, Bot, BotAction, BotId, Coord, DEFAULT_BOT_ENERGY, DEFAULT_MAP_SIZE_MAX,
    DEFAULT_MAP_SIZE_MIN, DEFAULT_MAX_FACTORIES, Factory, FactoryId, PowerType, Terrain,
    random::RandomSource,
};

pub type Grid = Vec<Vec<Terrain>>;

/// Axis offsets for the four cells next to a location.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSettings {
    pub map_size_min: usize,
    pub map_size_max: usize,
    pub max_factories: usize,
    pub bot_starting_energy: i32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            map_size_min: DEFAULT_MAP_SIZE_MIN,
            map_size_max: DEFAULT_MAP_SIZE_MAX,
            max_factories: DEFAULT_MAX_FACTORIES,
            bot_starting_energy: DEFAULT_BOT_ENERGY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("Factory not found")]
    FactoryNotFound(FactoryId),
    #[error("Bot not found")]
    BotNotFound(BotId),
}

/// Grid, factories and bots for one simulation, plus the random source that
/// drives every decision.
///
/// The map size is drawn once when the world is created and reused by every
/// later [`World::initialize`].
pub struct World {
    settings: WorldSettings,
    rng: Box<dyn RandomSource>,
    map_size: usize,
    grid: Grid,
    factories: BTreeMap<FactoryId, Factory>,
    bots: BTreeMap<BotId, Bot>,
    initialized_at: Option<DateTime<Utc>>,
}

impl World {
    pub fn new(settings: WorldSettings, mut rng: Box<dyn RandomSource>) -> Self {
        let span = settings.map_size_max.saturating_sub(settings.map_size_min) + 1;
        let map_size = settings.map_size_min + rng.index(span);

        Self {
            settings,
            rng,
            map_size,
            grid: Vec::new(),
            factories: BTreeMap::new(),
            bots: BTreeMap::new(),
            initialized_at: None,
        }
    }

    /// Regenerate the grid and factories, dropping every existing bot.
    /// Returns the map size.
    pub fn initialize(&mut self) -> usize {
        self.grid = generate_map(self.map_size, self.rng.as_mut());
        let max_factories = self.settings.max_factories;
        self.factories = place_factories(&self.grid, max_factories, self.rng.as_mut())
            .into_iter()
            .map(|factory| (factory.id, factory))
            .collect();
        self.bots.clear();
        self.initialized_at = Some(Utc::now());
        self.map_size
    }

    pub fn build_bot(&mut self, factory_id: FactoryId) -> Result<BotId, WorldError> {
        let factory = self
            .factories
            .get(&factory_id)
            .ok_or(WorldError::FactoryNotFound(factory_id))?;

        let cells = adjacent_cells(factory.location);
        // Not clamped to the grid bounds.
        let location = cells[self.rng.index(cells.len())];

        let bot_id = self.bots.len() as BotId;
        self.bots.insert(
            bot_id,
            Bot {
                id: bot_id,
                location,
                energy: self.settings.bot_starting_energy,
            },
        );
        Ok(bot_id)
    }

    /// Pick an action for the bot. The bot's own state does not influence the choice.
    pub fn decide_action(&mut self, bot_id: BotId) -> Result<BotAction, WorldError> {
        if !self.bots.contains_key(&bot_id) {
            return Err(WorldError::BotNotFound(bot_id));
        }
        Ok(random_action(self.rng.as_mut()))
    }

    pub fn map_size(&self) -> usize {
        self.map_size
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn factory(&self, factory_id: FactoryId) -> Option<&Factory> {
        self.factories.get(&factory_id)
    }

    pub fn factories(&self) -> impl Iterator<Item = &Factory> {
        self.factories.values()
    }

    pub fn bot(&self, bot_id: BotId) -> Option<&Bot> {
        self.bots.get(&bot_id)
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    pub fn initialized_at(&self) -> Option<DateTime<Utc>> {
        self.initialized_at
    }
}

pub fn generate_map(size: usize, rng: &mut dyn RandomSource) -> Grid {
    let mut grid = vec![vec![Terrain::Plains; size]; size];
    for row in &mut grid {
        for cell in row {
            *cell = ALL_TERRAINS[rng.index(ALL_TERRAINS.len())];
        }
    }
    grid
}

/// Rows and columns eligible for factories: a square of side roughly `size / 2`
/// around the center. The upper bound is exclusive, so odd sizes sit one cell
/// off center.
///
/// Placed factories are at least `size / 4` cells from every edge, so bots built
/// from them stay on the grid even though [`World::build_bot`] never clamps.
pub fn factory_zone(size: usize) -> Range<usize> {
    let center = size / 2;
    let half = size / 4;
    (center - half)..(center + half)
}

/// Sample up to `max` distinct plains cells inside [`factory_zone`] without
/// replacement. Ids are assigned from 0 in placement order.
pub fn place_factories(grid: &Grid, max: usize, rng: &mut dyn RandomSource) -> Vec<Factory> {
    let zone = factory_zone(grid.len());
    let mut candidates: Vec<Coord> = Vec::new();
    for x in zone.clone() {
        for y in zone.clone() {
            if grid[x].get(y) == Some(&Terrain::Plains) {
                candidates.push((x as i32, y as i32));
            }
        }
    }

    let mut factories = Vec::new();
    while factories.len() < max && !candidates.is_empty() {
        let location = candidates.remove(rng.index(candidates.len()));
        factories.push(Factory {
            id: factories.len() as FactoryId,
            location,
            inventory: BTreeMap::new(),
        });
    }
    factories
}

/// The four axis neighbours of `(x, y)`. No bounds check.
pub fn adjacent_cells((x, y): Coord) -> [Coord; 4] {
    NEIGHBOR_OFFSETS.map(|(dx, dy)| (x + dx, y + dy))
}

pub fn random_action(rng: &mut dyn RandomSource) -> BotAction {
    match rng.index(3) {
        0 => BotAction::Move {
            d_loc: random_delta(rng),
        },
        1 => BotAction::Explore {},
        _ => BotAction::Deploy {
            power_type: PowerType::SolarPanels,
            d_loc: random_delta(rng),
        },
    }
}

fn random_delta(rng: &mut dyn RandomSource) -> [i32; 2] {
    [rng.between(-1, 1), rng.between(-1, 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::StdRandom;
    use std::collections::{HashSet, VecDeque};

    /// Replays fixed draws; index draws are reduced modulo `len`.
    #[derive(Default)]
    struct ScriptedRandom {
        indices: VecDeque<usize>,
        values: VecDeque<i32>,
    }

    impl ScriptedRandom {
        fn new(indices: &[usize], values: &[i32]) -> Self {
            Self {
                indices: indices.iter().copied().collect(),
                values: values.iter().copied().collect(),
            }
        }
    }

    impl RandomSource for ScriptedRandom {
        fn index(&mut self, len: usize) -> usize {
            self.indices.pop_front().unwrap_or(0) % len
        }

        fn between(&mut self, low: i32, high: i32) -> i32 {
            self.values.pop_front().unwrap_or(low).clamp(low, high)
        }
    }

    fn seeded_world(seed: u64) -> World {
        World::new(WorldSettings::default(), Box::new(StdRandom::seeded(seed)))
    }

    fn uniform_grid(size: usize, terrain: Terrain) -> Grid {
        vec![vec![terrain; size]; size]
    }

    #[test]
    fn generated_map_is_square_with_known_labels_for_every_size() {
        let mut rng = StdRandom::seeded(11);
        for size in DEFAULT_MAP_SIZE_MIN..=DEFAULT_MAP_SIZE_MAX {
            let grid = generate_map(size, &mut rng);
            assert_eq!(grid.len(), size);
            for row in &grid {
                assert_eq!(row.len(), size);
                for cell in row {
                    assert!(ALL_TERRAINS.contains(cell));
                }
            }
        }
    }

    #[test]
    fn map_size_is_drawn_from_configured_range() {
        for seed in 0..50 {
            let world = seeded_world(seed);
            assert!((DEFAULT_MAP_SIZE_MIN..=DEFAULT_MAP_SIZE_MAX).contains(&world.map_size()));
        }
    }

    #[test]
    fn map_size_is_kept_across_reinitialization() {
        let mut world = seeded_world(5);
        let first = world.initialize();
        let second = world.initialize();
        assert_eq!(first, second);
        assert_eq!(world.grid().len(), first);
    }

    #[test]
    fn factory_zone_is_central_and_half_wide() {
        assert_eq!(factory_zone(20), 5..15);
        assert_eq!(factory_zone(21), 5..15);
        assert_eq!(factory_zone(23), 6..16);
        assert_eq!(factory_zone(25), 6..18);
        assert!(factory_zone(1).is_empty());
    }

    #[test]
    fn factories_sit_on_distinct_plains_inside_zone() {
        for seed in 0..30 {
            let mut world = seeded_world(seed);
            let size = world.initialize();
            let zone = factory_zone(size);
            let factories: Vec<&Factory> = world.factories().collect();
            assert!(factories.len() <= DEFAULT_MAX_FACTORIES);

            let mut seen = HashSet::new();
            for (expected_id, factory) in factories.iter().enumerate() {
                assert_eq!(factory.id, expected_id as FactoryId);
                assert!(factory.inventory.is_empty());
                let (x, y) = factory.location;
                assert!(zone.contains(&(x as usize)) && zone.contains(&(y as usize)));
                assert_eq!(world.grid()[x as usize][y as usize], Terrain::Plains);
                assert!(seen.insert(factory.location));
            }
        }
    }

    #[test]
    fn no_plains_means_no_factories() {
        let grid = uniform_grid(20, Terrain::Ocean);
        let mut rng = StdRandom::seeded(0);
        assert!(place_factories(&grid, 3, &mut rng).is_empty());
    }

    #[test]
    fn fewer_plains_than_cap_places_all_of_them() {
        let mut grid = uniform_grid(20, Terrain::Desert);
        grid[6][7] = Terrain::Plains;
        grid[12][9] = Terrain::Plains;
        // Outside the central zone, never eligible.
        grid[0][0] = Terrain::Plains;

        let mut rng = StdRandom::seeded(9);
        let factories = place_factories(&grid, 3, &mut rng);
        let locations: HashSet<Coord> = factories.iter().map(|f| f.location).collect();
        assert_eq!(locations, HashSet::from([(6, 7), (12, 9)]));
    }

    #[test]
    fn placement_samples_without_replacement() {
        let grid = uniform_grid(20, Terrain::Plains);
        // Candidates are scanned row-major over 5..15; repeated index 0 must
        // still yield three different cells.
        let mut rng = ScriptedRandom::new(&[0, 0, 0], &[]);
        let factories = place_factories(&grid, 3, &mut rng);
        let locations: Vec<Coord> = factories.iter().map(|f| f.location).collect();
        assert_eq!(locations, vec![(5, 5), (5, 6), (5, 7)]);
    }

    #[test]
    fn adjacent_cells_are_axis_neighbours_without_clamping() {
        assert_eq!(adjacent_cells((0, 3)), [(-1, 3), (1, 3), (0, 2), (0, 4)]);
    }

    #[test]
    fn build_on_unknown_factory_fails() {
        let mut world = seeded_world(1);
        assert_eq!(world.build_bot(99), Err(WorldError::FactoryNotFound(99)));
        world.initialize();
        assert_eq!(world.build_bot(99), Err(WorldError::FactoryNotFound(99)));
        assert_eq!(WorldError::FactoryNotFound(99).to_string(), "Factory not found");
    }

    #[test]
    fn built_bots_get_sequential_ids_next_to_factory() {
        let mut world = World::new(
            WorldSettings::default(),
            Box::new(ScriptedRandom::default()),
        );
        // Scripted zeros: every cell is plains, so the first candidate wins.
        world.initialize();
        let factory = world.factory(0).cloned().unwrap();
        let neighbours = adjacent_cells(factory.location);

        for expected in 0..4 {
            let bot_id = world.build_bot(0).unwrap();
            assert_eq!(bot_id, expected);
            let bot = world.bot(bot_id).unwrap();
            assert!(neighbours.contains(&bot.location));
            assert_eq!(bot.energy, DEFAULT_BOT_ENERGY);
        }
        assert_eq!(world.bot_count(), 4);
    }

    #[test]
    fn build_uses_scripted_neighbour() {
        let mut world = World::new(
            WorldSettings {
                map_size_min: 20,
                map_size_max: 20,
                ..WorldSettings::default()
            },
            Box::new(ScriptedRandom::new(&[0], &[])),
        );
        world.initialize();
        let (x, y) = world.factory(0).unwrap().location;
        // Exhausted script falls back to index 0, the (-1, 0) neighbour.
        let bot_id = world.build_bot(0).unwrap();
        assert_eq!(world.bot(bot_id).unwrap().location, (x - 1, y));
    }

    #[test]
    fn starting_energy_follows_settings() {
        let mut world = World::new(
            WorldSettings {
                bot_starting_energy: 42,
                ..WorldSettings::default()
            },
            Box::new(ScriptedRandom::default()),
        );
        world.initialize();
        let bot_id = world.build_bot(0).unwrap();
        assert_eq!(world.bot(bot_id).unwrap().energy, 42);
    }

    #[test]
    fn reinitialization_discards_bots() {
        let mut world = World::new(
            WorldSettings::default(),
            Box::new(ScriptedRandom::default()),
        );
        world.initialize();
        world.build_bot(0).unwrap();
        world.build_bot(0).unwrap();
        assert!(world.initialized_at().is_some());

        world.initialize();
        assert_eq!(world.bot_count(), 0);
        assert_eq!(world.build_bot(0), Ok(0));
    }

    #[test]
    fn world_error_is_a_std_error_with_wire_messages() {
        let errors: [Box<dyn std::error::Error>; 2] = [
            Box::new(WorldError::FactoryNotFound(1)),
            Box::new(WorldError::BotNotFound(2)),
        ];
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, ["Factory not found", "Bot not found"]);
    }

    #[test]
    fn build_next_to_edge_factory_may_leave_the_grid() {
        let mut world = World::new(
            WorldSettings::default(),
            Box::new(ScriptedRandom::default()),
        );
        world.initialize();
        world.factories.insert(
            7,
            Factory {
                id: 7,
                location: (0, 0),
                inventory: BTreeMap::new(),
            },
        );

        // Index 0 picks the (-1, 0) neighbour, one row above the grid.
        let bot_id = world.build_bot(7).unwrap();
        assert_eq!(world.bot(bot_id).unwrap().location, (-1, 0));
    }

    #[test]
    fn action_for_unknown_bot_fails() {
        let mut world = seeded_world(2);
        world.initialize();
        assert_eq!(world.decide_action(0), Err(WorldError::BotNotFound(0)));
        assert_eq!(WorldError::BotNotFound(0).to_string(), "Bot not found");
    }

    #[test]
    fn scripted_actions_cover_every_template() {
        let mut rng = ScriptedRandom::new(&[0, 1, 2], &[-1, 1, 0, -1]);
        assert_eq!(random_action(&mut rng), BotAction::Move { d_loc: [-1, 1] });
        assert_eq!(random_action(&mut rng), BotAction::Explore {});
        assert_eq!(
            random_action(&mut rng),
            BotAction::Deploy {
                power_type: PowerType::SolarPanels,
                d_loc: [0, -1],
            }
        );
    }

    #[test]
    fn random_actions_have_well_formed_params() {
        let mut rng = StdRandom::seeded(21);
        let mut kinds = HashSet::new();
        for _ in 0..300 {
            match random_action(&mut rng) {
                BotAction::Move { d_loc } => {
                    assert!(d_loc.iter().all(|d| (-1..=1).contains(d)));
                    kinds.insert("MOVE");
                }
                BotAction::Explore {} => {
                    kinds.insert("EXPLORE");
                }
                BotAction::Deploy { power_type, d_loc } => {
                    assert_eq!(power_type, PowerType::SolarPanels);
                    assert!(d_loc.iter().all(|d| (-1..=1).contains(d)));
                    kinds.insert("DEPLOY");
                }
            }
        }
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn deciding_an_action_leaves_bot_untouched() {
        let mut world = World::new(
            WorldSettings::default(),
            Box::new(ScriptedRandom::default()),
        );
        world.initialize();
        let bot_id = world.build_bot(0).unwrap();
        let before = world.bot(bot_id).cloned();
        for _ in 0..10 {
            world.decide_action(bot_id).unwrap();
        }
        assert_eq!(world.bot(bot_id).cloned(), before);
    }
}
