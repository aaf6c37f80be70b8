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

use anyhow::bail;
use frontier_common::{DEFAULT_MAX_FACTORIES, MAX_MAP_SIZE, WorldSettings, expand_env_vars};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub world: WorldSettings,
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorldConfigFile {
    map_size_min: Option<usize>,
    map_size_max: Option<usize>,
    max_factories: Option<usize>,
    bot_starting_energy: Option<i32>,
    seed: Option<u64>,
}

/// Read `WORLD_CONFIG_PATH` (YAML, `${VAR}` expanded) and the `WORLD_SEED`
/// override. Unreadable or malformed files fall back to defaults.
pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let file = load_world_config_file();
    let seed_override = std::env::var("WORLD_SEED")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    resolve_config(file, seed_override.as_deref())
}

fn load_world_config_file() -> WorldConfigFile {
    let Some(path) = std::env::var("WORLD_CONFIG_PATH")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    else {
        return WorldConfigFile::default();
    };

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(path = %path, error = %error, "failed to read world config file");
            return WorldConfigFile::default();
        }
    };

    if raw.trim().is_empty() {
        warn!(path = %path, "world config file is empty");
        return WorldConfigFile::default();
    }

    match parse_world_config(&raw) {
        Ok(parsed) => {
            info!(path = %path, "loaded world config");
            parsed
        }
        Err(error) => {
            warn!(path = %path, error = %error, "failed to parse world config yaml");
            WorldConfigFile::default()
        }
    }
}

fn parse_world_config(raw: &str) -> Result<WorldConfigFile, serde_yaml::Error> {
    serde_yaml::from_str(&expand_env_vars(raw))
}

fn resolve_config(
    file: WorldConfigFile,
    seed_override: Option<&str>,
) -> anyhow::Result<ServiceConfig> {
    let defaults = WorldSettings::default();
    let world = WorldSettings {
        map_size_min: file.map_size_min.unwrap_or(defaults.map_size_min),
        map_size_max: file.map_size_max.unwrap_or(defaults.map_size_max),
        max_factories: file.max_factories.unwrap_or(defaults.max_factories),
        bot_starting_energy: file
            .bot_starting_energy
            .unwrap_or(defaults.bot_starting_energy),
    };

    if world.map_size_min == 0 || world.map_size_min > world.map_size_max {
        bail!(
            "invalid map size range {}..={}",
            world.map_size_min,
            world.map_size_max
        );
    }

    if world.map_size_max > MAX_MAP_SIZE {
        bail!(
            "map_size_max {} exceeds the limit of {MAX_MAP_SIZE}",
            world.map_size_max
        );
    }

    if world.max_factories > DEFAULT_MAX_FACTORIES {
        bail!(
            "max_factories {} exceeds the limit of {DEFAULT_MAX_FACTORIES}",
            world.max_factories
        );
    }

    let seed = match seed_override {
        Some(value) => match value.parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(error) => {
                warn!(value = %value, error = %error, "ignoring invalid WORLD_SEED");
                file.seed
            }
        },
        None => file.seed,
    };

    Ok(ServiceConfig { world, seed })
}
