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

//! Injectable source of randomness for every decision the world makes.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Uniform draws used by map generation, factory placement, bot building and
/// the action oracle.
pub trait RandomSource: Send {
    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform integer in `low..=high`.
    fn between(&mut self, low: i32, high: i32) -> i32;
}

/// [`RandomSource`] backed by [`StdRng`].
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl RandomSource for StdRandom {
    fn index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    fn between(&mut self, low: i32, high: i32) -> i32 {
        self.rng.random_range(low..=high)
    }
}
