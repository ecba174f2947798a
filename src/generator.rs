use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tsify::Tsify;

use crate::catalog::PieceDef;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Tsify, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A catalog shape dealt into the active set under its own id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PieceInstance {
    pub id: PieceId,
    pub def: &'static PieceDef,
}

/// Chooses which catalog entry to deal next.
pub trait Randomizer {
    fn pick(&mut self, catalog_len: usize) -> usize;
}

/// Independent uniform draws, with replacement.
pub struct UniformRandom {
    rng: StdRng,
}

impl UniformRandom {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl Randomizer for UniformRandom {
    fn pick(&mut self, catalog_len: usize) -> usize {
        self.rng.gen_range(0..catalog_len.max(1))
    }
}

/// Replays a fixed list of catalog indices, wrapping at the end.
pub struct Cycle {
    order: Vec<usize>,
    cursor: usize,
}

impl Cycle {
    pub fn new(order: Vec<usize>) -> Self {
        Self { order, cursor: 0 }
    }
}

impl Randomizer for Cycle {
    fn pick(&mut self, catalog_len: usize) -> usize {
        if self.order.is_empty() || catalog_len == 0 {
            return 0;
        }
        let idx = self.order[self.cursor % self.order.len()];
        self.cursor = self.cursor.wrapping_add(1);
        idx % catalog_len
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Tsify, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RandomizerKind {
    Uniform {
        #[serde(default)]
        seed: Option<u64>,
    },
    Cycle {
        order: Vec<usize>,
    },
}

impl Default for RandomizerKind {
    fn default() -> Self {
        RandomizerKind::Uniform { seed: None }
    }
}

pub fn randomizer_from_kind(kind: &RandomizerKind) -> Box<dyn Randomizer> {
    match kind {
        RandomizerKind::Uniform { seed } => Box::new(UniformRandom::new(*seed)),
        RandomizerKind::Cycle { order } => Box::new(Cycle::new(order.clone())),
    }
}

/// Deals batches of fresh piece instances from a catalog.
///
/// Knows nothing about the board: a batch that cannot be placed is left for
/// the game-over check to notice.
pub struct PieceSetGenerator {
    catalog: &'static [PieceDef],
    randomizer: Box<dyn Randomizer>,
    next_id: u32,
}

impl PieceSetGenerator {
    pub fn new(catalog: &'static [PieceDef], randomizer: Box<dyn Randomizer>) -> Self {
        Self {
            catalog,
            randomizer,
            next_id: 1,
        }
    }

    pub fn generate_set(&mut self, count: usize) -> Vec<PieceInstance> {
        if self.catalog.is_empty() {
            return Vec::new();
        }
        (0..count)
            .map(|_| {
                let idx = self.randomizer.pick(self.catalog.len()).min(self.catalog.len() - 1);
                let id = PieceId(self.next_id);
                self.next_id = self.next_id.wrapping_add(1);
                PieceInstance {
                    id,
                    def: &self.catalog[idx],
                }
            })
            .collect()
    }
}
