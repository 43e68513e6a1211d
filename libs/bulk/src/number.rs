use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use phonebook_api::NewPhone;

use crate::config::GeneratorConfig;

/// Produces synthetic phone numbers: `prefix` followed by a random suffix.
#[derive(Debug, Clone)]
pub struct NumberSource {
    prefix: String,
    suffix_range: u32,
    seed: Option<u64>,
}

impl NumberSource {
    pub fn new(prefix: impl Into<String>, suffix_range: u32, seed: Option<u64>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix_range: suffix_range.max(1),
            seed,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.prefix.clone(), config.suffix_range, config.seed)
    }

    /// Fill `slots`, where `slots[0]` is batch index `start`.
    ///
    /// With a seed, the value of index `i` depends only on `(seed, i)`, so
    /// the batch comes out identical however the indices were split up.
    pub fn fill(&self, start: usize, slots: &mut [NewPhone]) {
        match self.seed {
            Some(seed) => {
                for (offset, slot) in slots.iter_mut().enumerate() {
                    let mut rng = StdRng::seed_from_u64(seed_for_index(seed, start + offset));
                    slot.number = self.number(&mut rng);
                }
            }
            None => {
                let mut rng = rand::rng();
                for slot in slots.iter_mut() {
                    slot.number = self.number(&mut rng);
                }
            }
        }
    }

    fn number(&self, rng: &mut impl Rng) -> String {
        format!("{}{}", self.prefix, rng.random_range(0..self.suffix_range))
    }
}

fn seed_for_index(seed: u64, index: usize) -> u64 {
    seed.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
