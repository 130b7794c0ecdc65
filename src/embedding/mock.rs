//! Deterministic mock embedder for tests and demos
//!
//! Each word token maps to a unit vector drawn from an RNG seeded by the
//! token's hash; a text embeds to the normalized sum of its token vectors.
//! Identical texts always embed identically, and texts sharing words land
//! closer together, which is enough structure for ranking scenarios
//! without a model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::embedding::Embedder;
use crate::errors::Result;

const DEFAULT_DIMENSION: usize = 128;

/// Hash-seeded pseudo-random embedder
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());

        let mut v: Vec<f32> = (0..self.dimension).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut sum = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let tv = self.token_vector(&token);
            for (s, t) in sum.iter_mut().zip(tv.iter()) {
                *s += t;
            }
        }

        let norm = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut sum {
                *x /= norm;
            }
        }
        Ok(sum)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
