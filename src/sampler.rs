//! Seeded sampling of two overlapping hash sets.
//!
//! The population is first narrowed to a random union, a random part of the
//! union becomes the symmetric difference, and a random part of that is
//! assigned exclusively to the first set. Everything left in the union is
//! shared by both sets.

use std::collections::BTreeSet;
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::hash::ContentHash;
use crate::sizing::{SampleRequest, floor_product};

/// A set of sampled hashes.
pub type SampleSet = BTreeSet<ContentHash>;

/// Which draw ran short of candidates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Draw {
    /// Drawing the union from the population.
    Union,
    /// Drawing the symmetric difference from the union.
    SymmetricDifference,
    /// Drawing the first set's exclusive share from the symmetric difference.
    FirstOnly,
}

impl fmt::Display for Draw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Union => "union",
            Self::SymmetricDifference => "symmetric difference",
            Self::FirstOnly => "first-only share",
        };
        f.write_str(label)
    }
}

/// Errors raised by [`sample`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SampleError {
    /// A draw asked for more hashes than its source set holds.
    #[error("cannot draw {requested} hashes for the {draw} from {available}")]
    InsufficientPopulation {
        /// The draw that failed.
        draw: Draw,
        /// Number of hashes requested.
        requested: usize,
        /// Number of hashes available to draw from.
        available: usize,
    },
}

/// The two sampled target sets.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SamplePair {
    /// Target set for the first directory.
    pub first: SampleSet,
    /// Target set for the second directory.
    pub second: SampleSet,
}

impl SamplePair {
    /// Hashes held by at least one side.
    #[must_use]
    pub fn union(&self) -> SampleSet {
        self.first.union(&self.second).cloned().collect()
    }

    /// Hashes held by exactly one side.
    #[must_use]
    pub fn symmetric_difference(&self) -> SampleSet {
        self.first
            .symmetric_difference(&self.second)
            .cloned()
            .collect()
    }

    /// Hashes held by both sides.
    #[must_use]
    pub fn intersection(&self) -> SampleSet {
        self.first.intersection(&self.second).cloned().collect()
    }
}

/// Seed for the sampling generator.
///
/// Any string is accepted; the generator is seeded with the BLAKE3 digest of
/// its bytes so the same string always yields the same samples.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Seed(String);

impl Seed {
    /// Wraps an operator-supplied seed value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Draws a fresh numeric seed from the thread-local generator.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<u64>().to_string())
    }

    /// The seed value as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the deterministic generator for this seed.
    #[must_use]
    pub fn rng(&self) -> StdRng {
        StdRng::from_seed(*blake3::hash(self.0.as_bytes()).as_bytes())
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn draw<R: Rng + ?Sized>(
    rng: &mut R,
    from: &[ContentHash],
    amount: usize,
    stage: Draw,
) -> Result<Vec<ContentHash>, SampleError> {
    if amount > from.len() {
        return Err(SampleError::InsufficientPopulation {
            draw: stage,
            requested: amount,
            available: from.len(),
        });
    }
    Ok(index::sample(rng, from.len(), amount)
        .into_iter()
        .filter_map(|position| from.get(position).cloned())
        .collect())
}

/// Partitions `population` into two overlapping sets.
///
/// The result satisfies `|first ∪ second| = union_size`,
/// `|first Δ second| = symdiff_size` and
/// `|first − second| = floor(diff_ratio × symdiff_size)`. The same generator
/// state and population order always give the same pair.
///
/// # Errors
///
/// Returns [`SampleError::InsufficientPopulation`] when any draw exceeds the
/// set it is drawn from.
pub fn sample<R: Rng + ?Sized>(
    population: &[ContentHash],
    request: &SampleRequest,
    rng: &mut R,
) -> Result<SamplePair, SampleError> {
    let union = draw(rng, population, request.union_size, Draw::Union)?;
    let symdiff = draw(
        rng,
        &union,
        request.symdiff_size,
        Draw::SymmetricDifference,
    )?;
    let first_only_size = floor_product(request.symdiff_size, request.diff_ratio);
    let first_only: SampleSet = draw(rng, &symdiff, first_only_size, Draw::FirstOnly)?
        .into_iter()
        .collect();

    let symdiff_set: SampleSet = symdiff.into_iter().collect();
    let shared: SampleSet = union
        .into_iter()
        .filter(|hash| !symdiff_set.contains(hash))
        .collect();

    let first = first_only.union(&shared).cloned().collect();
    let second = symdiff_set
        .difference(&first_only)
        .chain(shared.iter())
        .cloned()
        .collect();
    Ok(SamplePair { first, second })
}
