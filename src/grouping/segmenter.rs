//! Cohort segmentation.
//!
//! Partitions a class's learners into fixed-size cohorts after a uniform
//! Fisher-Yates shuffle. The partition is exact: every learner lands in
//! exactly one cohort, and only the last cohort may be short.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

/// Default cohort size.
pub const DEFAULT_GROUP_SIZE: usize = 6;

/// Partitions `learners` into shuffled cohorts of at most `size` members.
///
/// Empty input yields an empty list. A `size` of zero is treated as one.
pub fn segment(learners: &[Uuid], size: usize) -> Vec<Vec<Uuid>> {
    let mut rng = rand::rng();
    segment_with_rng(learners, size, &mut rng)
}

/// Seeded variant of [`segment`] for reproducing a recorded grouping.
pub fn segment_seeded(learners: &[Uuid], size: usize, seed: u64) -> Vec<Vec<Uuid>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    segment_with_rng(learners, size, &mut rng)
}

fn segment_with_rng<R: rand::Rng>(learners: &[Uuid], size: usize, rng: &mut R) -> Vec<Vec<Uuid>> {
    if learners.is_empty() {
        return Vec::new();
    }

    let size = size.max(1);
    let mut shuffled = learners.to_vec();
    shuffled.shuffle(rng);

    shuffled.chunks(size).map(|chunk| chunk.to_vec()).collect()
}
