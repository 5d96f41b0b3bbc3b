//! Reviewer candidate filtering and random selection.
//!
//! Filtering is deterministic and preserves roster order. Selection is
//! delegated to a [`ReviewerSelector`] that the services receive at
//! construction time, so tests can swap in a seeded or scripted selector.

use crate::models::User;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Mutex;

/// Eligible reviewer ids from `pool`, in pool order.
///
/// A user is eligible when active, not the author, and not in `exclude`.
pub fn filter_candidates(author_id: &str, exclude: &HashSet<&str>, pool: &[User]) -> Vec<String> {
    pool.iter()
        .filter(|u| u.is_active)
        .filter(|u| u.id != author_id)
        .filter(|u| !exclude.contains(u.id.as_str()))
        .map(|u| u.id.clone())
        .collect()
}

/// Picks a bounded subset of candidates without replacement.
pub trait ReviewerSelector: Send + Sync {
    /// Return up to `max` distinct candidates.
    ///
    /// When `candidates.len() <= max` every candidate is returned. Callers
    /// must not rely on the order of the result.
    fn select(&self, candidates: &[String], max: usize) -> Vec<String>;
}

/// Uniform selection using the thread-local RNG on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl ReviewerSelector for RandomSelector {
    fn select(&self, candidates: &[String], max: usize) -> Vec<String> {
        pick_random_subset(&mut rand::thread_rng(), candidates, max)
    }
}

/// Uniform selection from a seeded RNG, reproducible across runs.
#[derive(Debug)]
pub struct SeededSelector {
    rng: Mutex<StdRng>,
}

impl SeededSelector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ReviewerSelector for SeededSelector {
    fn select(&self, candidates: &[String], max: usize) -> Vec<String> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pick_random_subset(&mut *rng, candidates, max)
    }
}

fn pick_random_subset<R: Rng + ?Sized>(rng: &mut R, candidates: &[String], max: usize) -> Vec<String> {
    if max == 0 || candidates.is_empty() {
        return Vec::new();
    }
    if candidates.len() <= max {
        return candidates.to_vec();
    }
    candidates.choose_multiple(rng, max).cloned().collect()
}
