//! 下一位发言人：按发言意愿加权随机

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::jury::AgentState;

/// 从除上一位发言人之外的陪审员中按 `speak_eagerness` 加权抽取；
/// 权重全为 0 时退化为均匀抽取。只有一名陪审员时允许连续发言。
pub fn choose_speaker<R: Rng + ?Sized>(
    agents: &[AgentState],
    previous: Option<usize>,
    rng: &mut R,
) -> Option<usize> {
    let mut candidates: Vec<usize> = (0..agents.len()).filter(|&i| Some(i) != previous).collect();
    if candidates.is_empty() {
        candidates = (0..agents.len()).collect();
    }
    if candidates.is_empty() {
        return None;
    }

    let weights = candidates.iter().map(|&i| agents[i].speak_eagerness);
    match WeightedIndex::new(weights) {
        Ok(dist) => Some(candidates[dist.sample(rng)]),
        Err(_) => candidates.choose(rng).copied(),
    }
}
