use crate::model::PlayMode;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Indices played during the current Random session, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RandomHistory {
    played: Vec<usize>,
}

impl RandomHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.played.len()
    }

    pub fn is_empty(&self) -> bool {
        self.played.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.played.contains(&index)
    }

    /// Appends `index` unless it is already recorded.
    pub fn push(&mut self, index: usize) {
        if !self.contains(index) {
            self.played.push(index);
        }
    }

    pub fn clear(&mut self) {
        self.played.clear();
    }

    /// Restarts the history with a single entry.
    pub fn seed(&mut self, index: usize) {
        self.played.clear();
        self.played.push(index);
    }

    pub fn entries(&self) -> &[usize] {
        &self.played
    }

    /// Removes and returns the second-to-last entry.
    pub fn pop_penultimate(&mut self) -> Option<usize> {
        let len = self.played.len();
        if len < 2 {
            return None;
        }
        Some(self.played.remove(len - 2))
    }
}

/// Chooses the track to move to, or `None` when the mode has nowhere to go.
///
/// `current` outside `0..size` is treated as no current track. Random
/// forward steps record their pick in `history`; Random backward steps
/// consume it.
pub fn target_index(
    mode: PlayMode,
    current: Option<usize>,
    size: usize,
    history: &mut RandomHistory,
    direction: Direction,
    rng: &mut SmallRng,
) -> Option<usize> {
    if size == 0 {
        return None;
    }
    let current = current.filter(|index| *index < size);

    match (mode, direction) {
        (PlayMode::Sequence, Direction::Next) => match current {
            Some(index) => (index + 1 < size).then_some(index + 1),
            None => Some(0),
        },
        (PlayMode::Sequence, Direction::Previous) => current?.checked_sub(1),
        (PlayMode::Loop, Direction::Next) => match current {
            Some(index) => Some((index + 1) % size),
            None => Some(0),
        },
        (PlayMode::Loop, Direction::Previous) => match current {
            Some(0) | None => Some(size - 1),
            Some(index) => Some(index - 1),
        },
        (PlayMode::SingleLoop, _) => Some(current.unwrap_or(0)),
        (PlayMode::Random, Direction::Next) => Some(random_next(current, size, history, rng)),
        (PlayMode::Random, Direction::Previous) => history.pop_penultimate(),
    }
}

fn random_next(
    current: Option<usize>,
    size: usize,
    history: &mut RandomHistory,
    rng: &mut SmallRng,
) -> usize {
    if history.len() >= size {
        history.clear();
    }

    let mut candidates: Vec<usize> = (0..size)
        .filter(|index| Some(*index) != current && !history.contains(*index))
        .collect();
    if candidates.is_empty() {
        history.clear();
        candidates = (0..size).filter(|index| Some(*index) != current).collect();
    }

    candidates.shuffle(rng);
    let pick = candidates.first().copied().or(current).unwrap_or(0);
    history.push(pick);
    pick
}
