use thiserror::Error;

use crate::model::answer::AnswerState;
use crate::model::ids::{ContainerId, EntryId, GroupName};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatError {
    #[error("correct count ({correct}) exceeds total ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },
}

/// Correct/total counter pair with a floor-division percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    correct: u32,
    total: u32,
}

impl Stat {
    /// Build a stat, enforcing `correct <= total`.
    ///
    /// # Errors
    ///
    /// Returns `StatError::CorrectExceedsTotal` when the counts are
    /// inconsistent.
    pub fn new(correct: u32, total: u32) -> Result<Self, StatError> {
        if correct > total {
            return Err(StatError::CorrectExceedsTotal { correct, total });
        }
        Ok(Self { correct, total })
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// `floor(100 * correct / total)`, or 0 when the total is zero.
    #[must_use]
    pub fn pct(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        // correct <= total, so the quotient fits in u8.
        ((u64::from(self.correct) * 100) / u64::from(self.total)) as u8
    }

    /// Count one more entry, correct or not.
    pub fn record(&mut self, correct: bool) {
        self.total = self.total.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    /// Sum two stats.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            correct: self.correct.saturating_add(other.correct),
            total: self.total.saturating_add(other.total),
        }
    }
}

/// One row of the accuracy-by-container chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccuracyRow {
    pub label: String,
    pub percent: u8,
}

/// Persisted per-entry progress record, as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub attempted: bool,
    pub answer: String,
    pub correct: bool,
    pub container: Option<ContainerId>,
    pub group: GroupName,
    pub entry: EntryId,
}

impl ProgressRecord {
    /// Lock state this record pins: `attempted` locks the entry with the
    /// submission as it was typed.
    #[must_use]
    pub fn answer_state(&self) -> AnswerState {
        if self.attempted {
            AnswerState::Locked {
                correct: self.correct,
                submitted: self.answer.clone(),
            }
        } else {
            AnswerState::Unanswered
        }
    }
}
