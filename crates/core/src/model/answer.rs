use crate::model::content::Entry;

/// Trim surrounding whitespace and lowercase.
///
/// Deliberately no diacritic folding: `" Caffè "` matches `"caffè"` but not
/// `"caffe"`, matching the behavior users already rely on.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Lock state of a single entry: unanswered, or locked by the first
/// submission. Locked entries reject further submissions until the group is
/// restarted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerState {
    Unanswered,
    Locked { correct: bool, submitted: String },
}

impl AnswerState {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, AnswerState::Locked { .. })
    }

    #[must_use]
    pub fn correct(&self) -> Option<bool> {
        match self {
            AnswerState::Unanswered => None,
            AnswerState::Locked { correct, .. } => Some(*correct),
        }
    }

    #[must_use]
    pub fn submitted(&self) -> Option<&str> {
        match self {
            AnswerState::Unanswered => None,
            AnswerState::Locked { submitted, .. } => Some(submitted),
        }
    }
}

impl Entry {
    /// Compare a submitted answer against the expected one.
    ///
    /// Free-text entries compare normalized forms; multiple-choice entries
    /// require the selected option to equal the expected option exactly.
    #[must_use]
    pub fn evaluate(&self, submitted: &str) -> bool {
        if self.is_multiple_choice() {
            submitted == self.expected
        } else {
            normalize_answer(submitted) == normalize_answer(&self.expected)
        }
    }
}
