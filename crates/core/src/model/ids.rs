use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of an authenticated user (the backend uid).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a course document.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(String);

impl CourseId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a content container: a quiz or exam document.
///
/// Lesson groups hang directly off the course document and carry no
/// separate container id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix of ordinal container ids (`quiz_3` -> 3).
    #[must_use]
    pub fn numeric_suffix(&self) -> Option<u32> {
        numeric_suffix(&self.0)
    }
}

/// Identifier of a single entry (lesson, quiz task, exam item).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(String);

impl EntryId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CourseId({})", self.0)
    }
}

impl fmt::Debug for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerId({})", self.0)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("level tag cannot be blank")]
    Blank,
}

/// Course level tag (`a1`, `a2`, ...), lowercased canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Level(String);

impl Level {
    /// Build a level tag, trimming and lowercasing the input.
    ///
    /// # Errors
    ///
    /// Returns `LevelError::Blank` if the tag is empty after trimming.
    pub fn new(tag: impl AsRef<str>) -> Result<Self, LevelError> {
        let tag = tag.as_ref().trim().to_lowercase();
        if tag.is_empty() {
            return Err(LevelError::Blank);
        }
        Ok(Self(tag))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Level {
    /// The entry level assigned to users without an explicit level field.
    fn default() -> Self {
        Self("a1".to_string())
    }
}

impl FromStr for Level {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── GROUP NAME ────────────────────────────────────────────────────────────────
//

/// Name of a numbered sub-group collection (`quizzes_group_4`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupName(String);

impl GroupName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing group number, if the name follows the `prefix_<n>` scheme.
    #[must_use]
    pub fn numeric_suffix(&self) -> Option<u32> {
        numeric_suffix(&self.0)
    }

    /// Suffix used for ordering: names without a numeric suffix sort last.
    #[must_use]
    pub fn sort_suffix(&self) -> u32 {
        self.numeric_suffix().unwrap_or(u32::MAX)
    }
}

impl fmt::Debug for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupName({})", self.0)
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn numeric_suffix(name: &str) -> Option<u32> {
    name.rsplit_once('_')?.1.parse().ok()
}

//
// ─── COMPOSITE KEYS ────────────────────────────────────────────────────────────
//

/// Separator joining the parts of a progress-record document id.
const ENTRY_KEY_SEP: &str = "__";

/// Separator joining the parts of a completion-marker value.
const GROUP_KEY_SEP: &str = "::";

/// Composite document id for one progress record.
///
/// Serializes to `container__group__entry` for quiz and exam records and
/// `group__entry` for lessons, which live directly under the course.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    container: Option<ContainerId>,
    group: GroupName,
    entry: EntryId,
}

impl EntryKey {
    #[must_use]
    pub fn new(container: Option<ContainerId>, group: GroupName, entry: EntryId) -> Self {
        Self {
            container,
            group,
            entry,
        }
    }

    #[must_use]
    pub fn container(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    #[must_use]
    pub fn group(&self) -> &GroupName {
        &self.group
    }

    #[must_use]
    pub fn entry(&self) -> &EntryId {
        &self.entry
    }

    /// Canonical document id used for point reads and writes.
    #[must_use]
    pub fn canonical(&self) -> String {
        match &self.container {
            Some(c) => format!(
                "{}{sep}{}{sep}{}",
                c.as_str(),
                self.group.as_str(),
                self.entry.as_str(),
                sep = ENTRY_KEY_SEP
            ),
            None => format!(
                "{}{sep}{}",
                self.group.as_str(),
                self.entry.as_str(),
                sep = ENTRY_KEY_SEP
            ),
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Membership value stored in a completion-marker set.
///
/// Serializes to `container::group` for quizzes and exams and to the bare
/// group name for lessons.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    container: Option<ContainerId>,
    group: GroupName,
}

impl GroupKey {
    #[must_use]
    pub fn new(container: Option<ContainerId>, group: GroupName) -> Self {
        Self { container, group }
    }

    #[must_use]
    pub fn container(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    #[must_use]
    pub fn group(&self) -> &GroupName {
        &self.group
    }

    /// Canonical marker value compared against the persisted set.
    #[must_use]
    pub fn canonical(&self) -> String {
        match &self.container {
            Some(c) => format!("{}{}{}", c.as_str(), GROUP_KEY_SEP, self.group.as_str()),
            None => self.group.as_str().to_string(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_lowercased_and_trimmed() {
        let level = Level::new(" A2 ").unwrap();
        assert_eq!(level.as_str(), "a2");
        assert_eq!(Level::default().as_str(), "a1");
    }

    #[test]
    fn blank_level_is_rejected() {
        assert_eq!(Level::new("   "), Err(LevelError::Blank));
    }

    #[test]
    fn group_name_suffix_parses_or_sorts_last() {
        assert_eq!(GroupName::new("quizzes_group_12").numeric_suffix(), Some(12));
        assert_eq!(GroupName::new("misc").numeric_suffix(), None);
        assert_eq!(GroupName::new("misc").sort_suffix(), u32::MAX);
    }

    #[test]
    fn entry_key_joins_with_double_underscore() {
        let key = EntryKey::new(
            Some(ContainerId::new("quiz_1")),
            GroupName::new("quizzes_group_2"),
            EntryId::new("task_3"),
        );
        assert_eq!(key.canonical(), "quiz_1__quizzes_group_2__task_3");
    }

    #[test]
    fn lesson_entry_key_has_no_container_part() {
        let key = EntryKey::new(
            None,
            GroupName::new("lessons_group_1"),
            EntryId::new("Lekcija_1_1"),
        );
        assert_eq!(key.canonical(), "lessons_group_1__Lekcija_1_1");
    }

    #[test]
    fn group_key_uses_double_colon() {
        let with_container = GroupKey::new(
            Some(ContainerId::new("exam_2")),
            GroupName::new("exams_group_1"),
        );
        assert_eq!(with_container.canonical(), "exam_2::exams_group_1");

        let bare = GroupKey::new(None, GroupName::new("lessons_group_4"));
        assert_eq!(bare.canonical(), "lessons_group_4");
    }
}
