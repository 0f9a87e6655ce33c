use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, EntryId, GroupName, Level};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("image reference is not a valid URL: {0}")]
    InvalidImageUrl(String),

    #[error("unknown content type: {0}")]
    UnknownContentType(String),
}

//
// ─── CONTENT TYPE ──────────────────────────────────────────────────────────────
//

/// The three kinds of groupable content, each with its own fixed naming
/// scheme in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Lessons,
    Quizzes,
    Exams,
}

impl ContentType {
    /// Name of the user-progress subcollection holding records of this type.
    #[must_use]
    pub fn progress_collection(&self) -> &'static str {
        match self {
            ContentType::Lessons => "lessons",
            ContentType::Quizzes => "quizzes",
            ContentType::Exams => "exams",
        }
    }

    /// Prefix of numbered sub-group collection names.
    #[must_use]
    pub fn group_prefix(&self) -> &'static str {
        match self {
            ContentType::Lessons => "lessons_group_",
            ContentType::Quizzes => "quizzes_group_",
            ContentType::Exams => "exams_group_",
        }
    }

    /// Set-valued field on the course progress document recording which
    /// groups the user has explicitly finished.
    #[must_use]
    pub fn marker_field(&self) -> &'static str {
        match self {
            ContentType::Lessons => "groups",
            ContentType::Quizzes => "quizzes_groups",
            ContentType::Exams => "exams_groups",
        }
    }

    /// Document id of the per-course stats aggregate for this type.
    #[must_use]
    pub fn stats_doc_id(&self) -> &'static str {
        match self {
            ContentType::Lessons => "stats",
            ContentType::Quizzes => "quiz_stats",
            ContentType::Exams => "exam_stats",
        }
    }

    /// Root collection holding this type's content for a level.
    #[must_use]
    pub fn content_root(&self, level: &Level) -> String {
        match self {
            ContentType::Lessons => format!("courses_{level}"),
            ContentType::Quizzes => format!("quizzes_{level}"),
            ContentType::Exams => format!("exams_{level}"),
        }
    }

    /// Prefix of ordinal container document ids, for types whose groups live
    /// under their own container rather than under the course.
    #[must_use]
    pub fn container_prefix(&self) -> Option<&'static str> {
        match self {
            ContentType::Lessons => None,
            ContentType::Quizzes => Some("quiz_"),
            ContentType::Exams => Some("exam_"),
        }
    }

    /// Display noun for group labels (`Lekcije 3 (12)`, `Zadaci 1 (4)`).
    #[must_use]
    pub fn group_label_noun(&self) -> &'static str {
        match self {
            ContentType::Lessons => "Lekcije",
            ContentType::Quizzes | ContentType::Exams => "Zadaci",
        }
    }

    /// Display noun for container labels (`Kviz 2`, `Ispit 1`).
    #[must_use]
    pub fn container_label_noun(&self) -> Option<&'static str> {
        match self {
            ContentType::Lessons => None,
            ContentType::Quizzes => Some("Kviz"),
            ContentType::Exams => Some("Ispit"),
        }
    }

    /// Group name for the given index under this type's naming scheme.
    #[must_use]
    pub fn group_name(&self, index: u32) -> GroupName {
        GroupName::new(format!("{}{index}", self.group_prefix()))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.progress_collection())
    }
}

impl FromStr for ContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lessons" => Ok(ContentType::Lessons),
            "quizzes" => Ok(ContentType::Quizzes),
            "exams" => Ok(ContentType::Exams),
            other => Err(ContentError::UnknownContentType(other.to_string())),
        }
    }
}

//
// ─── IMAGE REFERENCE ───────────────────────────────────────────────────────────
//

/// Validated remote image reference attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(Url);

impl ImageRef {
    /// Parse a non-blank URL string into an image reference.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidImageUrl` if the string is blank or not
    /// a parseable URL.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ContentError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(ContentError::InvalidImageUrl(raw.to_string()));
        }
        let url = Url::parse(raw).map_err(|_| ContentError::InvalidImageUrl(raw.to_string()))?;
        Ok(Self(url))
    }

    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── COURSE & ENTRY ────────────────────────────────────────────────────────────
//

/// Course metadata. Content-authoring is out of scope; read-only here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub order: Option<u32>,
}

impl Course {
    /// Label shown for this course, preferring the description.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            if self.title.is_empty() {
                self.id.as_str()
            } else {
                &self.title
            }
        } else {
            &self.description
        }
    }
}

/// One lesson, quiz task, or exam item. Immutable content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub prompt: String,
    pub expected: String,
    pub options: Vec<String>,
    pub image: Option<ImageRef>,
    pub order: Option<u32>,
}

impl Entry {
    /// An entry with a non-empty options list is answered by selecting an
    /// option; otherwise by free text.
    #[must_use]
    pub fn is_multiple_choice(&self) -> bool {
        !self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_naming_scheme() {
        assert_eq!(ContentType::Quizzes.group_name(7).as_str(), "quizzes_group_7");
        assert_eq!(ContentType::Lessons.marker_field(), "groups");
        assert_eq!(ContentType::Exams.stats_doc_id(), "exam_stats");
        let level = Level::default();
        assert_eq!(ContentType::Exams.content_root(&level), "exams_a1");
    }

    #[test]
    fn content_type_round_trips_through_str() {
        for ct in [ContentType::Lessons, ContentType::Quizzes, ContentType::Exams] {
            let parsed: ContentType = ct.progress_collection().parse().unwrap();
            assert_eq!(parsed, ct);
        }
        assert!("homework".parse::<ContentType>().is_err());
    }

    #[test]
    fn image_ref_rejects_blank_and_garbage() {
        assert!(ImageRef::parse("  ").is_err());
        assert!(ImageRef::parse("not a url").is_err());
        let ok = ImageRef::parse("https://i.imgur.com/0n3D9dU.jpeg").unwrap();
        assert_eq!(ok.as_url().scheme(), "https");
    }

    #[test]
    fn course_label_prefers_description() {
        let mut course = Course {
            id: CourseId::new("course_1"),
            title: "Pića".to_string(),
            description: "Bevande".to_string(),
            level: Level::default(),
            order: Some(1),
        };
        assert_eq!(course.label(), "Bevande");
        course.description.clear();
        assert_eq!(course.label(), "Pića");
        course.title.clear();
        assert_eq!(course.label(), "course_1");
    }
}
