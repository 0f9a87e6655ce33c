use std::fmt;

use italo_core::model::{ContainerId, ContentType, CourseId, EntryKey, Level, UserId};

/// Hierarchical document-store address, alternating collection and document
/// segments joined by `/`.
///
/// Built through typed constructors so call sites never format paths by
/// hand. Segments themselves never contain `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    /// Root collection path from a single segment.
    #[must_use]
    pub fn root(segment: impl AsRef<str>) -> Self {
        Self(segment.as_ref().to_string())
    }

    /// Append one segment.
    #[must_use]
    pub fn child(&self, segment: impl AsRef<str>) -> Self {
        Self(format!("{}/{}", self.0, segment.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (parent path, last segment). Root paths have no parent.
    #[must_use]
    pub fn split_last(&self) -> Option<(&str, &str)> {
        self.0.rsplit_once('/')
    }

    //
    // ─── CONTENT SUBTREE ───────────────────────────────────────────────────────
    //

    /// `courses_{level}` / `quizzes_{level}` / `exams_{level}`.
    #[must_use]
    pub fn content_root(content_type: ContentType, level: &Level) -> Self {
        Self::root(content_type.content_root(level))
    }

    /// Course list for a level (`courses_{level}`).
    #[must_use]
    pub fn courses(level: &Level) -> Self {
        Self::content_root(ContentType::Lessons, level)
    }

    /// Course document (`courses_{level}/{course}`).
    #[must_use]
    pub fn course_doc(level: &Level, course: &CourseId) -> Self {
        Self::courses(level).child(course.as_str())
    }

    /// Container document (`quizzes_{level}/{quiz}`).
    #[must_use]
    pub fn container_doc(content_type: ContentType, level: &Level, container: &ContainerId) -> Self {
        Self::content_root(content_type, level).child(container.as_str())
    }

    //
    // ─── USER PROGRESS SUBTREE ─────────────────────────────────────────────────
    //

    /// User profile document (`users/{uid}`).
    #[must_use]
    pub fn user_doc(user: &UserId) -> Self {
        Self::root("users").child(user.as_str())
    }

    /// Per-course progress root (`users/{uid}/progress/{course}`).
    #[must_use]
    pub fn progress_course_doc(user: &UserId, course: &CourseId) -> Self {
        Self::user_doc(user).child("progress").child(course.as_str())
    }

    /// Collection of progress docs under a course
    /// (`users/{uid}/progress/{course}/progress`).
    #[must_use]
    pub fn progress_roots(user: &UserId) -> Self {
        Self::user_doc(user).child("progress")
    }

    /// Record collection for one content type
    /// (`users/{uid}/progress/{course}/{lessons|quizzes|exams}`).
    #[must_use]
    pub fn progress_collection(
        user: &UserId,
        course: &CourseId,
        content_type: ContentType,
    ) -> Self {
        Self::progress_course_doc(user, course).child(content_type.progress_collection())
    }

    /// Point address of one progress record, keyed by the composite id.
    #[must_use]
    pub fn progress_record(
        user: &UserId,
        course: &CourseId,
        content_type: ContentType,
        key: &EntryKey,
    ) -> Self {
        Self::progress_collection(user, course, content_type).child(key.canonical())
    }

    /// Stats aggregate document
    /// (`users/{uid}/progress/{course}/meta/{stats|quiz_stats|exam_stats}`).
    #[must_use]
    pub fn stats_doc(user: &UserId, course: &CourseId, content_type: ContentType) -> Self {
        Self::progress_course_doc(user, course)
            .child("meta")
            .child(content_type.stats_doc_id())
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
