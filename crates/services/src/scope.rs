use italo_core::model::{
    ContainerId, ContentType, CourseId, EntryId, EntryKey, GroupKey, GroupName, Level, UserId,
};
use storage::path::DocPath;

/// Addressing context for one user working through one course's content of
/// one type. Carries the container for quiz and exam work; lesson groups
/// live directly under the course and have none.
///
/// Every path a service touches is derived from a scope, so record ids,
/// marker values, and stats documents can never drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressScope {
    user: UserId,
    level: Level,
    course: CourseId,
    content_type: ContentType,
    container: Option<ContainerId>,
}

impl ProgressScope {
    /// Scope for lesson groups under a course.
    #[must_use]
    pub fn lessons(user: UserId, level: Level, course: CourseId) -> Self {
        Self {
            user,
            level,
            course,
            content_type: ContentType::Lessons,
            container: None,
        }
    }

    /// Scope for quiz groups under a quiz container.
    #[must_use]
    pub fn quizzes(user: UserId, level: Level, course: CourseId, container: ContainerId) -> Self {
        Self {
            user,
            level,
            course,
            content_type: ContentType::Quizzes,
            container: Some(container),
        }
    }

    /// Scope for exam groups under an exam container.
    #[must_use]
    pub fn exams(user: UserId, level: Level, course: CourseId, container: ContainerId) -> Self {
        Self {
            user,
            level,
            course,
            content_type: ContentType::Exams,
            container: Some(container),
        }
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    #[must_use]
    pub fn course(&self) -> &CourseId {
        &self.course
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    #[must_use]
    pub fn container(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    //
    // ─── CONTENT-SIDE PATHS ────────────────────────────────────────────────────
    //

    /// Collection holding a group's entries: under the container for quizzes
    /// and exams, under the course for lessons.
    #[must_use]
    pub fn group_collection(&self, group: &GroupName) -> DocPath {
        match &self.container {
            Some(container) => {
                DocPath::container_doc(self.content_type, &self.level, container)
                    .child(group.as_str())
            }
            None => DocPath::course_doc(&self.level, &self.course).child(group.as_str()),
        }
    }

    //
    // ─── PROGRESS-SIDE PATHS ───────────────────────────────────────────────────
    //

    /// The per-course progress root document holding completion markers.
    #[must_use]
    pub fn course_doc(&self) -> DocPath {
        DocPath::progress_course_doc(&self.user, &self.course)
    }

    /// Record collection for this scope's content type.
    #[must_use]
    pub fn progress_collection(&self) -> DocPath {
        DocPath::progress_collection(&self.user, &self.course, self.content_type)
    }

    /// Point address of one entry's progress record.
    #[must_use]
    pub fn record_doc(&self, group: &GroupName, entry: &EntryId) -> DocPath {
        DocPath::progress_record(
            &self.user,
            &self.course,
            self.content_type,
            &self.entry_key(group, entry),
        )
    }

    /// Stats aggregate document for this scope's content type.
    #[must_use]
    pub fn stats_doc(&self) -> DocPath {
        DocPath::stats_doc(&self.user, &self.course, self.content_type)
    }

    //
    // ─── KEYS ──────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn entry_key(&self, group: &GroupName, entry: &EntryId) -> EntryKey {
        EntryKey::new(self.container.clone(), group.clone(), entry.clone())
    }

    #[must_use]
    pub fn group_key(&self, group: &GroupName) -> GroupKey {
        GroupKey::new(self.container.clone(), group.clone())
    }

    /// Canonical marker value stored in the completion-marker set.
    #[must_use]
    pub fn marker_value(&self, group: &GroupName) -> String {
        self.group_key(group).canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_scope() -> ProgressScope {
        ProgressScope::quizzes(
            UserId::new("u1"),
            Level::default(),
            CourseId::new("course_1"),
            ContainerId::new("quiz_2"),
        )
    }

    #[test]
    fn quiz_paths_carry_the_container() {
        let scope = quiz_scope();
        let group = GroupName::new("quizzes_group_1");
        assert_eq!(
            scope.group_collection(&group).as_str(),
            "quizzes_a1/quiz_2/quizzes_group_1"
        );
        assert_eq!(
            scope.record_doc(&group, &EntryId::new("task_3")).as_str(),
            "users/u1/progress/course_1/quizzes/quiz_2__quizzes_group_1__task_3"
        );
        assert_eq!(scope.marker_value(&group), "quiz_2::quizzes_group_1");
        assert_eq!(
            scope.stats_doc().as_str(),
            "users/u1/progress/course_1/meta/quiz_stats"
        );
    }

    #[test]
    fn lesson_paths_have_no_container() {
        let scope = ProgressScope::lessons(
            UserId::new("u1"),
            Level::default(),
            CourseId::new("course_1"),
        );
        let group = GroupName::new("lessons_group_4");
        assert_eq!(
            scope.group_collection(&group).as_str(),
            "courses_a1/course_1/lessons_group_4"
        );
        assert_eq!(
            scope.record_doc(&group, &EntryId::new("word_9")).as_str(),
            "users/u1/progress/course_1/lessons/lessons_group_4__word_9"
        );
        assert_eq!(scope.marker_value(&group), "lessons_group_4");
    }
}
