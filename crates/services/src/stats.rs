use std::collections::BTreeMap;
use std::sync::Arc;

use italo_core::model::{AccuracyRow, ContainerId, ContentType, CourseId, Stat, UserId};
use storage::path::DocPath;
use storage::repository::{ContentStore, FieldFilter, ProgressStore};

use crate::error::StatsError;
use crate::progress::record_from_doc;

/// Per-type rollup of a user's progress across every course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverallProgress {
    pub lessons: Stat,
    pub quizzes: Stat,
    pub exams: Stat,
}

impl OverallProgress {
    #[must_use]
    pub fn of(&self, content_type: ContentType) -> Stat {
        match content_type {
            ContentType::Lessons => self.lessons,
            ContentType::Quizzes => self.quizzes,
            ContentType::Exams => self.exams,
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Dashboard rollups over the user's whole progress subtree. Everything is
/// recomputed from the records; the per-course stats documents count
/// submissions, not distinct entries, and are not used here.
pub struct StatsService {
    content: Arc<dyn ContentStore>,
    progress: Arc<dyn ProgressStore>,
}

impl StatsService {
    #[must_use]
    pub fn new(content: Arc<dyn ContentStore>, progress: Arc<dyn ProgressStore>) -> Self {
        Self { content, progress }
    }

    /// Attempted/correct counts per content type across all courses.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` if any count query fails.
    pub async fn overall_progress(&self, user: &UserId) -> Result<OverallProgress, StatsError> {
        let mut overall = OverallProgress::default();
        for course in self.course_ids(user).await? {
            for content_type in [ContentType::Lessons, ContentType::Quizzes, ContentType::Exams] {
                let collection = DocPath::progress_collection(user, &course, content_type);
                let total = self.content.count(&collection).await?;
                let correct = self
                    .progress
                    .count_where(&collection, &[FieldFilter::eq("correct", true)])
                    .await?;
                // correct records are a subset, so the stat is always valid
                let stat = Stat::new(correct.min(total), total).unwrap_or_default();
                let merged = overall.of(content_type).combine(stat);
                match content_type {
                    ContentType::Lessons => overall.lessons = merged,
                    ContentType::Quizzes => overall.quizzes = merged,
                    ContentType::Exams => overall.exams = merged,
                }
            }
        }
        Ok(overall)
    }

    /// Accuracy rows per quiz or exam container, ordered by container id.
    ///
    /// Records without a container id (lesson records can never carry one)
    /// are left out.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` if a record scan fails.
    pub async fn accuracy_by_container(
        &self,
        user: &UserId,
        content_type: ContentType,
    ) -> Result<Vec<AccuracyRow>, StatsError> {
        let mut per_container: BTreeMap<String, Stat> = BTreeMap::new();
        for course in self.course_ids(user).await? {
            let collection = DocPath::progress_collection(user, &course, content_type);
            for doc in self.content.get_all(&collection, None).await? {
                let Some(record) = record_from_doc(&doc) else {
                    continue;
                };
                let Some(container) = record.container else {
                    continue;
                };
                per_container
                    .entry(container.as_str().to_string())
                    .or_default()
                    .record(record.correct);
            }
        }

        Ok(per_container
            .into_iter()
            .map(|(container, stat)| AccuracyRow {
                label: container_label(&ContainerId::new(container), content_type),
                percent: stat.pct(),
            })
            .collect())
    }

    /// Course documents present under the user's progress root.
    async fn course_ids(&self, user: &UserId) -> Result<Vec<CourseId>, StatsError> {
        let docs = self
            .content
            .get_all(&DocPath::progress_roots(user), None)
            .await?;
        Ok(docs.iter().map(|doc| CourseId::new(doc.id())).collect())
    }
}

/// `Kviz 3` / `Ispit 1` style label; falls back to the raw id for container
/// names outside the ordinal scheme.
fn container_label(container: &ContainerId, content_type: ContentType) -> String {
    match (content_type.container_label_noun(), container.numeric_suffix()) {
        (Some(noun), Some(n)) => format!("{noun} {n}"),
        _ => container.as_str().to_string(),
    }
}
