use std::sync::Arc;

use serde_json::json;

use italo_core::model::{
    AnswerState, ContainerId, Entry, EntryId, GroupName, ProgressRecord, normalize_answer,
};
use italo_core::time::Clock;
use storage::document::{Document, fields};
use storage::repository::{FieldFilter, ProgressStore};

use crate::error::ProgressError;
use crate::scope::ProgressScope;

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// The progress ledger: answer submission with the first-submission lock,
/// explicit group completion, and restart.
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressStore>,
}

impl std::fmt::Debug for ProgressService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressService").finish_non_exhaustive()
    }
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressStore>) -> Self {
        Self { clock, progress }
    }

    /// Lock state of one entry, reconstructed from the persisted record.
    ///
    /// A record with `attempted` set locks the entry; everything else,
    /// including an absent record or one that does not decode, reads as
    /// unanswered.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the point read fails.
    pub async fn answer_state(
        &self,
        scope: &ProgressScope,
        group: &GroupName,
        entry: &Entry,
    ) -> Result<AnswerState, ProgressError> {
        let doc = self.progress.get(&scope.record_doc(group, &entry.id)).await?;
        Ok(doc
            .as_ref()
            .and_then(record_from_doc)
            .map_or(AnswerState::Unanswered, |record| record.answer_state()))
    }

    /// Evaluate and persist one submission. Returns whether it was correct.
    ///
    /// Blank submissions and already-locked entries are rejected before any
    /// write. On acceptance the course root marker is merged first, then the
    /// record and the stats aggregate are written in one storage
    /// transaction.
    ///
    /// # Errors
    ///
    /// `ProgressError::EmptyAnswer` for a blank submission,
    /// `ProgressError::AlreadyAnswered` for a locked entry,
    /// `ProgressError::Storage` if a write fails.
    pub async fn submit_answer(
        &self,
        scope: &ProgressScope,
        group: &GroupName,
        entry: &Entry,
        submitted: &str,
    ) -> Result<bool, ProgressError> {
        if normalize_answer(submitted).is_empty() {
            return Err(ProgressError::EmptyAnswer);
        }
        if self.answer_state(scope, group, entry).await?.is_locked() {
            return Err(ProgressError::AlreadyAnswered);
        }

        let correct = entry.evaluate(submitted);

        // course root first, so restart and discovery always find the doc
        self.progress
            .upsert_merge(&scope.course_doc(), fields(&[("exists", json!(true))]))
            .await?;

        let mut patch = fields(&[
            ("attempted", json!(true)),
            ("answer", json!(submitted)),
            ("correct", json!(correct)),
            ("groupId", json!(group.as_str())),
            ("entryId", json!(entry.id.as_str())),
            ("question", json!(entry.prompt)),
            ("expected", json!(entry.expected)),
            ("answeredAt", json!(self.clock.now().to_rfc3339())),
        ]);
        if let Some(container) = scope.container() {
            patch.insert("containerId".to_string(), json!(container.as_str()));
        }

        self.progress
            .record_submission(
                &scope.record_doc(group, &entry.id),
                patch,
                &scope.stats_doc(),
                correct,
            )
            .await?;
        Ok(correct)
    }

    /// Add the group to the completion-marker set. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the write fails.
    pub async fn mark_group_completed(
        &self,
        scope: &ProgressScope,
        group: &GroupName,
    ) -> Result<(), ProgressError> {
        self.progress
            .array_union(
                &scope.course_doc(),
                scope.content_type().marker_field(),
                &scope.marker_value(group),
            )
            .await?;
        Ok(())
    }

    /// Wipe the group's records and clear its completion marker, returning
    /// the number of deleted records.
    ///
    /// A marker-removal failure after the deletes is surfaced: the caller
    /// must never be left believing the group is both empty and completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the deletes or the marker removal
    /// fail.
    pub async fn restart_group(
        &self,
        scope: &ProgressScope,
        group: &GroupName,
    ) -> Result<u32, ProgressError> {
        let deleted = self
            .progress
            .delete_where(&scope.progress_collection(), &record_filters(scope, group))
            .await?;
        self.progress
            .array_remove(
                &scope.course_doc(),
                scope.content_type().marker_field(),
                &scope.marker_value(group),
            )
            .await?;
        Ok(deleted)
    }
}

/// Decode one persisted record document. `None` for documents missing the
/// denormalized group/entry ids, which only a write outside the engine can
/// produce.
#[must_use]
pub(crate) fn record_from_doc(doc: &Document) -> Option<ProgressRecord> {
    Some(ProgressRecord {
        attempted: doc.bool_field("attempted").unwrap_or(false),
        answer: doc.str_field("answer").unwrap_or_default().to_string(),
        correct: doc.bool_field("correct").unwrap_or(false),
        container: doc.str_field("containerId").map(ContainerId::new),
        group: GroupName::new(doc.str_field("groupId")?),
        entry: EntryId::new(doc.str_field("entryId")?),
    })
}

/// Equality filters selecting one group's records, container included when
/// the scope has one.
#[must_use]
pub fn record_filters(scope: &ProgressScope, group: &GroupName) -> Vec<FieldFilter> {
    let mut filters = vec![FieldFilter::eq("groupId", group.as_str())];
    if let Some(container) = scope.container() {
        filters.push(FieldFilter::eq("containerId", container.as_str()));
    }
    filters
}

#[cfg(test)]
mod tests {
    use super::*;
    use italo_core::model::{ContainerId, CourseId, EntryId, Level, UserId};
    use italo_core::time::fixed_clock;
    use storage::memory::InMemoryStore;

    fn service() -> (ProgressService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let progress: Arc<dyn ProgressStore> = Arc::clone(&store) as Arc<dyn ProgressStore>;
        (ProgressService::new(fixed_clock(), progress), store)
    }

    fn scope() -> ProgressScope {
        ProgressScope::quizzes(
            UserId::new("u1"),
            Level::default(),
            CourseId::new("course_1"),
            ContainerId::new("quiz_1"),
        )
    }

    fn entry(id: &str, expected: &str) -> Entry {
        Entry {
            id: EntryId::new(id),
            prompt: format!("prompt {id}"),
            expected: expected.to_string(),
            options: Vec::new(),
            image: None,
            order: None,
        }
    }

    #[tokio::test]
    async fn submit_locks_the_entry() {
        let (svc, _store) = service();
        let scope = scope();
        let group = GroupName::new("quizzes_group_1");
        let entry = entry("task_1", "cane");

        let correct = svc
            .submit_answer(&scope, &group, &entry, " Cane ")
            .await
            .unwrap();
        assert!(correct);

        let state = svc.answer_state(&scope, &group, &entry).await.unwrap();
        assert_eq!(
            state,
            AnswerState::Locked {
                correct: true,
                submitted: " Cane ".to_string(),
            }
        );

        let err = svc
            .submit_answer(&scope, &group, &entry, "gatto")
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::AlreadyAnswered));
    }

    #[tokio::test]
    async fn persisted_record_decodes_with_denormalized_ids() {
        let (svc, store) = service();
        let scope = scope();
        let group = GroupName::new("quizzes_group_1");
        let entry = entry("task_1", "cane");

        svc.submit_answer(&scope, &group, &entry, "cane").await.unwrap();

        let doc = ProgressStore::get(store.as_ref(), &scope.record_doc(&group, &entry.id))
            .await
            .unwrap()
            .unwrap();
        let record = record_from_doc(&doc).unwrap();
        assert!(record.attempted);
        assert!(record.correct);
        assert_eq!(record.answer, "cane");
        assert_eq!(record.group, group);
        assert_eq!(record.entry, entry.id);
        assert_eq!(record.container.as_ref(), scope.container());
    }

    #[tokio::test]
    async fn undecodable_record_reads_as_unanswered() {
        let (svc, store) = service();
        let scope = scope();
        let group = GroupName::new("quizzes_group_1");
        let entry = entry("task_1", "cane");

        // a stray write without the denormalized ids never locks the entry
        store
            .upsert_merge(
                &scope.record_doc(&group, &entry.id),
                fields(&[("attempted", json!(true))]),
            )
            .await
            .unwrap();

        let state = svc.answer_state(&scope, &group, &entry).await.unwrap();
        assert_eq!(state, AnswerState::Unanswered);
    }

    #[tokio::test]
    async fn blank_submission_writes_nothing() {
        let (svc, _store) = service();
        let scope = scope();
        let group = GroupName::new("quizzes_group_1");
        let entry = entry("task_1", "cane");

        let err = svc
            .submit_answer(&scope, &group, &entry, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::EmptyAnswer));

        let state = svc.answer_state(&scope, &group, &entry).await.unwrap();
        assert_eq!(state, AnswerState::Unanswered);
    }

    #[tokio::test]
    async fn submissions_accumulate_stats_once_per_entry() {
        let (svc, store) = service();
        let scope = scope();
        let group = GroupName::new("quizzes_group_1");

        svc.submit_answer(&scope, &group, &entry("task_1", "cane"), "cane")
            .await
            .unwrap();
        svc.submit_answer(&scope, &group, &entry("task_2", "gatto"), "cavallo")
            .await
            .unwrap();

        let stats = ProgressStore::get(store.as_ref(), &scope.stats_doc())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.u32_field("total"), Some(2));
        assert_eq!(stats.u32_field("correct"), Some(1));
    }

    #[tokio::test]
    async fn restart_clears_records_and_marker() {
        let (svc, store) = service();
        let scope = scope();
        let group = GroupName::new("quizzes_group_1");
        let other = GroupName::new("quizzes_group_2");

        svc.submit_answer(&scope, &group, &entry("task_1", "cane"), "cane")
            .await
            .unwrap();
        svc.submit_answer(&scope, &other, &entry("task_1", "gatto"), "gatto")
            .await
            .unwrap();
        svc.mark_group_completed(&scope, &group).await.unwrap();
        svc.mark_group_completed(&scope, &group).await.unwrap();

        let deleted = svc.restart_group(&scope, &group).await.unwrap();
        assert_eq!(deleted, 1);

        // the other group's record survives
        let state = svc
            .answer_state(&scope, &other, &entry("task_1", "gatto"))
            .await
            .unwrap();
        assert!(state.is_locked());

        let course = ProgressStore::get(store.as_ref(), &scope.course_doc())
            .await
            .unwrap()
            .unwrap();
        assert!(
            !course
                .str_list_field(scope.content_type().marker_field())
                .contains(&scope.marker_value(&group))
        );

        // entry is answerable again after the restart
        svc.submit_answer(&scope, &group, &entry("task_1", "cane"), "pas")
            .await
            .unwrap();
    }
}
