use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use italo_core::model::{AnswerState, Entry, EntryId, GroupKey, GroupName, ImageRef};
use italo_core::navigator::{NavTarget, Navigator};
use storage::document::Document;
use storage::repository::ContentStore;

use crate::error::SessionError;
use crate::progress::ProgressService;
use crate::scope::ProgressScope;

const UNANSWERED: AnswerState = AnswerState::Unanswered;

/// Outcome of opening a group: pending while the entry list is empty or the
/// requested entry is absent, otherwise a ready session.
#[derive(Debug)]
pub enum SessionState {
    Pending,
    Ready(GroupSession),
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Builds group sessions. A session is immutable in its addressing: when the
/// user moves to another group or container, the old session is dropped and
/// a new one opened, never mutated in place.
pub struct SessionService {
    content: Arc<dyn ContentStore>,
    progress: Arc<ProgressService>,
}

impl SessionService {
    #[must_use]
    pub fn new(content: Arc<dyn ContentStore>, progress: Arc<ProgressService>) -> Self {
        Self { content, progress }
    }

    /// Load a group's ordered entries, restore per-entry lock state, and
    /// position the navigator on the target.
    ///
    /// An ordered load that fails is retried unordered before giving up, so
    /// a backend without ordering support still yields a usable session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the entry load or a lock-state read fails.
    pub async fn open(
        &self,
        scope: ProgressScope,
        group: GroupName,
        target: &NavTarget,
    ) -> Result<SessionState, SessionError> {
        let collection = scope.group_collection(&group);
        let docs = match self.content.get_all(&collection, Some("order")).await {
            Ok(docs) => docs,
            Err(err) => {
                tracing::warn!(collection = %collection, error = %err, "ordered load failed, retrying unordered");
                self.content.get_all(&collection, None).await?
            }
        };
        let entries: Vec<Entry> = docs.iter().map(entry_from_doc).collect();

        let ids: Vec<EntryId> = entries.iter().map(|entry| entry.id.clone()).collect();
        let Some(nav) = Navigator::resolve(ids, target) else {
            return Ok(SessionState::Pending);
        };

        let mut states = HashMap::with_capacity(entries.len());
        for entry in &entries {
            let state = self.progress.answer_state(&scope, &group, entry).await?;
            states.insert(entry.id.clone(), state);
        }

        Ok(SessionState::Ready(GroupSession {
            scope,
            group,
            entries,
            nav,
            states,
            progress: Arc::clone(&self.progress),
        }))
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user working through one group: the ordered entries, the navigator,
/// and each entry's lock state.
#[derive(Debug)]
pub struct GroupSession {
    scope: ProgressScope,
    group: GroupName,
    entries: Vec<Entry>,
    nav: Navigator,
    states: HashMap<EntryId, AnswerState>,
    progress: Arc<ProgressService>,
}

impl GroupSession {
    /// Key identifying what this session was opened for.
    #[must_use]
    pub fn group_key(&self) -> GroupKey {
        self.scope.group_key(&self.group)
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.nav.current_index()
    }

    #[must_use]
    pub fn current_entry(&self) -> &Entry {
        &self.entries[self.nav.current_index()]
    }

    /// Lock state of the current entry.
    #[must_use]
    pub fn current_state(&self) -> &AnswerState {
        self.states.get(&self.current_entry().id).unwrap_or(&UNANSWERED)
    }

    /// Pagination window around the current position.
    #[must_use]
    pub fn window(&self) -> RangeInclusive<usize> {
        self.nav.window()
    }

    /// Step back one entry; false at the left edge.
    pub fn go_previous(&mut self) -> bool {
        match self.nav.current_index().checked_sub(1) {
            Some(index) => self.nav.jump_to(index).is_some(),
            None => false,
        }
    }

    /// Step forward one entry; false at the right edge.
    pub fn go_next(&mut self) -> bool {
        self.nav.jump_to(self.nav.current_index() + 1).is_some()
    }

    /// Jump to an absolute position; false when out of bounds.
    pub fn jump_to(&mut self, index: usize) -> bool {
        self.nav.jump_to(index).is_some()
    }

    /// Submit an answer for the current entry and lock it.
    ///
    /// # Errors
    ///
    /// Propagates `ProgressError`, including the empty-answer and
    /// already-locked rejections.
    pub async fn submit(&mut self, submitted: &str) -> Result<bool, SessionError> {
        let entry = self.current_entry().clone();
        let correct = self
            .progress
            .submit_answer(&self.scope, &self.group, &entry, submitted)
            .await?;
        self.states.insert(
            entry.id,
            AnswerState::Locked {
                correct,
                submitted: submitted.to_string(),
            },
        );
        Ok(correct)
    }

    /// Mark the whole group completed. Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates `ProgressError::Storage` from the marker write.
    pub async fn finish(&self) -> Result<(), SessionError> {
        self.progress
            .mark_group_completed(&self.scope, &self.group)
            .await?;
        Ok(())
    }
}

fn entry_from_doc(doc: &Document) -> Entry {
    let image = doc
        .str_field("imageUrl")
        .and_then(|raw| ImageRef::parse(raw).ok());
    Entry {
        id: EntryId::new(doc.id()),
        prompt: doc.str_field("question").unwrap_or_default().to_string(),
        expected: doc.str_field("answer").unwrap_or_default().to_string(),
        options: doc.str_list_field("options"),
        image,
        order: doc.u32_field("order"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use italo_core::model::{ContainerId, CourseId, Level, UserId};
    use italo_core::time::fixed_clock;
    use serde_json::json;
    use storage::document::fields;
    use storage::memory::InMemoryStore;
    use storage::path::DocPath;
    use storage::repository::ProgressStore;

    struct Fixture {
        sessions: SessionService,
        store: Arc<InMemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let progress = Arc::new(ProgressService::new(
            fixed_clock(),
            Arc::clone(&store) as Arc<dyn ProgressStore>,
        ));
        let sessions = SessionService::new(Arc::clone(&store) as Arc<dyn ContentStore>, progress);
        Fixture { sessions, store }
    }

    fn scope() -> ProgressScope {
        ProgressScope::quizzes(
            UserId::new("u1"),
            Level::default(),
            CourseId::new("course_1"),
            ContainerId::new("quiz_1"),
        )
    }

    async fn seed_task(store: &InMemoryStore, collection: &DocPath, id: &str, order: u32) {
        store
            .upsert_merge(
                &collection.child(id),
                fields(&[
                    ("question", json!(format!("q {id}"))),
                    ("answer", json!(format!("a {id}"))),
                    ("order", json!(order)),
                ]),
            )
            .await
            .unwrap();
    }

    async fn ready_session(f: &Fixture, n: u32) -> GroupSession {
        let scope = scope();
        let group = GroupName::new("quizzes_group_1");
        let collection = scope.group_collection(&group);
        for i in 1..=n {
            seed_task(&f.store, &collection, &format!("task_{i}"), i).await;
        }
        match f.sessions.open(scope, group, &NavTarget::First).await.unwrap() {
            SessionState::Ready(session) => session,
            SessionState::Pending => panic!("expected a ready session"),
        }
    }

    #[tokio::test]
    async fn empty_group_stays_pending() {
        let f = fixture();
        let state = f
            .sessions
            .open(scope(), GroupName::new("quizzes_group_1"), &NavTarget::First)
            .await
            .unwrap();
        assert!(matches!(state, SessionState::Pending));
    }

    #[tokio::test]
    async fn unknown_target_stays_pending() {
        let f = fixture();
        let scope = scope();
        let group = GroupName::new("quizzes_group_1");
        seed_task(&f.store, &scope.group_collection(&group), "task_1", 1).await;

        let state = f
            .sessions
            .open(scope, group, &NavTarget::Entry(EntryId::new("task_9")))
            .await
            .unwrap();
        assert!(matches!(state, SessionState::Pending));
    }

    #[tokio::test]
    async fn navigation_is_edge_bounded() {
        let f = fixture();
        let mut session = ready_session(&f, 3).await;

        assert_eq!(session.current_entry().id.as_str(), "task_1");
        assert!(!session.go_previous());
        assert!(session.go_next());
        assert!(session.go_next());
        assert_eq!(session.current_entry().id.as_str(), "task_3");
        assert!(!session.go_next());
        assert!(!session.jump_to(3));
        assert!(session.jump_to(0));
    }

    #[tokio::test]
    async fn window_tracks_current_position() {
        let f = fixture();
        let mut session = ready_session(&f, 10).await;
        assert_eq!(session.window(), 0..=1);
        assert!(session.jump_to(5));
        assert_eq!(session.window(), 3..=6);
        assert!(session.jump_to(9));
        assert_eq!(session.window(), 7..=9);
    }

    #[tokio::test]
    async fn submit_locks_and_survives_reopen() {
        let f = fixture();
        let mut session = ready_session(&f, 2).await;

        let correct = session.submit("a task_1").await.unwrap();
        assert!(correct);
        assert!(session.current_state().is_locked());
        assert!(matches!(
            session.submit("again").await.unwrap_err(),
            SessionError::Progress(crate::error::ProgressError::AlreadyAnswered)
        ));

        // lock state is restored from the store on reopen
        let reopened = f
            .sessions
            .open(
                scope(),
                GroupName::new("quizzes_group_1"),
                &NavTarget::Entry(EntryId::new("task_1")),
            )
            .await
            .unwrap();
        let SessionState::Ready(reopened) = reopened else {
            panic!("expected a ready session");
        };
        assert_eq!(
            reopened.current_state(),
            &AnswerState::Locked {
                correct: true,
                submitted: "a task_1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn finish_marks_the_group_completed() {
        let f = fixture();
        let session = ready_session(&f, 1).await;
        session.finish().await.unwrap();

        let course = ProgressStore::get(f.store.as_ref(), &scope().course_doc())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            course.str_list_field("quizzes_groups"),
            vec!["quiz_1::quizzes_group_1"]
        );
    }
}
