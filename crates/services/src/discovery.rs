use std::sync::Arc;

use italo_core::model::{
    ContainerId, ContentGroup, ContentType, Course, CourseId, DiscoveredGroup, GroupName, Level,
    Stat, UserId, roll_up, sort_discovered,
};
use storage::document::Document;
use storage::path::DocPath;
use storage::repository::{
    ContentStore, FieldFilter, ProgressStore, StorageError, Subscription, WatchStore,
};

use crate::error::DiscoveryError;
use crate::progress::record_filters;
use crate::scope::ProgressScope;

/// Highest ordinal probed when enumerating numbered groups. Gaps in the
/// numbering are tolerated; the probe never stops early.
pub const MAX_GROUP_PROBE: u32 = 50;

/// Highest ordinal probed when enumerating quiz/exam containers.
pub const MAX_CONTAINER_PROBE: u32 = 50;

/// Levels unioned by the cross-level discovery pass.
pub const KNOWN_LEVELS: [&str; 2] = ["a1", "a2"];

/// One quiz or exam container as shown in its list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub label: String,
    pub order: Option<u32>,
    pub percent: u8,
}

/// Container facts gathered by the document probe, before any progress math.
struct ProbedContainer {
    id: ContainerId,
    label: String,
    order: Option<u32>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Finds content by probing the store's fixed naming scheme: numbered group
/// collections under courses and containers, numbered container documents
/// per level. Nothing is indexed; every list is recomputed on demand.
pub struct DiscoveryService {
    content: Arc<dyn ContentStore>,
    progress: Arc<dyn ProgressStore>,
    watch: Option<Arc<dyn WatchStore>>,
}

impl DiscoveryService {
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentStore>,
        progress: Arc<dyn ProgressStore>,
        watch: Option<Arc<dyn WatchStore>>,
    ) -> Self {
        Self {
            content,
            progress,
            watch,
        }
    }

    /// The user's selected level, defaulting to `a1` when the profile is
    /// absent or carries no usable tag.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Storage` if the profile read fails.
    pub async fn user_level(&self, user: &UserId) -> Result<Level, DiscoveryError> {
        let doc = self.content.get_one(&DocPath::user_doc(user)).await?;
        Ok(doc
            .as_ref()
            .and_then(|doc| doc.str_field("level"))
            .and_then(|tag| Level::new(tag).ok())
            .unwrap_or_default())
    }

    /// Courses of a level, ordered by their `order` field.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Storage` if the query fails.
    pub async fn list_courses(&self, level: &Level) -> Result<Vec<Course>, DiscoveryError> {
        let docs = self
            .content
            .get_all(&DocPath::courses(level), Some("order"))
            .await?;
        Ok(docs
            .iter()
            .map(|doc| course_from_doc(doc, level))
            .collect())
    }

    /// Live snapshots of a level's course list.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::WatchUnsupported` for backends without a
    /// change feed.
    pub fn watch_courses(&self, level: &Level) -> Result<Subscription, DiscoveryError> {
        let watch = self.watch.as_ref().ok_or(DiscoveryError::WatchUnsupported)?;
        Ok(watch.watch(&DocPath::courses(level)))
    }

    /// Discover the numbered groups inside one scope, with entry counts,
    /// solved counts, and completion flags.
    ///
    /// A failed probe is logged and skipped so one bad collection cannot
    /// hide the rest; partial results win. The first error is surfaced only
    /// when not a single group could be found.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Storage` if the marker read fails, or if
    /// every probe failed and nothing was discovered.
    pub async fn discover_groups(
        &self,
        scope: &ProgressScope,
    ) -> Result<Vec<ContentGroup>, DiscoveryError> {
        let content_type = scope.content_type();
        let markers = self
            .progress
            .get(&scope.course_doc())
            .await?
            .map(|doc| doc.str_list_field(content_type.marker_field()))
            .unwrap_or_default();

        let mut groups = Vec::new();
        let mut first_err: Option<StorageError> = None;
        let mut record_err = |collection: &DocPath, err: StorageError| {
            tracing::warn!(collection = %collection, error = %err, "group probe failed");
            if first_err.is_none() {
                first_err = Some(err);
            }
        };

        for n in 1..=MAX_GROUP_PROBE {
            let group = content_type.group_name(n);
            let collection = scope.group_collection(&group);
            match self.content.exists(&collection).await {
                Ok(false) => continue,
                Ok(true) => {}
                Err(err) => {
                    record_err(&collection, err);
                    continue;
                }
            }
            let total = match self.content.count(&collection).await {
                Ok(total) => total,
                Err(err) => {
                    record_err(&collection, err);
                    continue;
                }
            };
            let solved = match self
                .progress
                .count_where(&scope.progress_collection(), &solved_filters(scope, &group))
                .await
            {
                Ok(solved) => solved,
                Err(err) => {
                    record_err(&collection, err);
                    continue;
                }
            };
            let completed = markers.contains(&scope.marker_value(&group));
            let label = format!("{} {n} ({total})", content_type.group_label_noun());
            groups.push(ContentGroup::new(group, label, total, solved, completed));
        }

        if groups.is_empty()
            && let Some(err) = first_err
        {
            return Err(err.into());
        }
        Ok(groups)
    }

    /// Course rollup: correct entries over all entries across every
    /// discovered group, recomputed from scratch.
    ///
    /// # Errors
    ///
    /// Propagates `discover_groups` errors.
    pub async fn course_percentage(&self, scope: &ProgressScope) -> Result<Stat, DiscoveryError> {
        Ok(roll_up(&self.discover_groups(scope).await?))
    }

    /// Quiz or exam containers of a level, each with its rollup percentage
    /// for the given user and course. Lessons have no containers and yield
    /// an empty list.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Storage` on rollup failure.
    pub async fn discover_containers(
        &self,
        user: &UserId,
        level: &Level,
        course: &CourseId,
        content_type: ContentType,
    ) -> Result<Vec<ContainerSummary>, DiscoveryError> {
        let mut summaries = Vec::new();
        for probed in self.probe_containers(level, content_type).await {
            let scope = container_scope(user, level, course, content_type, &probed.id);
            let percent = self.course_percentage(&scope).await?.pct();
            summaries.push(ContainerSummary {
                id: probed.id,
                label: probed.label,
                order: probed.order,
                percent,
            });
        }
        Ok(summaries)
    }

    /// Union of every container's groups across every known level, for the
    /// ALL selection. Labels keep a `[level]` prefix so identical container
    /// names stay distinguishable.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Storage` on rollup failure.
    pub async fn discover_all_groups(
        &self,
        user: &UserId,
        course: &CourseId,
        content_type: ContentType,
    ) -> Result<Vec<DiscoveredGroup>, DiscoveryError> {
        let mut all = Vec::new();
        for tag in KNOWN_LEVELS {
            let Ok(level) = Level::new(tag) else { continue };
            for probed in self.probe_containers(&level, content_type).await {
                let scope = container_scope(user, &level, course, content_type, &probed.id);
                let container_label = format!("[{level}] {}", probed.label);
                for group in self.discover_groups(&scope).await? {
                    all.push(DiscoveredGroup {
                        level: level.clone(),
                        container: probed.id.clone(),
                        container_label: container_label.clone(),
                        container_order: probed.order,
                        group,
                    });
                }
            }
        }
        sort_discovered(&mut all);
        Ok(all)
    }

    /// Probe `prefix_1 ..= prefix_50` container documents under a level's
    /// content root. Probe failures are logged and skipped.
    async fn probe_containers(
        &self,
        level: &Level,
        content_type: ContentType,
    ) -> Vec<ProbedContainer> {
        let Some(prefix) = content_type.container_prefix() else {
            return Vec::new();
        };
        let noun = content_type.container_label_noun().unwrap_or(prefix);

        let mut containers = Vec::new();
        for n in 1..=MAX_CONTAINER_PROBE {
            let id = ContainerId::new(format!("{prefix}{n}"));
            let path = DocPath::container_doc(content_type, level, &id);
            let doc = match self.content.get_one(&path).await {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::warn!(container = %path, error = %err, "container probe failed");
                    continue;
                }
            };
            let Some(doc) = doc else { continue };
            let label = match doc.str_field("description") {
                Some(description) if !description.trim().is_empty() => description.to_string(),
                _ => format!("{noun} {n}"),
            };
            containers.push(ProbedContainer {
                id,
                label,
                order: doc.u32_field("order"),
            });
        }
        containers
    }
}

/// Filters selecting one group's correctly answered records.
fn solved_filters(scope: &ProgressScope, group: &GroupName) -> Vec<FieldFilter> {
    let mut filters = record_filters(scope, group);
    filters.push(FieldFilter::eq("correct", true));
    filters
}

fn container_scope(
    user: &UserId,
    level: &Level,
    course: &CourseId,
    content_type: ContentType,
    container: &ContainerId,
) -> ProgressScope {
    match content_type {
        ContentType::Exams => ProgressScope::exams(
            user.clone(),
            level.clone(),
            course.clone(),
            container.clone(),
        ),
        // lessons never reach here; probe_containers yields nothing for them
        _ => ProgressScope::quizzes(
            user.clone(),
            level.clone(),
            course.clone(),
            container.clone(),
        ),
    }
}

fn course_from_doc(doc: &Document, level: &Level) -> Course {
    Course {
        id: CourseId::new(doc.id()),
        title: doc.str_field("title").unwrap_or_default().to_string(),
        description: doc.str_field("description").unwrap_or_default().to_string(),
        level: level.clone(),
        order: doc.u32_field("order"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage::document::{Fields, fields};
    use storage::memory::InMemoryStore;

    struct Fixture {
        discovery: DiscoveryService,
        store: Arc<InMemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let discovery = DiscoveryService::new(
            Arc::clone(&store) as Arc<dyn ContentStore>,
            Arc::clone(&store) as Arc<dyn ProgressStore>,
            Some(Arc::clone(&store) as Arc<dyn WatchStore>),
        );
        Fixture { discovery, store }
    }

    fn lesson_scope() -> ProgressScope {
        ProgressScope::lessons(
            UserId::new("u1"),
            Level::default(),
            CourseId::new("course_1"),
        )
    }

    async fn seed_entries(store: &InMemoryStore, collection: &DocPath, n: u32) {
        for i in 1..=n {
            store
                .upsert_merge(&collection.child(format!("word_{i}")), Fields::new())
                .await
                .unwrap();
        }
    }

    async fn seed_solved(store: &InMemoryStore, scope: &ProgressScope, group: &str, n: u32) {
        for i in 1..=n {
            let group = GroupName::new(group);
            let doc = scope.record_doc(&group, &italo_core::model::EntryId::new(format!("word_{i}")));
            store
                .upsert_merge(
                    &doc,
                    fields(&[
                        ("attempted", json!(true)),
                        ("correct", json!(true)),
                        ("groupId", json!(group.as_str())),
                    ]),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn sparse_numbering_discovers_both_groups_in_order() {
        let f = fixture();
        let scope = lesson_scope();
        seed_entries(
            &f.store,
            &scope.group_collection(&GroupName::new("lessons_group_1")),
            3,
        )
        .await;
        seed_entries(
            &f.store,
            &scope.group_collection(&GroupName::new("lessons_group_7")),
            5,
        )
        .await;

        let groups = f.discovery.discover_groups(&scope).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name.as_str(), "lessons_group_1");
        assert_eq!(groups[0].total, 3);
        assert_eq!(groups[0].label, "Lekcije 1 (3)");
        assert_eq!(groups[1].name.as_str(), "lessons_group_7");
        assert_eq!(groups[1].total, 5);
    }

    #[tokio::test]
    async fn solved_counts_and_completion_markers() {
        let f = fixture();
        let scope = lesson_scope();
        seed_entries(
            &f.store,
            &scope.group_collection(&GroupName::new("lessons_group_1")),
            4,
        )
        .await;
        seed_solved(&f.store, &scope, "lessons_group_1", 1).await;
        f.store
            .array_union(&scope.course_doc(), "groups", "lessons_group_1")
            .await
            .unwrap();

        let groups = f.discovery.discover_groups(&scope).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].solved, 1);
        assert_eq!(groups[0].percent, 25);
        assert!(groups[0].completed);
    }

    #[tokio::test]
    async fn empty_store_discovers_nothing() {
        let f = fixture();
        let groups = f.discovery.discover_groups(&lesson_scope()).await.unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn user_level_defaults_to_a1() {
        let f = fixture();
        let user = UserId::new("u1");
        assert_eq!(f.discovery.user_level(&user).await.unwrap().as_str(), "a1");

        f.store
            .upsert_merge(&DocPath::user_doc(&user), fields(&[("level", json!("A2"))]))
            .await
            .unwrap();
        assert_eq!(f.discovery.user_level(&user).await.unwrap().as_str(), "a2");
    }

    #[tokio::test]
    async fn containers_get_description_or_fallback_labels() {
        let f = fixture();
        let level = Level::default();
        let user = UserId::new("u1");
        let course = CourseId::new("course_1");

        f.store
            .upsert_merge(
                &DocPath::container_doc(ContentType::Quizzes, &level, &ContainerId::new("quiz_1")),
                fields(&[("description", json!("Životinje")), ("order", json!(1))]),
            )
            .await
            .unwrap();
        f.store
            .upsert_merge(
                &DocPath::container_doc(ContentType::Quizzes, &level, &ContainerId::new("quiz_3")),
                Fields::new(),
            )
            .await
            .unwrap();

        let containers = f
            .discovery
            .discover_containers(&user, &level, &course, ContentType::Quizzes)
            .await
            .unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].label, "Životinje");
        assert_eq!(containers[1].label, "Kviz 3");
        assert_eq!(containers[0].percent, 0);
    }

    #[tokio::test]
    async fn all_groups_union_spans_levels_with_prefixed_labels() {
        let f = fixture();
        let user = UserId::new("u1");
        let course = CourseId::new("course_1");

        for (tag, quiz, order) in [("a1", "quiz_1", 1), ("a2", "quiz_1", 1)] {
            let level = Level::new(tag).unwrap();
            let container = ContainerId::new(quiz);
            f.store
                .upsert_merge(
                    &DocPath::container_doc(ContentType::Quizzes, &level, &container),
                    fields(&[("order", json!(order))]),
                )
                .await
                .unwrap();
            let scope =
                ProgressScope::quizzes(user.clone(), level, course.clone(), container.clone());
            seed_entries(
                &f.store,
                &scope.group_collection(&GroupName::new("quizzes_group_1")),
                2,
            )
            .await;
        }

        let all = f
            .discovery
            .discover_all_groups(&user, &course, ContentType::Quizzes)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].container_label, "[a1] Kviz 1");
        assert_eq!(all[1].container_label, "[a2] Kviz 1");
    }

    #[tokio::test]
    async fn watch_courses_errors_without_change_feed() {
        let store = Arc::new(InMemoryStore::new());
        let discovery = DiscoveryService::new(
            Arc::clone(&store) as Arc<dyn ContentStore>,
            store as Arc<dyn ProgressStore>,
            None,
        );
        let err = discovery.watch_courses(&Level::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::WatchUnsupported));
    }

    #[tokio::test]
    async fn course_list_follows_order_field() {
        let f = fixture();
        let level = Level::default();
        f.store
            .upsert_merge(
                &DocPath::courses(&level).child("course_b"),
                fields(&[("title", json!("B")), ("order", json!(2))]),
            )
            .await
            .unwrap();
        f.store
            .upsert_merge(
                &DocPath::courses(&level).child("course_a"),
                fields(&[("title", json!("A")), ("order", json!(1))]),
            )
            .await
            .unwrap();

        let courses = f.discovery.list_courses(&level).await.unwrap();
        let ids: Vec<&str> = courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["course_a", "course_b"]);
    }
}
