use crate::model::ids::{ContainerId, GroupName, Level};
use crate::model::progress::Stat;

/// Descriptor of one discovered sub-group: recomputed on every load, never
/// persisted as its own entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGroup {
    pub name: GroupName,
    pub label: String,
    pub total: u32,
    pub solved: u32,
    pub percent: u8,
    pub completed: bool,
}

impl ContentGroup {
    /// Build a descriptor, deriving the percentage from the counts.
    ///
    /// A solved count above the total is clamped; stale progress records can
    /// outnumber entries after content shrinks.
    #[must_use]
    pub fn new(name: GroupName, label: String, total: u32, solved: u32, completed: bool) -> Self {
        let solved = solved.min(total);
        let percent = Stat::new(solved, total).map(|s| s.pct()).unwrap_or(0);
        Self {
            name,
            label,
            total,
            solved,
            percent,
            completed,
        }
    }
}

/// A group found under a specific container during an `ALL` discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredGroup {
    pub level: Level,
    pub container: ContainerId,
    pub container_label: String,
    pub container_order: Option<u32>,
    pub group: ContentGroup,
}

/// Order for cross-container results: explicit container order first (absent
/// sorts last), then container label case-insensitively, then the numeric
/// group suffix.
pub fn sort_discovered(groups: &mut [DiscoveredGroup]) {
    groups.sort_by(|a, b| {
        let a_order = a.container_order.unwrap_or(u32::MAX);
        let b_order = b.container_order.unwrap_or(u32::MAX);
        a_order
            .cmp(&b_order)
            .then_with(|| {
                a.container_label
                    .to_lowercase()
                    .cmp(&b.container_label.to_lowercase())
            })
            .then_with(|| a.group.name.sort_suffix().cmp(&b.group.name.sort_suffix()))
    });
}

/// Course-level rollup: total correct over total entries across every group.
#[must_use]
pub fn roll_up(groups: &[ContentGroup]) -> Stat {
    let mut stat = Stat::default();
    for group in groups {
        // solved <= total by construction, so the merged stat stays valid
        stat = stat.combine(Stat::new(group.solved, group.total).unwrap_or_default());
    }
    stat
}
