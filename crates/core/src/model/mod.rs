mod answer;
mod content;
mod group;
mod ids;
mod progress;

pub use answer::{AnswerState, normalize_answer};
pub use content::{ContentError, ContentType, Course, Entry, ImageRef};
pub use group::{ContentGroup, DiscoveredGroup, roll_up, sort_discovered};
pub use ids::{
    ContainerId, CourseId, EntryId, EntryKey, GroupKey, GroupName, Level, LevelError, UserId,
};
pub use progress::{AccuracyRow, ProgressRecord, Stat, StatError};
