pub mod ids;
pub mod message;
pub mod repository;
pub mod serde_utils;
pub mod task;
pub mod theme;

pub use ids::{RepositoryId, TaskId};
pub use message::{MessageKind, StreamMessage};
pub use repository::Repository;
pub use task::{NewTask, RepositoryRef, Task, TaskAction, TaskOutput, TaskStatus, TaskSummary};
pub use theme::Theme;
