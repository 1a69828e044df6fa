//! Archiver core: pure data model for a workspace archive run.
mod channel;
mod message;
mod page;
mod snapshot;

pub use channel::Channel;
pub use message::{Message, NormalizedMessage};
pub use page::{Page, PageAccumulator, PageCursor};
pub use snapshot::WorkspaceSnapshot;
