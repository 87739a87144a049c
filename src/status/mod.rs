mod registry;
mod watcher;

pub use registry::StatusRegistry;
pub use watcher::{StatusEvent, StatusFeed, StatusWatcher};
