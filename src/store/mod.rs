mod group;
mod session;

pub use group::{Group, GroupTree};
pub use session::{Session, SessionId, SessionStatus, StatusCell, Tool};
