//! Lifecycle event definitions

use serde::{Deserialize, Serialize};

/// Events published to the real-time layer when content changes state.
/// Delivery is best-effort; nothing in the lifecycle waits on these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoardEvent {
    ThreadCreated {
        board_id: i32,
        thread_id: i32,
    },
    ThreadRetired {
        board_id: i32,
        thread_id: i32,
    },
    ThreadDeleted {
        board_id: i32,
        thread_id: i32,
    },
    PostCreated {
        board_id: i32,
        thread_id: i32,
        post_id: i32,
    },
    PostDeleted {
        board_id: i32,
        thread_id: i32,
        post_id: i32,
    },
}

impl BoardEvent {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ThreadCreated { .. } => "thread_created",
            Self::ThreadRetired { .. } => "thread_retired",
            Self::ThreadDeleted { .. } => "thread_deleted",
            Self::PostCreated { .. } => "post_created",
            Self::PostDeleted { .. } => "post_deleted",
        }
    }

    pub fn board_id(&self) -> i32 {
        match self {
            Self::ThreadCreated { board_id, .. }
            | Self::ThreadRetired { board_id, .. }
            | Self::ThreadDeleted { board_id, .. }
            | Self::PostCreated { board_id, .. }
            | Self::PostDeleted { board_id, .. } => *board_id,
        }
    }

    pub fn thread_id(&self) -> i32 {
        match self {
            Self::ThreadCreated { thread_id, .. }
            | Self::ThreadRetired { thread_id, .. }
            | Self::ThreadDeleted { thread_id, .. }
            | Self::PostCreated { thread_id, .. }
            | Self::PostDeleted { thread_id, .. } => *thread_id,
        }
    }
}
