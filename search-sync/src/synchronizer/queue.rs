//! Task queue boundary and an in-process implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::SearchSyncError;
use crate::synchronizer::task::IndexTask;

/// Fire-and-forget task queue with named lanes.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Push `task` onto `lane`. Returns once the task is accepted, not when
    /// it has run.
    async fn enqueue(&self, task: IndexTask, lane: &str) -> Result<(), SearchSyncError>;
}

/// Default channel buffer size per lane.
pub const DEFAULT_LANE_BUFFER: usize = 1000;

/// In-process queue backed by one tokio mpsc channel per lane.
///
/// A lane exists once a consumer has opened it with [`ChannelTaskQueue::open_lane`];
/// enqueueing onto an unopened lane is an error.
pub struct ChannelTaskQueue {
    buffer: usize,
    lanes: Mutex<HashMap<String, mpsc::Sender<IndexTask>>>,
}

impl Default for ChannelTaskQueue {
    fn default() -> Self {
        Self::new(DEFAULT_LANE_BUFFER)
    }
}

impl ChannelTaskQueue {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Open `lane` and return its receiving end. Reopening a lane replaces
    /// the previous receiver.
    pub fn open_lane(&self, lane: &str) -> Result<mpsc::Receiver<IndexTask>, SearchSyncError> {
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.lanes
            .lock()
            .map_err(|_| SearchSyncError::queue("lane registry poisoned"))?
            .insert(lane.to_string(), sender);
        debug!(lane = %lane, "Opened task lane");
        Ok(receiver)
    }

    /// Close `lane`. Workers drain what is left and stop.
    pub fn close_lane(&self, lane: &str) -> Result<(), SearchSyncError> {
        self.lanes
            .lock()
            .map_err(|_| SearchSyncError::queue("lane registry poisoned"))?
            .remove(lane);
        Ok(())
    }

    fn sender(&self, lane: &str) -> Result<mpsc::Sender<IndexTask>, SearchSyncError> {
        self.lanes
            .lock()
            .map_err(|_| SearchSyncError::queue("lane registry poisoned"))?
            .get(lane)
            .cloned()
            .ok_or_else(|| SearchSyncError::queue(format!("unknown task lane '{}'", lane)))
    }
}

#[async_trait]
impl TaskQueue for ChannelTaskQueue {
    async fn enqueue(&self, task: IndexTask, lane: &str) -> Result<(), SearchSyncError> {
        let sender = self.sender(lane)?;
        debug!(lane = %lane, kind = %task.kind, id = %task.action.id(), "Enqueueing task");
        sender
            .send(task)
            .await
            .map_err(|e| SearchSyncError::queue(format!("lane '{}' is closed: {}", lane, e)))
    }
}
