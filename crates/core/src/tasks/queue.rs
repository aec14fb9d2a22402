//! Render-thread task queue
//!
//! Completion callbacks from background threads must never touch the
//! toolbox directly. They are posted here and run with `&mut Toolbox` on the
//! next frame.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::toolbox::Toolbox;

/// A task to execute on the render thread
pub type Task = Box<dyn FnOnce(&mut Toolbox) + Send + 'static>;

/// Capacity of the task queue
const QUEUE_CAPACITY: usize = 1024;

/// Error returned when a task could not be queued
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Task queue full, task dropped")]
    Full,

    #[error("Task queue disconnected")]
    Disconnected,
}

/// Cloneable handle for posting tasks from any thread
#[derive(Clone)]
pub struct TaskSender {
    sender: Sender<Task>,
}

impl TaskSender {
    /// Queue a task to execute on the next frame
    ///
    /// This is safe to call from any thread.
    pub fn post<F>(&self, task: F) -> Result<(), QueueError>
    where
        F: FnOnce(&mut Toolbox) + Send + 'static,
    {
        match self.sender.try_send(Box::new(task)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Task queue full, dropping task");
                Err(QueueError::Full)
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::error!("Task queue disconnected");
                Err(QueueError::Disconnected)
            }
        }
    }
}

/// Queue owned by the toolbox
pub struct TaskQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        Self { sender, receiver }
    }
}

impl TaskQueue {
    pub fn sender(&self) -> TaskSender {
        TaskSender {
            sender: self.sender.clone(),
        }
    }

    /// Receiving end, cloned so the toolbox can be borrowed mutably while
    /// draining
    pub fn receiver(&self) -> Receiver<Task> {
        self.receiver.clone()
    }

    /// Check how many tasks are currently queued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Run every queued task against the toolbox
///
/// Called by the frame driver on the render thread. Processes at most
/// `QUEUE_CAPACITY` tasks per call; the rest wait for the next frame.
/// Returns the number of tasks processed.
pub fn process_queued_tasks(toolbox: &mut Toolbox) -> usize {
    let receiver = toolbox.tasks().receiver();
    let mut count = 0;

    while let Ok(task) = receiver.try_recv() {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| task(&mut *toolbox))) {
            tracing::error!(
                "Queued task panicked: {}",
                crate::modules::panic_message(payload.as_ref())
            );
        }
        count += 1;

        if count >= QUEUE_CAPACITY {
            break;
        }
    }

    count
}
