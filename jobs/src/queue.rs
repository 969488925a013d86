use spendgraph_core::model::Event;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum Job {
    /// An already parsed event.
    Apply(Event),
    /// A raw log line; parsed by the worker, skipped if malformed.
    Line { number: u64, line: String },
    /// Undecoded log bytes; skipped if not UTF-8 or malformed.
    Bytes { number: u64, bytes: Vec<u8> },
}

#[async_trait::async_trait]
pub trait EventQueue: Send + Sync {
    async fn enqueue(&self, job: Job) -> anyhow::Result<()>;
}

/// Bounded in-memory queue using Tokio channels
#[derive(Clone)]
pub struct ChannelEventQueue {
    sender: mpsc::Sender<Job>,
}

impl ChannelEventQueue {
    pub fn new(sender: mpsc::Sender<Job>) -> Self {
        Self { sender }
    }

    /// Queue plus the receiving end for a [`crate::worker::Worker`].
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }
}

#[async_trait::async_trait]
impl EventQueue for ChannelEventQueue {
    async fn enqueue(&self, job: Job) -> anyhow::Result<()> {
        self.sender.send(job).await.map_err(|e| anyhow::anyhow!("Queue send error: {}", e))
    }
}
