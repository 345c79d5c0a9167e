use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

/// Sender half of a user's live notification channel. Messages pushed here
/// end up on that user's open SSE stream.
pub type ChannelSender = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone)]
struct ChannelHandle {
    id: Uuid,
    sender: ChannelSender,
}

/// Maps a ucid to the currently-connected live channel for that user.
///
/// At most one entry per user: a new connect overwrites any prior handle
/// (last-connect-wins). Written by the connect/disconnect handlers and read
/// by the broadcaster task.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<String, ChannelHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts the channel for `ucid` and returns the handle id that owns
    /// the new entry.
    pub async fn register(&self, ucid: &str, sender: ChannelSender) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.inner.lock().await;
        sessions.insert(ucid.to_owned(), ChannelHandle { id, sender });
        id
    }

    /// Removes the entry for `ucid` if it is still owned by `handle_id`.
    /// A disconnect racing a newer connect must not drop the newer channel.
    /// No-op when the user has no entry.
    pub async fn unregister(&self, ucid: &str, handle_id: Uuid) {
        let mut sessions = self.inner.lock().await;
        if sessions.get(ucid).is_some_and(|handle| handle.id == handle_id) {
            sessions.remove(ucid);
        }
    }

    /// The sender for `ucid`'s live channel, or `None` when the user has no
    /// open connection.
    pub async fn lookup(&self, ucid: &str) -> Option<ChannelSender> {
        let sessions = self.inner.lock().await;
        sessions.get(ucid).map(|handle| handle.sender.clone())
    }
}
