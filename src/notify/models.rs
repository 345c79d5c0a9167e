use serde::Deserialize;

/// One observed state of one saga, as reported by the banking service's
/// notification endpoint. The same tuple may reappear in consecutive polls
/// until the service stops reporting it.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEvent {
    pub saga_id: String,
    pub ucid: String,
    pub operation_type: String,
    pub operation_status: String,
}

/// Identity of an event for delivery tracking. Two fetches reporting the same
/// saga in the same state produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub saga_id: String,
    pub ucid: String,
    pub operation_type: String,
    pub operation_status: String,
}

impl From<&NotificationEvent> for EventKey {
    fn from(event: &NotificationEvent) -> Self {
        EventKey {
            saga_id: event.saga_id.clone(),
            ucid: event.ucid.clone(),
            operation_type: event.operation_type.clone(),
            operation_status: event.operation_status.clone(),
        }
    }
}

impl EventKey {
    /// The message pushed to the user's channel for this event.
    pub fn message(&self) -> String {
        format!(
            "Request ID: {}. The {} operation's status is: {}",
            self.saga_id, self.operation_type, self.operation_status
        )
    }
}
