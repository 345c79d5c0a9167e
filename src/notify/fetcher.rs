use tracing::warn;

use super::models::NotificationEvent;
use crate::bank::BankClient;

/// One poll against the banking service's notification endpoint.
///
/// Any transport failure, non-accepted status, or decode failure at any layer
/// yields an empty batch; the error is logged and never reaches the caller,
/// so the broadcaster loop keeps running through remote outages.
pub async fn fetch_new_events(bank: &BankClient) -> Vec<NotificationEvent> {
    let data = match bank.notifications().await {
        Ok(Some(data)) => data,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("notification fetch failed: {e}");
            return Vec::new();
        }
    };

    match decode_events(&data) {
        Ok(events) => events,
        Err(e) => {
            warn!("notification payload decode failed: {e}");
            Vec::new()
        }
    }
}

/// Peels the two inner encoding layers: `data` is an encoded list of strings,
/// each of which is an encoded event object.
pub fn decode_events(data: &str) -> Result<Vec<NotificationEvent>, serde_json::Error> {
    let entries: Vec<String> = serde_json::from_str(data)?;
    entries
        .iter()
        .map(|entry| serde_json::from_str(entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn decodes_nested_event_list() {
        let entry = r#"{"saga_id":"s1","ucid":"u1","operation_type":"TRANSFER","operation_status":"COMPLETED"}"#;
        let data = serde_json::to_string(&vec![entry]).unwrap();

        let events = decode_events(&data).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].saga_id, "s1");
        assert_eq!(events[0].ucid, "u1");
        assert_eq!(events[0].operation_type, "TRANSFER");
        assert_eq!(events[0].operation_status, "COMPLETED");
    }

    #[test]
    fn empty_list_decodes_to_no_events() {
        assert!(decode_events("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_outer_layer_is_an_error() {
        assert!(decode_events("not json").is_err());
    }

    #[test]
    fn malformed_inner_entry_is_an_error() {
        let data = serde_json::to_string(&vec!["{\"saga_id\":"]).unwrap();
        assert!(decode_events(&data).is_err());
    }

    #[tokio::test]
    async fn unreachable_service_yields_empty_batch() {
        let bank = BankClient::new(
            "http://127.0.0.1:1/cloudbank".to_string(),
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(fetch_new_events(&bank).await.is_empty());
    }
}
