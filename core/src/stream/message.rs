//! JSON wire messages exchanged with stream fan-out clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// An inbound text frame, parsed from client JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    pub action: ClientAction,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub filters: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAction {
    Subscribe,
    Unsubscribe,
    List,
}

/// An outbound text frame sent to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Data {
        timestamp: String,
        metric: String,
        data: Value,
    },
    Subscribed {
        action: &'static str,
        metrics: Vec<String>,
        interval: u64,
    },
    Subscriptions {
        action: &'static str,
        metrics: Vec<String>,
    },
}

impl ServerMessage {
    pub fn subscribed(metrics: Vec<String>, interval: u64) -> Self {
        ServerMessage::Subscribed {
            action: "subscribed",
            metrics,
            interval,
        }
    }

    pub fn subscriptions(metrics: Vec<String>) -> Self {
        ServerMessage::Subscriptions {
            action: "subscriptions",
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_parses_subscribe() {
        let raw = r#"{"action":"subscribe","metrics":["cpu","mem"],"interval":2}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.action, ClientAction::Subscribe);
        assert_eq!(msg.metrics, vec!["cpu", "mem"]);
        assert_eq!(msg.interval, Some(2));
    }

    #[test]
    fn client_message_defaults_missing_fields() {
        let raw = r#"{"action":"list"}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.action, ClientAction::List);
        assert!(msg.metrics.is_empty());
        assert!(msg.interval.is_none());
    }

    #[test]
    fn server_message_data_serializes_with_fields() {
        let msg = ServerMessage::Data {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            metric: "cpu".to_string(),
            data: serde_json::json!({"percent": 12}),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["metric"], "cpu");
        assert_eq!(value["data"]["percent"], 12);
    }
}
