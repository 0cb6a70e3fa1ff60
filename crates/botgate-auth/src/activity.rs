//! Inbound activity model and body extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known values of [`Activity::kind`].
pub mod activity_types {
    pub const MESSAGE: &str = "message";
    pub const CONTACT_RELATION_UPDATE: &str = "contactRelationUpdate";
    pub const CONVERSATION_UPDATE: &str = "conversationUpdate";
    pub const TYPING: &str = "typing";
    pub const PING: &str = "ping";
    pub const END_OF_CONVERSATION: &str = "endOfConversation";
    pub const EVENT: &str = "event";
    pub const INVOKE: &str = "invoke";
    pub const DELETE_USER_DATA: &str = "deleteUserData";
    pub const INSTALLATION_UPDATE: &str = "installationUpdate";
    pub const MESSAGE_REACTION: &str = "messageReaction";
}

/// A user or bot account on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
}

/// The payload of a webhook call. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity type; see [`activity_types`].
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Callback endpoint the sender claims for replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Activity {
    pub fn is_message(&self) -> bool {
        self.kind == activity_types::MESSAGE
    }

    /// The service URL, if present and not blank.
    pub fn service_url(&self) -> Option<&str> {
        self.service_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Extract the activities carried by a request body.
///
/// Accepts a single activity object or an array of them. Anything else,
/// including invalid JSON, yields no activities. Array elements that do not
/// deserialize are skipped.
pub fn activities_from_json(body: &[u8]) -> Vec<Activity> {
    if body.is_empty() {
        return Vec::new();
    }

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Request body is not JSON, no activities extracted: {e}");
            return Vec::new();
        }
    };

    match value {
        Value::Object(_) => serde_json::from_value(value).map_or_else(
            |e| {
                log::debug!("Request body is not an activity: {e}");
                Vec::new()
            },
            |activity| vec![activity],
        ),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}
