//! Activity wire types: the inbound turn and the outbound reply payloads.
//!
//! Field names follow the Bot Framework activity JSON (`type`, `from`, `recipient`,
//! `membersAdded`, `contentUrl`, ...). Inbound types are read-only for one invocation;
//! replies are built fresh per turn and handed to the transport.

use serde::{Deserialize, Serialize};

/// Content type of an interactive hero card attachment.
pub const HERO_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.hero";

/// Button action that resends its value as a new message turn.
pub const IM_BACK: &str = "imBack";

/// Kind of inbound turn. Unknown wire values keep their name for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TurnType {
    Message,
    /// A participant joined or left the conversation.
    ConversationUpdate,
    Other(String),
}

impl From<String> for TurnType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "message" => TurnType::Message,
            "conversationUpdate" => TurnType::ConversationUpdate,
            _ => TurnType::Other(s),
        }
    }
}

impl From<TurnType> for String {
    fn from(t: TurnType) -> Self {
        t.as_str().to_string()
    }
}

impl TurnType {
    pub fn as_str(&self) -> &str {
        match self {
            TurnType::Message => "message",
            TurnType::ConversationUpdate => "conversationUpdate",
            TurnType::Other(name) => name,
        }
    }
}

/// Participant identity (`from`, `recipient`, entries of `membersAdded`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAccount {
    #[serde(default)]
    pub id: String,
}

/// Attachment as described by the inbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content_url: String,
    #[serde(default, rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub declared_content_type: Option<String>,
}

impl AttachmentRef {
    pub fn new(name: impl Into<String>, content_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_url: content_url.into(),
            declared_content_type: None,
        }
    }
}

/// One inbound turn (activity) as delivered by the hosting transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingTurn {
    #[serde(rename = "type")]
    pub turn_type: TurnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    #[serde(default)]
    pub from: ChannelAccount,
    #[serde(default)]
    pub recipient: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default)]
    pub members_added: Vec<ChannelAccount>,
}

impl IncomingTurn {
    /// Plain message turn from `from` to `recipient`.
    pub fn message(text: impl Into<String>, from: &str, recipient: &str) -> Self {
        Self {
            turn_type: TurnType::Message,
            id: None,
            text: Some(text.into()),
            attachments: Vec::new(),
            from: ChannelAccount::new(from),
            recipient: ChannelAccount::new(recipient),
            conversation: None,
            members_added: Vec::new(),
        }
    }

    /// Membership update announcing `added` to a conversation the bot `recipient` is in.
    pub fn membership_update(added: &[&str], recipient: &str) -> Self {
        Self {
            turn_type: TurnType::ConversationUpdate,
            id: None,
            text: None,
            attachments: Vec::new(),
            from: ChannelAccount::default(),
            recipient: ChannelAccount::new(recipient),
            conversation: None,
            members_added: added.iter().map(|id| ChannelAccount::new(*id)).collect(),
        }
    }
}

/// Outgoing media reference. `content_url` is either an HTTPS URL or a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingAttachment {
    pub name: String,
    pub content_type: String,
    pub content_url: String,
}

impl OutgoingAttachment {
    pub fn is_inline(&self) -> bool {
        self.content_url.starts_with("data:")
    }
}

/// Button on a hero card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAction {
    #[serde(rename = "type")]
    pub typ: String,
    pub title: String,
    pub value: String,
}

impl CardAction {
    pub fn im_back(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            typ: IM_BACK.to_string(),
            title: title.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroCard {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub buttons: Vec<CardAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAttachment {
    pub content_type: String,
    pub content: HeroCard,
}

/// Attachment slot on a reply: an interactive card or a media reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyAttachment {
    Card(CardAttachment),
    Media(OutgoingAttachment),
}

impl ReplyAttachment {
    pub fn hero_card(card: HeroCard) -> Self {
        ReplyAttachment::Card(CardAttachment {
            content_type: HERO_CARD_CONTENT_TYPE.to_string(),
            content: card,
        })
    }

    pub fn as_card(&self) -> Option<&HeroCard> {
        match self {
            ReplyAttachment::Card(c) => Some(&c.content),
            ReplyAttachment::Media(_) => None,
        }
    }

    pub fn as_media(&self) -> Option<&OutgoingAttachment> {
        match self {
            ReplyAttachment::Media(m) => Some(m),
            ReplyAttachment::Card(_) => None,
        }
    }
}

/// Outbound message activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<ReplyAttachment>,
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            typ: "message".to_string(),
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    /// Text plus a single media attachment.
    pub fn with_media(text: impl Into<String>, attachment: OutgoingAttachment) -> Self {
        Self {
            typ: "message".to_string(),
            text: Some(text.into()),
            attachments: vec![ReplyAttachment::Media(attachment)],
        }
    }

    /// Card-only reply.
    pub fn card(card: HeroCard) -> Self {
        Self {
            typ: "message".to_string(),
            text: None,
            attachments: vec![ReplyAttachment::hero_card(card)],
        }
    }

    pub fn media(&self) -> impl Iterator<Item = &OutgoingAttachment> {
        self.attachments.iter().filter_map(ReplyAttachment::as_media)
    }

    pub fn cards(&self) -> impl Iterator<Item = &HeroCard> {
        self.attachments.iter().filter_map(ReplyAttachment::as_card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_activity_with_attachments() {
        let json = r#"{
            "type": "message",
            "id": "abc",
            "text": "",
            "from": { "id": "user-1", "name": "User" },
            "recipient": { "id": "bot-1" },
            "conversation": { "id": "conv-1" },
            "attachments": [
                { "name": "a.png", "contentUrl": "http://localhost/a.png", "contentType": "image/png" },
                { "name": "b.json", "contentUrl": "http://localhost/b.json" }
            ]
        }"#;
        let turn: IncomingTurn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.turn_type, TurnType::Message);
        assert_eq!(turn.attachments.len(), 2);
        assert_eq!(turn.attachments[0].declared_content_type.as_deref(), Some("image/png"));
        assert_eq!(turn.attachments[1].declared_content_type, None);
        assert_eq!(turn.recipient.id, "bot-1");
        assert!(turn.members_added.is_empty());
    }

    #[test]
    fn unknown_turn_type_keeps_its_name() {
        let turn: IncomingTurn = serde_json::from_str(r#"{ "type": "typing" }"#).unwrap();
        assert_eq!(turn.turn_type, TurnType::Other("typing".to_string()));
        assert_eq!(turn.turn_type.as_str(), "typing");
    }

    #[test]
    fn conversation_update_members() {
        let json = r#"{
            "type": "conversationUpdate",
            "recipient": { "id": "bot" },
            "membersAdded": [ { "id": "user" } ]
        }"#;
        let turn: IncomingTurn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.turn_type, TurnType::ConversationUpdate);
        assert_eq!(turn.members_added, vec![ChannelAccount::new("user")]);
    }

    #[test]
    fn card_reply_serializes_as_hero_card() {
        let reply = ReplyPayload::card(HeroCard {
            title: String::new(),
            text: "pick".to_string(),
            buttons: vec![CardAction::im_back("One", "1")],
        });
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["type"], "message");
        assert!(v.get("text").is_none());
        assert_eq!(v["attachments"][0]["contentType"], HERO_CARD_CONTENT_TYPE);
        assert_eq!(v["attachments"][0]["content"]["buttons"][0]["type"], "imBack");
        assert_eq!(v["attachments"][0]["content"]["buttons"][0]["value"], "1");

        let back: ReplyPayload = serde_json::from_value(v).unwrap();
        assert_eq!(back.cards().count(), 1);
        assert_eq!(back.media().count(), 0);
    }

    #[test]
    fn media_reply_deserializes_as_media() {
        let json = r#"{
            "type": "message",
            "text": "hi",
            "attachments": [ { "name": "x.png", "contentType": "image/png", "contentUrl": "https://h/x.png" } ]
        }"#;
        let reply: ReplyPayload = serde_json::from_str(json).unwrap();
        let media: Vec<_> = reply.media().collect();
        assert_eq!(media.len(), 1);
        assert!(!media[0].is_inline());
    }
}
