//! Turn routing: decide what one inbound turn does and send its replies.
//!
//! Each call is independent; the router carries no state between turns.

use crate::activity::{IncomingTurn, ReplyPayload, TurnType};
use crate::attachments::AttachmentIngestor;
use crate::menu::{self, MenuDispatcher, MenuError};
use crate::reply::ReplySink;

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Menu(#[from] MenuError),
    #[error("sending reply failed: {0}")]
    Send(String),
}

pub struct TurnRouter {
    ingestor: AttachmentIngestor,
    dispatcher: MenuDispatcher,
    bot_name: String,
}

impl TurnRouter {
    pub fn new(
        ingestor: AttachmentIngestor,
        dispatcher: MenuDispatcher,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            ingestor,
            dispatcher,
            bot_name: bot_name.into(),
        }
    }

    /// Greeting sent when someone joins the conversation.
    pub fn greeting_text(&self) -> String {
        format!("Mi nombre es {}, estoy a tus ordenes", self.bot_name)
    }

    /// Handle one turn, sending zero or more replies through `sink`.
    pub async fn on_turn(&self, turn: &IncomingTurn, sink: &dyn ReplySink) -> Result<(), TurnError> {
        match &turn.turn_type {
            TurnType::Message if !turn.attachments.is_empty() => {
                log::debug!("turn: message with {} attachment(s)", turn.attachments.len());
                self.ingestor
                    .ingest_and_reply(&turn.attachments, sink)
                    .await
                    .map_err(TurnError::Send)
            }
            TurnType::Message => {
                let replies = self.dispatcher.dispatch(turn.text.as_deref()).await?;
                send_all(sink, replies).await
            }
            TurnType::ConversationUpdate => {
                // Only the first added member decides; the bot's own join is ignored.
                let Some(first) = turn.members_added.first() else {
                    log::debug!("turn: conversation update without new participants, ignored");
                    return Ok(());
                };
                if first.id == turn.recipient.id {
                    log::debug!("turn: conversation update for the bot itself, ignored");
                    return Ok(());
                }
                send_all(
                    sink,
                    vec![ReplyPayload::text(self.greeting_text()), menu::render_menu()],
                )
                .await
            }
            TurnType::Other(name) => {
                log::debug!("turn: unhandled type {:?}", name);
                send_all(
                    sink,
                    vec![ReplyPayload::text(format!("[{}]-type activity detected.", name))],
                )
                .await
            }
        }
    }
}

async fn send_all(sink: &dyn ReplySink, replies: Vec<ReplyPayload>) -> Result<(), TurnError> {
    for reply in replies {
        sink.send(reply).await.map_err(TurnError::Send)?;
    }
    Ok(())
}
