//! Broadcast dispatch: encode once, fan the same bytes out to members.

use std::sync::Arc;

use boxfit_protocol::{Codec, JsonCodec, PlayerName, RoomId, ServerMessage};
use tokio::sync::mpsc;

use crate::membership::Membership;

/// One encoded message, shared by every member it is delivered to.
pub type Frame = Arc<[u8]>;

/// Channel sender for delivering frames to a player's connection.
///
/// Unbounded so that a slow reader never stalls the room actor.
pub type PlayerSender = mpsc::UnboundedSender<Frame>;

/// Who a message goes to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Recipient<'a> {
    /// Every connected member.
    All,
    /// One member.
    Player(&'a PlayerName),
    /// Every connected member except one.
    AllExcept(&'a PlayerName),
}

/// Encodes server messages and pushes them into member channels.
pub(crate) struct Dispatcher {
    room_id: RoomId,
    codec: JsonCodec,
}

impl Dispatcher {
    pub(crate) fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            codec: JsonCodec,
        }
    }

    /// Encodes `msg` once and delivers it to `recipient`.
    pub(crate) fn send(
        &self,
        members: &Membership,
        recipient: Recipient<'_>,
        msg: &ServerMessage,
    ) {
        let Some(frame) = self.encode(msg) else {
            return;
        };

        let mut delivered = 0usize;
        for (name, sender) in members.connected() {
            let wanted = match recipient {
                Recipient::All => true,
                Recipient::Player(target) => name == target,
                Recipient::AllExcept(excluded) => name != excluded,
            };
            if wanted && deliver(sender, &frame) {
                delivered += 1;
            }
        }

        tracing::debug!(
            room_id = %self.room_id,
            kind = msg.kind_name(),
            delivered,
            "dispatched"
        );
    }

    /// Encodes a message into a shareable frame. Encoding our own types
    /// should never fail; if it does the message is dropped and logged.
    fn encode(&self, msg: &ServerMessage) -> Option<Frame> {
        match self.codec.encode(msg) {
            Ok(bytes) => Some(Frame::from(bytes)),
            Err(e) => {
                tracing::error!(
                    room_id = %self.room_id,
                    kind = msg.kind_name(),
                    error = %e,
                    "failed to encode server message"
                );
                None
            }
        }
    }
}

/// Pushes a frame into one channel. Silently drops if the receiver is
/// gone (connection already closed).
fn deliver(sender: &PlayerSender, frame: &Frame) -> bool {
    sender.send(Arc::clone(frame)).is_ok()
}
