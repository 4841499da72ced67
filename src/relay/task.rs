use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::RelaySettings;
use crate::envelope::{EnvelopeError, MessageEnvelope};
use crate::relay::{Participant, RelayCommand, RelayError, RelayEvent, Sequenced};

/// State for the relay background task
struct RelayTaskState {
    settings: RelaySettings,
    participants: HashMap<Uuid, Participant>,
    subscribers: Vec<mpsc::UnboundedSender<Sequenced>>,
    next_seq: u64,
    event_tx: mpsc::UnboundedSender<RelayEvent>,
}

impl RelayTaskState {
    fn new(settings: RelaySettings, event_tx: mpsc::UnboundedSender<RelayEvent>) -> Self {
        Self {
            settings,
            participants: HashMap::new(),
            subscribers: Vec::new(),
            next_seq: 0,
            event_tx,
        }
    }

    /// Returns `false` once the task should stop.
    fn handle_command(&mut self, command: RelayCommand) -> bool {
        match command {
            RelayCommand::Join { name, reply } => self.handle_join_command(name, reply),
            RelayCommand::Send {
                connection_id,
                frame,
            } => self.handle_send_command(connection_id, frame),
            RelayCommand::Leave { connection_id } => self.handle_leave_command(connection_id),
            RelayCommand::Subscribe(tx) => {
                tracing::debug!("Relay task: new subscriber from #{}", self.next_seq);
                self.subscribers.push(tx);
            }
            RelayCommand::Shutdown => {
                tracing::info!("Relay task: shutdown requested");
                return false;
            }
        }
        true
    }

    fn handle_join_command(
        &mut self,
        name: String,
        reply: oneshot::Sender<Result<Participant, RelayError>>,
    ) {
        let joined = Participant::new(&name, self.settings.max_name_len).and_then(|participant| {
            let envelope = MessageEnvelope::join(participant.name())?;
            Ok((participant, envelope))
        });

        let (participant, envelope) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                tracing::warn!("Relay task: refusing join as '{}': {}", name, e);
                let _ = reply.send(Err(e));
                return;
            }
        };

        tracing::info!("Relay task: {} joining", participant);
        self.participants
            .insert(participant.connection_id(), participant.clone());
        let _ = reply.send(Ok(participant.clone()));
        let _ = self.event_tx.send(RelayEvent::Joined(participant));
        self.deliver(envelope);
    }

    fn handle_send_command(&mut self, connection_id: Uuid, frame: Vec<u8>) {
        let Some(participant) = self.participants.get(&connection_id) else {
            tracing::warn!("Relay task: frame from unknown connection {}", connection_id);
            self.reject(connection_id, RelayError::UnknownConnection(connection_id));
            return;
        };

        // Oversized frames are never parsed.
        let decoded = if frame.len() > self.settings.max_frame_bytes {
            Err(EnvelopeError::MalformedEnvelope(format!(
                "frame of {} bytes exceeds the {} byte limit",
                frame.len(),
                self.settings.max_frame_bytes
            )))
        } else {
            MessageEnvelope::decode(&frame)
        };

        let stamped = decoded.and_then(|envelope| {
            if envelope.sender() == participant.name() {
                return Ok(envelope);
            }
            tracing::debug!(
                "Relay task: stamping sender '{}' over claimed '{}'",
                participant.name(),
                envelope.sender()
            );
            envelope.with_sender(participant.name())
        });

        match stamped {
            Ok(envelope) => self.deliver(envelope),
            Err(e) => {
                tracing::warn!("Relay task: dropping frame from {}: {}", participant, e);
                self.reject(connection_id, e.into());
            }
        }
    }

    fn handle_leave_command(&mut self, connection_id: Uuid) {
        let Some(participant) = self.participants.remove(&connection_id) else {
            self.reject(connection_id, RelayError::UnknownConnection(connection_id));
            return;
        };

        tracing::info!("Relay task: {} leaving", participant);

        match MessageEnvelope::leave(participant.name()) {
            Ok(envelope) => {
                let _ = self.event_tx.send(RelayEvent::Left(participant));
                self.deliver(envelope);
            }
            Err(e) => self.reject(connection_id, e.into()),
        }
    }

    /// Assign the next sequence number and hand the envelope to every live subscriber.
    fn deliver(&mut self, envelope: MessageEnvelope) {
        let sequenced = Sequenced {
            seq: self.next_seq,
            envelope,
        };
        self.next_seq += 1;

        tracing::debug!("Relay task: delivering {}", sequenced);

        self.subscribers
            .retain(|tx| tx.send(sequenced.clone()).is_ok());
        let _ = self.event_tx.send(RelayEvent::Delivered(sequenced));
    }

    fn reject(&self, connection_id: Uuid, error: RelayError) {
        let _ = self.event_tx.send(RelayEvent::Rejected {
            connection_id,
            error,
        });
    }
}

/// Background task that owns the participant table and the sequence counter.
///
/// Commands are processed one at a time, so delivery order is sequence order.
pub async fn relay_background_task(
    settings: RelaySettings,
    mut command_rx: mpsc::UnboundedReceiver<RelayCommand>,
    event_tx: mpsc::UnboundedSender<RelayEvent>,
) {
    tracing::info!("Relay background task started");

    let mut state = RelayTaskState::new(settings, event_tx);

    while let Some(command) = command_rx.recv().await {
        if !state.handle_command(command) {
            break;
        }
    }

    tracing::info!(
        "Relay background task ended after {} deliveries",
        state.next_seq
    );
}
