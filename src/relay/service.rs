use anyhow::{Result, anyhow};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};

use super::task::relay_background_task;
use crate::config::Config;
use crate::envelope::MessageEnvelope;
use crate::relay::{Participant, RelayCommand, RelayError, RelayEvent, Sequenced};

/// Limits the relay enforces at its receive boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    pub max_frame_bytes: usize,
    pub max_name_len: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RelaySettings {
    fn from(config: &Config) -> Self {
        Self {
            max_frame_bytes: config.max_frame_bytes,
            max_name_len: config.max_name_len,
        }
    }
}

/// Handle to an in-process relay running as a background task.
#[derive(Debug)]
pub struct RelayService {
    settings: RelaySettings,
    /// Send commands to the background relay task
    pub command_tx: Option<mpsc::UnboundedSender<RelayCommand>>,
    /// Receive events from the background relay task
    pub event_rx: Option<mpsc::UnboundedReceiver<RelayEvent>>,
}

impl RelayService {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            settings,
            command_tx: None,
            event_rx: None,
        }
    }

    /// Initialize the command/event channels and spawn the relay task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize_channels(&mut self) -> mpsc::UnboundedSender<RelayCommand> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        self.command_tx = Some(command_tx.clone());
        self.event_rx = Some(event_rx);

        tokio::spawn(relay_background_task(self.settings, command_rx, event_tx));

        command_tx
    }

    /// Subscribe to sequenced deliveries.
    ///
    /// The subscription is queued behind earlier commands, so it observes every
    /// delivery caused by a command sent after this call, gap-free and in order.
    pub fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Sequenced>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send_command(RelayCommand::Subscribe(tx))?;
        Ok(rx)
    }

    /// Register a new participant under `name` and return the identity the relay assigned.
    pub async fn join(&self, name: &str) -> Result<Participant> {
        let (reply, reply_rx) = oneshot::channel();
        self.send_command(RelayCommand::Join {
            name: name.to_string(),
            reply,
        })?;
        let participant = reply_rx.await.map_err(|_| RelayError::ChannelClosed)??;
        Ok(participant)
    }

    /// Send a raw wire frame on behalf of a participant.
    pub fn send_frame(&self, participant: &Participant, frame: Vec<u8>) -> Result<()> {
        self.send_command(RelayCommand::Send {
            connection_id: participant.connection_id(),
            frame,
        })
    }

    /// Encode an envelope and send it on behalf of a participant.
    pub fn send_envelope(&self, participant: &Participant, envelope: &MessageEnvelope) -> Result<()> {
        self.send_frame(participant, envelope.encode())
    }

    pub fn leave(&self, participant: &Participant) -> Result<()> {
        self.send_command(RelayCommand::Leave {
            connection_id: participant.connection_id(),
        })
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send_command(RelayCommand::Shutdown)
    }

    /// Try to receive a relay event (non-blocking).
    ///
    /// `Ok(None)` means nothing is pending yet; an error means the relay task is gone.
    pub fn try_receive_event(&mut self) -> Result<Option<RelayEvent>> {
        let rx = self
            .event_rx
            .as_mut()
            .ok_or_else(|| anyhow!("Relay channels are not initialized"))?;
        match rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RelayError::ChannelClosed.into()),
        }
    }

    /// Wait for the next relay event; `None` once the task has ended.
    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        match &mut self.event_rx {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    fn send_command(&self, command: RelayCommand) -> Result<()> {
        let tx = self
            .command_tx
            .as_ref()
            .ok_or_else(|| anyhow!("Relay channels are not initialized"))?;
        tx.send(command).map_err(|_| RelayError::ChannelClosed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MessageKind;

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            max_frame_bytes: 128,
            max_name_len: 4,
            ..Config::default()
        };
        let settings = RelaySettings::from(&config);
        assert_eq!(settings.max_frame_bytes, 128);
        assert_eq!(settings.max_name_len, 4);
    }

    #[tokio::test]
    async fn test_uninitialized_service_errors() {
        let mut service = RelayService::new(RelaySettings::default());
        assert!(service.join("alice").await.is_err());
        assert!(service.subscribe().is_err());
        assert!(service.try_receive_event().is_err());
    }

    #[tokio::test]
    async fn test_service_delivers_in_order() -> Result<()> {
        let mut service = RelayService::new(RelaySettings::default());
        service.initialize_channels();
        let mut deliveries = service.subscribe()?;

        let alice = service.join("alice").await?;
        let bob = service.join("bob").await?;
        service.send_envelope(&alice, &MessageEnvelope::chat("alice", "hello")?)?;
        service.send_frame(&bob, b"garbage".to_vec())?;
        service.send_envelope(&bob, &MessageEnvelope::chat("bob", "hi alice")?)?;
        service.leave(&alice)?;

        let mut received = Vec::new();
        for _ in 0..5 {
            received.push(deliveries.recv().await.expect("relay task running"));
        }
        let rendered: Vec<String> = received.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "#0 alice joined",
                "#1 bob joined",
                "#2 alice: hello",
                "#3 bob: hi alice",
                "#4 alice left",
            ]
        );

        let mut rejected = 0;
        while let Some(event) = service.try_receive_event()? {
            if let RelayEvent::Rejected { connection_id, error } = event {
                assert_eq!(connection_id, bob.connection_id());
                assert!(matches!(error, RelayError::Envelope(_)));
                rejected += 1;
            }
        }
        assert_eq!(rejected, 1);

        service.shutdown()?;
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_subscriber_misses_nothing() -> Result<()> {
        let mut service = RelayService::new(RelaySettings::default());
        service.initialize_channels();
        let mut deliveries = service.subscribe()?;

        let alice = service.join("alice").await?;
        let bob = service.join("bob").await?;
        for i in 0..200 {
            let sender = if i % 2 == 0 { &alice } else { &bob };
            service.send_envelope(sender, &MessageEnvelope::chat(sender.name(), format!("msg {i}"))?)?;
        }
        service.shutdown()?;

        // Read only after the relay has finished everything.
        while service.next_event().await.is_some() {}

        let mut seqs = Vec::new();
        while let Some(sequenced) = deliveries.recv().await {
            seqs.push(sequenced.seq);
        }
        assert_eq!(seqs, (0..202).collect::<Vec<u64>>());
        Ok(())
    }

    #[tokio::test]
    async fn test_join_rejects_invalid_name() -> Result<()> {
        let mut service = RelayService::new(RelaySettings::default());
        service.initialize_channels();

        let err = service.join("  ").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RelayError>(),
            Some(RelayError::InvalidName(_))
        ));

        service.shutdown()?;
        Ok(())
    }

    #[tokio::test]
    async fn test_events_end_after_shutdown() -> Result<()> {
        let mut service = RelayService::new(RelaySettings::default());
        service.initialize_channels();

        let erin = service.join("erin").await?;
        service.shutdown()?;

        match service.next_event().await {
            Some(RelayEvent::Joined(participant)) => assert_eq!(participant, erin),
            other => panic!("unexpected event: {other:?}"),
        }
        match service.next_event().await {
            Some(RelayEvent::Delivered(sequenced)) => {
                assert_eq!(sequenced.envelope.kind(), MessageKind::Join)
            }
            other => panic!("unexpected event: {other:?}"),
        }
        // The task dropped its event sender on shutdown.
        assert!(service.next_event().await.is_none());

        let err = service.try_receive_event().unwrap_err();
        assert_eq!(err.downcast_ref::<RelayError>(), Some(&RelayError::ChannelClosed));
        assert!(service.leave(&erin).is_err());
        Ok(())
    }
}
