use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::parse_media_buy_id_token;
use crate::events::{
    default_dispatcher, DispatchError, EventContext, EventDispatcher, SlackEnvelope, SlackEvent,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        // Doubling capped at 2^16 keeps the shift well-defined for any attempt.
        let doubled = self
            .base_delay_ms
            .saturating_mul(1_u64 << attempt.min(16))
            .min(self.max_delay_ms);
        Duration::from_millis(doubled)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Pumps envelopes from the transport into the dispatcher. Transport outages
/// retry with exponential backoff; exhausted retries degrade to a stopped
/// ingress rather than a crashed process.
pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl Default for SocketModeRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopSocketTransport),
            dispatcher: default_dispatcher(),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.run_session(attempt).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %error,
                        "slack ingress session ended with transport error"
                    );
                }
            }

            if attempt >= self.reconnect_policy.max_retries {
                warn!(
                    max_retries = self.reconnect_policy.max_retries,
                    "slack ingress retries exhausted; leaving ingress stopped"
                );
                return Ok(());
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn run_session(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "connecting slack socket mode transport");
        self.transport.connect().await?;

        while let Some(envelope) = self.transport.next_envelope().await? {
            self.handle_envelope(&envelope).await;
        }

        info!(attempt, "slack socket mode stream closed");
        self.transport.disconnect().await
    }

    async fn handle_envelope(&self, envelope: &SlackEnvelope) {
        let media_buy_id = correlation_media_buy_id(envelope);
        let media_buy_field = media_buy_id.as_deref().unwrap_or("unknown");

        info!(
            event_name = "ingress.slack.envelope_received",
            envelope_id = %envelope.envelope_id,
            event_type = ?envelope.event.event_type(),
            correlation_id = %envelope.envelope_id,
            media_buy_id = media_buy_field,
            "received slack envelope"
        );

        // Ack before dispatch so Slack never re-delivers a slow decision.
        match self.transport.acknowledge(&envelope.envelope_id).await {
            Ok(()) => debug!(
                event_name = "ingress.slack.ack_sent",
                envelope_id = %envelope.envelope_id,
                correlation_id = %envelope.envelope_id,
                media_buy_id = media_buy_field,
                "acknowledged slack envelope"
            ),
            Err(error) => warn!(
                event_name = "ingress.slack.ack_sent",
                envelope_id = %envelope.envelope_id,
                correlation_id = %envelope.envelope_id,
                media_buy_id = media_buy_field,
                error = %error,
                "failed to acknowledge slack envelope"
            ),
        }

        let context = EventContext { correlation_id: envelope.envelope_id.clone() };
        if let Err(error) = self.dispatcher.dispatch(envelope, &context).await {
            warn!(
                envelope_id = %envelope.envelope_id,
                correlation_id = %envelope.envelope_id,
                media_buy_id = media_buy_field,
                error = %error,
                "event dispatch failed; continuing ingress loop"
            );
        }
    }
}

fn correlation_media_buy_id(envelope: &SlackEnvelope) -> Option<String> {
    match &envelope.event {
        // Skip the verb: "status" and "submit" themselves parse as id tokens.
        SlackEvent::SlashCommand(payload) => {
            payload.text.split_whitespace().skip(1).find_map(parse_media_buy_id_token)
        }
        SlackEvent::BlockAction(event) => event.value.clone(),
        SlackEvent::ViewSubmission(event) => Some(event.media_buy_id.clone()),
        SlackEvent::Unsupported { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{
        correlation_media_buy_id, ReconnectPolicy, SocketModeRunner, SocketTransport,
        TransportError,
    };
    use crate::commands::SlashCommandPayload;
    use crate::events::{EventDispatcher, SlackEnvelope, SlackEvent};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Fails the first `failures` connects, then serves the queued envelopes.
    struct FlakyTransport {
        failures: usize,
        connects: AtomicUsize,
        envelopes: Mutex<Vec<SlackEnvelope>>,
        acked: Mutex<Vec<String>>,
    }

    impl FlakyTransport {
        fn new(failures: usize, envelopes: Vec<SlackEnvelope>) -> Self {
            Self {
                failures,
                connects: AtomicUsize::new(0),
                envelopes: Mutex::new(envelopes),
                acked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SocketTransport for FlakyTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let attempt = self.connects.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(TransportError::Connect(format!("refused on attempt {attempt}")));
            }
            Ok(())
        }

        async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
            let mut queue = self.envelopes.lock().await;
            if queue.is_empty() {
                Ok(None)
            } else {
                Ok(Some(queue.remove(0)))
            }
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            self.acked.lock().await.push(envelope_id.to_owned());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn unsupported_envelope(id: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: id.to_owned(),
            event: SlackEvent::Unsupported { event_type: "test".to_owned() },
        }
    }

    fn instant_retries(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let transport =
            Arc::new(FlakyTransport::new(1, vec![unsupported_envelope("env-1")]));
        let runner = SocketModeRunner::new(
            transport.clone(),
            EventDispatcher::default(),
            instant_retries(2),
        );

        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        assert_eq!(*transport.acked.lock().await, vec!["env-1".to_owned()]);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(FlakyTransport::new(usize::MAX, Vec::new()));
        let runner = SocketModeRunner::new(
            transport.clone(),
            EventDispatcher::default(),
            instant_retries(2),
        );

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connects.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn backoff_is_capped_at_the_policy_maximum() {
        let policy = ReconnectPolicy { max_retries: 10, base_delay_ms: 250, max_delay_ms: 5_000 };
        assert_eq!(policy.backoff(0).as_millis(), 250);
        assert_eq!(policy.backoff(1).as_millis(), 500);
        assert_eq!(policy.backoff(40).as_millis(), 5_000);
    }

    #[test]
    fn extracts_media_buy_correlation_from_slash_commands() {
        let envelope = SlackEnvelope {
            envelope_id: "env-2".to_owned(),
            event: SlackEvent::SlashCommand(SlashCommandPayload {
                command: "/campaign".to_owned(),
                text: "status nike_running_q1".to_owned(),
                channel_id: "C1".to_owned(),
                user_id: "U1".to_owned(),
                trigger_ts: "1730000000.1000".to_owned(),
                request_id: "req-1".to_owned(),
            }),
        };

        assert_eq!(
            correlation_media_buy_id(&envelope).as_deref(),
            Some("nike_running_q1")
        );
    }
}
