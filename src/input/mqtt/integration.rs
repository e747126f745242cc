//! Broker session for one Enviro Indoor topic.
//!
//! Owns the subscription lifecycle: connect, subscribe on every accepted
//! connection, follow transport drops and reconnects, tear down on shutdown.
//! Decoded readings are handed to the [`MessageHandler`] in delivery order.

use super::client::{MqttClient, MqttMessage, request_subscribe, request_teardown};
use super::connection::{ConnectionState, ConnectionTracker, Transition};
use super::handler::MessageHandler;
use crate::config::{BrokerEndpoint, MqttConfig};
use crate::error::{Result, SubscriptionError, TransportError};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, SubscribeReasonCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Buffered messages between the event loop and the handler task.
const MESSAGE_CAPACITY: usize = 64;

/// How long shutdown waits for unsubscribe and disconnect to be flushed.
const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Default)]
struct SessionTasks {
    event_loop: Option<JoinHandle<()>>,
    ingest: Option<JoinHandle<()>>,
}

/// Running connection to the broker.
///
/// Must be started from within a Tokio runtime.
pub struct EnviroSession {
    topic: String,
    endpoint: BrokerEndpoint,
    client: AsyncClient,
    handler: MessageHandler,
    tracker: Arc<ConnectionTracker>,
    cancel: CancellationToken,
    shut_down: AtomicBool,
    tasks: Mutex<SessionTasks>,
}

impl EnviroSession {
    /// Validate the configuration and spawn the event loop and handler tasks.
    ///
    /// Returns once the tasks are running; the connection itself is
    /// established in the background.
    pub fn start(config: &MqttConfig, handler: MessageHandler) -> Result<Self> {
        config.validate()?;

        let mqtt_client = MqttClient::new(config)?;
        let endpoint = mqtt_client.endpoint().clone();
        let (client, event_loop) = mqtt_client.into_parts();

        info!("[MQTT] Connecting to MQTT broker at {}", endpoint);

        let tracker = Arc::new(ConnectionTracker::new());
        let cancel = CancellationToken::new();
        let (msg_tx, msg_rx) = mpsc::channel::<MqttMessage>(MESSAGE_CAPACITY);

        let event_loop_task = tokio::spawn(run_event_loop(
            event_loop,
            EventLoopContext {
                client: client.clone(),
                topic: config.topic.clone(),
                endpoint: endpoint.clone(),
                tracker: tracker.clone(),
                cancel: cancel.clone(),
                reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            },
            msg_tx,
        ));

        let ingest_task = tokio::spawn(run_ingest(handler.clone(), msg_rx, cancel.clone()));

        Ok(Self {
            topic: config.topic.clone(),
            endpoint,
            client,
            handler,
            tracker,
            cancel,
            shut_down: AtomicBool::new(false),
            tasks: Mutex::new(SessionTasks {
                event_loop: Some(event_loop_task),
                ingest: Some(ingest_task),
            }),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn endpoint(&self) -> &BrokerEndpoint {
        &self.endpoint
    }

    pub fn handler(&self) -> &MessageHandler {
        &self.handler
    }

    pub fn state(&self) -> ConnectionState {
        self.tracker.current()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.tracker.subscribe()
    }

    /// Unsubscribe, disconnect and stop both tasks.
    ///
    /// Calling this more than once is a no-op. Messages that were received
    /// but not yet handled are dropped.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("[MQTT] Session already shut down");
            return;
        }

        debug!("Shutdown called. Unsubscribing from MQTT broker.");
        let was_connected = self.tracker.current().is_connected();
        self.tracker.transition(Transition::Shutdown);

        if let Err(e) = request_teardown(&self.client, &self.topic) {
            debug!("[MQTT] Teardown request not queued: {}", e);
        }

        let (event_loop, ingest) = {
            let mut tasks = self.tasks.lock();
            (tasks.event_loop.take(), tasks.ingest.take())
        };

        // Let the event loop flush the disconnect if there is a session to close
        if let Some(mut task) = event_loop {
            let finished = was_connected
                && match tokio::time::timeout(TEARDOWN_GRACE, &mut task).await {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        debug!("[MQTT] event loop task ended abnormally: {}", e);
                        true
                    }
                    Err(_) => {
                        warn!("[MQTT] Disconnect not confirmed, stopping event loop");
                        false
                    }
                };
            if !finished {
                self.cancel.cancel();
                join_task("event loop", task).await;
            }
        }

        self.cancel.cancel();
        if let Some(task) = ingest {
            join_task("ingest", task).await;
        }

        info!("[MQTT] Session closed");
    }
}

impl Drop for EnviroSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct EventLoopContext {
    client: AsyncClient,
    topic: String,
    endpoint: BrokerEndpoint,
    tracker: Arc<ConnectionTracker>,
    cancel: CancellationToken,
    reconnect_delay: Duration,
}

impl EventLoopContext {
    fn on_connected(&self) {
        info!("[MQTT] Connected to MQTT broker {}", self.endpoint);
        if self.tracker.transition(Transition::ConnectAccepted) == ConnectionState::ShutDown {
            return;
        }

        // Clean sessions drop subscriptions, so subscribe on every connect
        match request_subscribe(&self.client, &self.topic) {
            Ok(()) => {
                self.tracker.transition(Transition::SubscribeRequested);
            }
            Err(e) => {
                error!("[MQTT] Unable to subscribe: {}", e);
                self.tracker.transition(Transition::SubscribeFailed);
            }
        }
    }

    fn on_subscribed(&self, return_codes: &[SubscribeReasonCode]) {
        if return_codes
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure))
        {
            let e = SubscriptionError::Rejected(self.topic.clone());
            error!("[MQTT] Unable to subscribe: {}", e);
            self.tracker.transition(Transition::SubscribeFailed);
        } else {
            debug!("[MQTT] {} was subscribed", self.topic);
            self.tracker.transition(Transition::SubscribeGranted);
        }
    }

    fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled() || self.tracker.current() == ConnectionState::ShutDown
    }
}

/// Poll the transport and forward publishes to the handler task.
///
/// A failed poll is retried after the reconnect delay; rumqttc reconnects
/// on the next poll.
async fn run_event_loop(
    mut event_loop: EventLoop,
    ctx: EventLoopContext,
    tx: mpsc::Sender<MqttMessage>,
) {
    ctx.tracker.transition(Transition::ConnectAttempt);

    loop {
        let polled = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            polled = event_loop.poll() => polled,
        };

        match polled {
            Ok(Event::Incoming(Packet::ConnAck(_))) => ctx.on_connected(),
            Ok(Event::Incoming(Packet::SubAck(ack))) => ctx.on_subscribed(&ack.return_codes),
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let msg = MqttMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };
                if tx.send(msg).await.is_err() {
                    debug!("[MQTT] Message channel closed");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("[MQTT] Disconnected from MQTT broker");
                ctx.tracker.transition(Transition::TransportLost);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("[MQTT] Disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if ctx.is_shut_down() {
                    break;
                }

                let e = TransportError::from(e);
                error!("[MQTT] Problem with MQTT broker: {}", e);
                if ctx.tracker.current().is_connected() {
                    warn!("[MQTT] Disconnected from MQTT broker");
                }
                ctx.tracker.transition(Transition::TransportLost);

                tokio::select! {
                    _ = ctx.cancel.cancelled() => break,
                    _ = tokio::time::sleep(ctx.reconnect_delay) => {}
                }
                ctx.tracker.transition(Transition::ConnectAttempt);
            }
        }
    }

    debug!("[MQTT] Event loop stopped");
}

/// Hand messages to the handler one at a time, in arrival order.
async fn run_ingest(
    handler: MessageHandler,
    mut rx: mpsc::Receiver<MqttMessage>,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = rx.recv() => msg,
        };

        let Some(msg) = msg else {
            break;
        };

        if let Err(e) = handler.handle(&msg.payload) {
            debug!("[MQTT] Message on {} dropped: {}", msg.topic, e);
        }
    }
}

/// Wait for a session task, returning whether it finished cleanly.
async fn join_task(name: &str, task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            debug!("[MQTT] {} task ended abnormally: {}", name, e);
            false
        }
    }
}
