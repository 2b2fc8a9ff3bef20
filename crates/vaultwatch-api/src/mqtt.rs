// MQTT command publisher
//
// Holds one long-lived broker session for the lifetime of the process.
// The rumqttc event loop runs in its own task; publishing only enqueues
// the packet, so a slow broker never stalls the caller beyond `timeout`.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;

const REQUEST_CHANNEL_CAPACITY: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String,
    pub keep_alive: Duration,
    /// Upper bound on how long a publish may wait for queue space.
    pub publish_timeout: Duration,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: "vaultwatch".into(),
            topic: "salle_forte/commande".into(),
            keep_alive: Duration::from_secs(5),
            publish_timeout: crate::transport::DEFAULT_TIMEOUT,
        }
    }
}

/// Observable state of the broker link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Down { reason: String },
}

/// Publishes plaintext command tokens to a fixed topic.
pub struct MqttPublisher {
    client: AsyncClient,
    settings: MqttSettings,
    link: watch::Receiver<LinkState>,
    cancel: CancellationToken,
    event_loop: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for MqttPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttPublisher")
            .field("settings", &self.settings)
            .field("link", &*self.link.borrow())
            .finish_non_exhaustive()
    }
}

impl MqttPublisher {
    /// Open the broker session and spawn its event loop.
    ///
    /// Must be called from within a Tokio runtime. The connection itself
    /// is established lazily by the event loop; until the broker accepts
    /// it the link reports [`LinkState::Connecting`].
    pub fn connect(settings: MqttSettings) -> Self {
        let mut options = MqttOptions::new(
            settings.client_id.clone(),
            settings.host.clone(),
            settings.port,
        );
        options.set_keep_alive(settings.keep_alive.max(MIN_KEEP_ALIVE));

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let (link_tx, link) = watch::channel(LinkState::Connecting);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(drive_event_loop(event_loop, link_tx, cancel.clone()));
        debug!(host = %settings.host, port = settings.port, "MQTT event loop started");

        Self {
            client,
            settings,
            link,
            cancel,
            event_loop: std::sync::Mutex::new(Some(handle)),
        }
    }

    pub fn settings(&self) -> &MqttSettings {
        &self.settings
    }

    /// Current broker link state.
    pub fn link_state(&self) -> LinkState {
        self.link.borrow().clone()
    }

    /// Publish `token` to the configured topic with QoS 1.
    ///
    /// Waits up to `publish_timeout` for the first connection attempt to
    /// settle. Fails with [`Error::BrokerUnavailable`] when the link is
    /// down, and with [`Error::Timeout`] when the broker never answers or
    /// the request queue stays full.
    pub async fn publish(&self, token: &str) -> Result<(), Error> {
        let timeout = self.settings.publish_timeout;
        let timed_out = || Error::Timeout {
            timeout_secs: timeout.as_secs(),
        };

        let mut link = self.link.clone();
        let state = tokio::time::timeout(
            timeout,
            link.wait_for(|s| !matches!(s, LinkState::Connecting)),
        )
        .await
        .map_err(|_| timed_out())?
        .map(|s| (*s).clone())
        .map_err(|_| Error::BrokerUnavailable {
            reason: "MQTT event loop stopped".into(),
        })?;

        if let LinkState::Down { reason } = state {
            return Err(Error::BrokerUnavailable { reason });
        }

        debug!(topic = %self.settings.topic, token, "publishing command");
        let publish = self.client.publish(
            self.settings.topic.clone(),
            QoS::AtLeastOnce,
            false,
            token.as_bytes().to_vec(),
        );

        match tokio::time::timeout(timeout, publish).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(timed_out()),
        }
    }

    /// Send DISCONNECT and stop the event loop task.
    ///
    /// Queued publishes are flushed first; the loop exits once the
    /// DISCONNECT packet is written, or is cancelled after `publish_timeout`.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.try_disconnect() {
            debug!(error = %e, "disconnect request not queued");
            self.cancel.cancel();
        }

        let handle = self
            .event_loop
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(mut handle) = handle {
            if tokio::time::timeout(self.settings.publish_timeout, &mut handle)
                .await
                .is_err()
            {
                debug!("MQTT event loop did not drain in time");
                self.cancel.cancel();
                let _ = handle.await;
            }
        }
        self.cancel.cancel();
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Poll the rumqttc event loop until cancelled, mirroring link state.
///
/// rumqttc reconnects on the next `poll()` after an error, so errors are
/// only logged and followed by a short pause.
async fn drive_event_loop(
    mut event_loop: EventLoop,
    link: watch::Sender<LinkState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            polled = event_loop.poll() => match polled {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("connected to MQTT broker");
                    let _ = link.send(LinkState::Connected);
                }
                Ok(Event::Incoming(Packet::PubAck(ack))) => {
                    debug!(pkid = ack.pkid, "command acknowledged by broker");
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("DISCONNECT sent");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "MQTT connection error");
                    let _ = link.send(LinkState::Down { reason: e.to_string() });
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
    }
    debug!("MQTT event loop stopped");
}
