//! Reconnecting, buffered message sender.
//!
//! [`BufferedSender::send`] only enqueues. A dedicated worker task owns the
//! socket: it connects (retrying until the connect timeout), writes queued
//! messages in order and removes each one only after its write succeeded.
//! When the connection breaks the worker reports it, reconnects with a fresh
//! timeout budget and resends the message that failed. When a connect phase
//! times out the sender is dead for good.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::errors::{MessagingError, MessagingResult};
use crate::domain::models::{ConnectionId, ConnectionState, TransportConfig};
use crate::domain::ports::ConnectionListener;
use crate::infrastructure::transport::reconnect::shutdown_requested;
use crate::infrastructure::transport::{
    connect_with_retry, ConnectOutcome, ConnectionEndpoint, EndpointFactory, Framing,
    RetryPolicy, TcpConnector,
};
use crate::services::send_queue::SendQueue;

/// How long `shutdown` waits for the worker before aborting it, and again
/// after aborting.
const JOIN_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// Asynchronous sender with a bounded queue and automatic reconnection.
pub struct BufferedSender {
    connection_id: ConnectionId,
    factory: Arc<dyn EndpointFactory>,
    listener: Arc<dyn ConnectionListener>,
    policy: RetryPolicy,
    queue: Arc<SendQueue>,
    lifecycle: Mutex<Lifecycle>,
    shutdown_tx: watch::Sender<bool>,
    state: Arc<watch::Sender<ConnectionState>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BufferedSender {
    /// Sender that dials `address` (`host:port`) and only writes.
    pub fn connect_to(
        address: impl Into<String>,
        connection_id: ConnectionId,
        transport: &TransportConfig,
        listener: Arc<dyn ConnectionListener>,
    ) -> Self {
        let connector = TcpConnector::new(address, connection_id, Framing::from(transport));
        Self::with_factory(Arc::new(connector), connection_id, transport, listener)
    }

    /// Sender driving an arbitrary endpoint factory.
    pub fn with_factory(
        factory: Arc<dyn EndpointFactory>,
        connection_id: ConnectionId,
        transport: &TransportConfig,
        listener: Arc<dyn ConnectionListener>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            connection_id,
            factory,
            listener,
            policy: RetryPolicy::from(transport),
            queue: Arc::new(SendQueue::new(transport.queue_capacity)),
            lifecycle: Mutex::new(Lifecycle::Idle),
            shutdown_tx,
            state: Arc::new(state),
            worker: Mutex::new(None),
        }
    }

    /// Launches the worker task. Returns immediately; connecting happens in
    /// the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> MessagingResult<()> {
        let mut lifecycle = self.lifecycle.lock()?;
        match *lifecycle {
            Lifecycle::Running => return Err(MessagingError::AlreadyStarted),
            Lifecycle::Stopped => return Err(MessagingError::ShutDown),
            Lifecycle::Idle => {}
        }

        let runtime = Handle::try_current().map_err(|_| MessagingError::NoRuntime)?;
        let worker = SendWorker {
            connection_id: self.connection_id,
            factory: self.factory.clone(),
            listener: self.listener.clone(),
            policy: self.policy,
            queue: self.queue.clone(),
            state: self.state.clone(),
            shutdown: self.shutdown_tx.subscribe(),
        };
        let handle = runtime.spawn(worker.run());
        *self.worker.lock()? = Some(handle);
        *lifecycle = Lifecycle::Running;

        tracing::info!(
            connection_id = %self.connection_id,
            queue_capacity = self.queue.capacity(),
            connect_timeout = ?self.policy.timeout,
            "Buffered sender started"
        );
        Ok(())
    }

    /// Queues `message` for delivery, waiting while the queue is full.
    ///
    /// Returning `Ok` means the message is queued, not that it was delivered.
    ///
    /// # Errors
    ///
    /// `NotStarted` before [`start`](Self::start), `ShutDown` after
    /// [`shutdown`](Self::shutdown), and `TimedOut` once the worker gave up
    /// connecting.
    pub async fn send(&self, message: impl Into<String>) -> MessagingResult<()> {
        self.ensure_accepting()?;

        match self.queue.push(message.into()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(self.rejection()),
        }
    }

    /// Stops the worker and closes the connection. Calling it again is a no-op.
    ///
    /// Messages still queued are discarded.
    pub async fn shutdown(&self) -> MessagingResult<()> {
        {
            let mut lifecycle = self.lifecycle.lock()?;
            if *lifecycle == Lifecycle::Stopped {
                return Ok(());
            }
            *lifecycle = Lifecycle::Stopped;
        }

        self.shutdown_tx.send_replace(true);
        self.queue.close();

        let worker = self.worker.lock()?.take();
        if let Some(handle) = worker {
            self.join_worker(handle).await;
        }

        self.factory.release();
        self.state.send_replace(ConnectionState::Closed);
        tracing::info!(
            connection_id = %self.connection_id,
            discarded = self.queue.len(),
            "Buffered sender shut down"
        );
        Ok(())
    }

    /// Current connection state as seen by the worker.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver observing every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Number of queued messages not yet written.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Id reported to the listener with every event.
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Fails unless the sender is running and has not timed out.
    pub(crate) fn ensure_accepting(&self) -> MessagingResult<()> {
        match *self.lifecycle.lock()? {
            Lifecycle::Idle => Err(MessagingError::NotStarted),
            Lifecycle::Stopped => Err(MessagingError::ShutDown),
            Lifecycle::Running if self.state() == ConnectionState::TimedOut => {
                Err(MessagingError::TimedOut(self.connection_id))
            }
            Lifecycle::Running => Ok(()),
        }
    }

    fn rejection(&self) -> MessagingError {
        if self.state() == ConnectionState::TimedOut {
            MessagingError::TimedOut(self.connection_id)
        } else {
            MessagingError::ShutDown
        }
    }

    async fn join_worker(&self, mut handle: JoinHandle<()>) {
        match tokio::time::timeout(JOIN_WINDOW, &mut handle).await {
            Ok(Ok(())) => return,
            Ok(Err(err)) => {
                tracing::error!(connection_id = %self.connection_id, error = %err, "Send worker failed");
                return;
            }
            Err(_) => {
                tracing::warn!(
                    connection_id = %self.connection_id,
                    "Send worker did not stop in time, aborting it"
                );
            }
        }

        handle.abort();
        match tokio::time::timeout(JOIN_WINDOW, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) if err.is_cancelled() => {
                tracing::debug!(connection_id = %self.connection_id, "Send worker aborted");
            }
            Ok(Err(err)) => {
                tracing::error!(connection_id = %self.connection_id, error = %err, "Send worker failed");
            }
            Err(_) => {
                tracing::error!(
                    connection_id = %self.connection_id,
                    "Send worker failed to terminate"
                );
            }
        }
    }
}

impl Drop for BufferedSender {
    fn drop(&mut self) {
        // Lets a worker of a sender that was never shut down wind itself up.
        self.shutdown_tx.send_replace(true);
        self.queue.close();
    }
}

impl std::fmt::Debug for BufferedSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedSender")
            .field("connection_id", &self.connection_id)
            .field("state", &self.state())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

enum Step {
    Write(String),
    Lost(io::Error),
    Stop,
}

/// State owned by the background task.
struct SendWorker {
    connection_id: ConnectionId,
    factory: Arc<dyn EndpointFactory>,
    listener: Arc<dyn ConnectionListener>,
    policy: RetryPolicy,
    queue: Arc<SendQueue>,
    state: Arc<watch::Sender<ConnectionState>>,
    shutdown: watch::Receiver<bool>,
}

impl SendWorker {
    async fn run(mut self) {
        let Some(mut endpoint) = self.establish().await else {
            return;
        };

        loop {
            let step = tokio::select! {
                biased;
                () = shutdown_requested(&mut self.shutdown) => Step::Stop,
                err = endpoint.hangup() => Step::Lost(err),
                () = self.factory.lost() => Step::Lost(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "inbound side of the connection failed",
                )),
                head = self.queue.peek() => head.map_or(Step::Stop, Step::Write),
            };

            match step {
                Step::Write(message) => match endpoint.send(&message).await {
                    Ok(()) => {
                        self.queue.pop_front();
                        tracing::trace!(
                            connection_id = %self.connection_id,
                            bytes = message.len(),
                            "Message written"
                        );
                    }
                    Err(err) => match self.reconnect(endpoint, &err).await {
                        Some(next) => endpoint = next,
                        None => return,
                    },
                },
                Step::Lost(err) => match self.reconnect(endpoint, &err).await {
                    Some(next) => endpoint = next,
                    None => return,
                },
                Step::Stop => break,
            }
        }

        endpoint.close().await;
        tracing::debug!(connection_id = %self.connection_id, "Send worker stopped");
    }

    /// Runs one connect phase. `None` means the worker must exit.
    async fn establish(&mut self) -> Option<ConnectionEndpoint> {
        self.state.send_replace(ConnectionState::Connecting);
        tracing::debug!(connection_id = %self.connection_id, "Connecting");

        match connect_with_retry(self.factory.as_ref(), self.policy, &mut self.shutdown).await {
            ConnectOutcome::Connected(endpoint) => {
                self.state.send_replace(ConnectionState::Connected);
                tracing::info!(
                    connection_id = %self.connection_id,
                    peer = ?endpoint.peer_addr(),
                    "Connection established"
                );
                self.listener.on_connection_established(self.connection_id);
                Some(endpoint)
            }
            ConnectOutcome::TimedOut => {
                self.state.send_replace(ConnectionState::TimedOut);
                self.queue.close();
                tracing::warn!(
                    connection_id = %self.connection_id,
                    timeout = ?self.policy.timeout,
                    abandoned = self.queue.len(),
                    "Connection timed out, sender stopped"
                );
                self.listener.on_connection_timed_out(self.connection_id);
                None
            }
            ConnectOutcome::Cancelled => None,
        }
    }

    async fn reconnect(
        &mut self,
        endpoint: ConnectionEndpoint,
        cause: &io::Error,
    ) -> Option<ConnectionEndpoint> {
        drop(endpoint);
        self.factory.release();
        self.state.send_replace(ConnectionState::Disconnected);
        tracing::warn!(
            connection_id = %self.connection_id,
            error = %cause,
            pending = self.queue.len(),
            "Connection lost, reconnecting"
        );
        self.listener.on_connection_lost(self.connection_id);

        self.establish().await
    }
}
