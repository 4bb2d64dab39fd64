//! Broker accept loops
//!
//! Runs one accept loop per port and spawns a connection handler per
//! accepted socket.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};

use crate::error::{Error, Result};
use crate::registry::TopicRegistry;
use crate::server::config::BrokerConfig;
use crate::server::connection::Connection;
use crate::server::Role;
use crate::stats::BrokerStats;

/// Consecutive non-transient accept failures before a loop gives up
const MAX_CONSECUTIVE_ACCEPT_FAILURES: u32 = 10;

/// First backoff after a failed accept; doubles up to `MAX_ACCEPT_BACKOFF`
const INITIAL_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Publish/subscribe broker
///
/// Owns the single topic registry shared by every connection it accepts.
pub struct Broker {
    config: BrokerConfig,
    registry: Arc<TopicRegistry>,
    stats: Arc<BrokerStats>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Broker {
    /// Create a new broker with the given configuration
    pub fn new(config: BrokerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let stats = Arc::new(BrokerStats::new());
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            registry: Arc::new(TopicRegistry::with_stats(Arc::clone(&stats))),
            stats,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
            shutdown_tx,
        }
    }

    /// Get a reference to the topic registry
    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Get the broker counters
    pub fn stats(&self) -> &Arc<BrokerStats> {
        &self.stats
    }

    /// Get the configuration
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Run both accept loops until they fail or the broker shuts down
    ///
    /// The loops are independent: if one listener fails the other keeps
    /// serving. Returns once both have ended, with the first failure.
    /// Shutdown is terminal, so calling this after `shutdown` returns
    /// `Ok(())` without accepting anything.
    pub async fn start(
        &self,
        publisher_listener: TcpListener,
        subscriber_listener: TcpListener,
    ) -> Result<()> {
        log_listening(&publisher_listener, Role::Publisher);
        log_listening(&subscriber_listener, Role::Subscriber);

        let (publisher, subscriber) = tokio::join!(
            self.accept_loop(&publisher_listener, Role::Publisher),
            self.accept_loop(&subscriber_listener, Role::Subscriber),
        );

        publisher.and(subscriber)
    }

    /// Run the broker with graceful shutdown
    ///
    /// When `shutdown` resolves the listeners are dropped and every live
    /// connection is told to close. In-flight deliveries are not drained.
    pub async fn run_until<F>(
        &self,
        publisher_listener: TcpListener,
        subscriber_listener: TcpListener,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.start(publisher_listener, subscriber_listener) => result,
        };

        self.shutdown();
        result
    }

    /// Stop both accept loops and tell every connection handler to terminate
    ///
    /// The broker cannot be restarted afterwards.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    async fn accept_loop<A: Acceptor>(&self, listener: &A, role: Role) -> Result<()> {
        let mut backoff = AcceptBackoff::new();
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept_connection() => accepted,
                _ = shutdown.wait_for(|stopped| *stopped) => {
                    tracing::debug!(role = %role, "Accept loop stopped by shutdown");
                    return Ok(());
                }
            };

            match accepted {
                Ok((socket, peer_addr)) => {
                    backoff.reset();
                    self.handle_connection(socket, peer_addr, role);
                }
                Err(e) if is_transient(&e) => {
                    tracing::debug!(role = %role, error = %e, "Transient accept error");
                }
                Err(e) => match backoff.on_failure() {
                    Some(delay) => {
                        tracing::error!(
                            role = %role,
                            error = %e,
                            failures = backoff.failures(),
                            backoff_ms = delay.as_millis() as u64,
                            "Failed to accept connection"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(role = %role, error = %e, "Listener failed, accept loop stopped");
                        return Err(Error::ListenerFailure { role, source: e });
                    }
                },
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr, role: Role) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.stats.connection_rejected();
                    tracing::warn!(peer = %peer_addr, role = %role, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            role = %role,
            "New connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(session_id = session_id, error = %e, "Failed to configure socket");
            return;
        }

        self.stats.connection_accepted(role);

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);
        let shutdown = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let _permit = permit;
            let mut connection = Connection::new(
                session_id, socket, peer_addr, role, config, registry, shutdown,
            );

            match connection.run().await {
                Ok(()) => {}
                Err(e) if e.is_protocol_violation() => {
                    stats.protocol_error();
                    tracing::warn!(
                        session_id = session_id,
                        peer = %peer_addr,
                        role = %role,
                        error = %e,
                        "Closing connection on protocol error"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        session_id = session_id,
                        role = %role,
                        error = %e,
                        "Connection error"
                    );
                }
            }

            tracing::debug!(
                session_id = session_id,
                duration_ms = connection.state().duration().as_millis() as u64,
                "Connection closed"
            );
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

/// Source of inbound sockets for an accept loop
pub(crate) trait Acceptor {
    fn accept_connection(
        &self,
    ) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    fn accept_connection(
        &self,
    ) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        self.accept()
    }
}

/// Consecutive-failure count and retry delay for one accept loop
#[derive(Debug)]
struct AcceptBackoff {
    failures: u32,
    next_delay: Duration,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self {
            failures: 0,
            next_delay: INITIAL_ACCEPT_BACKOFF,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a failed accept
    ///
    /// Returns the delay before the next attempt, or `None` once
    /// `MAX_CONSECUTIVE_ACCEPT_FAILURES` is reached.
    fn on_failure(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= MAX_CONSECUTIVE_ACCEPT_FAILURES {
            return None;
        }

        let delay = self.next_delay;
        self.next_delay = (self.next_delay * 2).min(MAX_ACCEPT_BACKOFF);
        Some(delay)
    }
}

/// Accept errors that concern only the connection being accepted
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

fn log_listening(listener: &TcpListener, role: Role) {
    match listener.local_addr() {
        Ok(addr) => tracing::info!(addr = %addr, role = %role, "Broker listening"),
        Err(e) => tracing::warn!(role = %role, error = %e, "Listener has no local address"),
    }
}
