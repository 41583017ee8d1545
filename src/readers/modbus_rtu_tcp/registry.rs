//! Transport connection registry
//!
//! One persistent transport per `(host, port)` and one lock per endpoint. The
//! serial line behind a gateway cannot multiplex frames, so a transaction is
//! only ever issued through a [`TransportHandle`], which holds the endpoint lock
//! for as long as it lives.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::helpers::backoff_retry;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub host: String,
    pub port: u16,
}

impl EndpointKey {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: EndpointKey,
        source: io::Error,
    },
    #[error("timed out connecting to {endpoint}")]
    ConnectTimeout { endpoint: EndpointKey },
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("protocol error from slave {slave}: {message}")]
    Exception { slave: u8, message: String },
    #[error("transport is disconnected")]
    Disconnected,
}

impl TransportError {
    /// Whether the connection can no longer be trusted after this error
    ///
    /// An exception response is a well-formed frame, so the stream is still in
    /// sync. Anything else may leave a late or partial frame on the wire.
    pub fn breaks_connection(&self) -> bool {
        !matches!(self, TransportError::Exception { .. })
    }
}

/// A live register-level client bound to one endpoint
pub trait RegisterTransport: Send {
    fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> BoxFuture<'_, Result<Vec<u16>, TransportError>>;

    fn is_connected(&self) -> bool;
}

/// Opens transports; the registry asks it for a fresh one whenever the
/// previous transport is gone or broken
pub trait Connector: Send + Sync {
    fn connect<'a>(
        &'a self,
        endpoint: &'a EndpointKey,
    ) -> BoxFuture<'a, Result<Box<dyn RegisterTransport>, TransportError>>;
}

type Slot = Option<Box<dyn RegisterTransport>>;

struct Endpoint {
    key: EndpointKey,
    connector: Arc<dyn Connector>,
    connect_retry_window: Duration,
    slot: Arc<Mutex<Slot>>,
    connected: AtomicBool,
}

/// The lock of one endpoint
///
/// Cheap to clone; all clones refer to the same lock and the same transport.
#[derive(Clone)]
pub struct EndpointLock(Arc<Endpoint>);

impl EndpointLock {
    pub fn key(&self) -> &EndpointKey {
        &self.0.key
    }

    pub fn is_connected(&self) -> bool {
        self.0.connected.load(Ordering::SeqCst)
    }

    /// Wait for the endpoint lock, then hand out the registered transport or
    /// connect a new one
    ///
    /// A transport that no longer reports itself connected is dropped and
    /// replaced. If connecting fails the slot stays empty and the lock is
    /// released with the error.
    pub async fn acquire(&self) -> Result<TransportHandle, TransportError> {
        let endpoint = &*self.0;
        let mut guard = endpoint.slot.clone().lock_owned().await;

        match guard.as_ref().map(|transport| transport.is_connected()) {
            Some(true) => {
                log::debug!("Reusing connection to {}", endpoint.key);
            }
            Some(false) => {
                log::info!("Discarding broken connection to {}", endpoint.key);
                *guard = None;
                endpoint.connected.store(false, Ordering::SeqCst);
            }
            None => {}
        }

        if guard.is_none() {
            log::debug!("Connecting to {}", endpoint.key);
            let transport = backoff_retry(endpoint.connect_retry_window, || {
                endpoint.connector.connect(&endpoint.key)
            })
            .await?;
            log::info!("Connected to {}", endpoint.key);
            *guard = Some(transport);
            endpoint.connected.store(true, Ordering::SeqCst);
        }

        Ok(TransportHandle {
            endpoint: self.clone(),
            guard,
        })
    }

    async fn close(&self) {
        let mut guard = self.0.slot.lock().await;
        if guard.take().is_some() {
            log::info!("Closed connection to {}", self.0.key);
        }
        self.0.connected.store(false, Ordering::SeqCst);
    }
}

/// Exclusive use of one endpoint's transport
///
/// Dropping the handle releases the endpoint lock.
pub struct TransportHandle {
    endpoint: EndpointLock,
    guard: OwnedMutexGuard<Slot>,
}

impl TransportHandle {
    pub async fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let transport = (*self.guard)
            .as_mut()
            .ok_or(TransportError::Disconnected)?;
        let result = transport.read_holding_registers(slave, address, count).await;

        if let Err(e) = &result {
            if e.breaks_connection() {
                log::warn!("Dropping connection to {}: {}", self.endpoint.key(), e);
                *self.guard = None;
                self.endpoint.0.connected.store(false, Ordering::SeqCst);
            }
        }
        result
    }
}

/// Owner of all endpoint locks and transports
///
/// Constructed once at startup and shared by every collector. The map itself
/// is guarded by its own lock, separate from the per-endpoint locks.
pub struct TransportRegistry {
    connector: Arc<dyn Connector>,
    connect_retry_window: Duration,
    endpoints: Mutex<HashMap<EndpointKey, EndpointLock>>,
}

impl TransportRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connect_retry_window: Duration::ZERO,
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    /// Keep retrying a failed connect with exponential backoff for up to `window`
    pub fn with_connect_retry(mut self, window: Duration) -> Self {
        self.connect_retry_window = window;
        self
    }

    /// The lock for `endpoint`, created on first use
    pub async fn lock_for(&self, endpoint: &EndpointKey) -> EndpointLock {
        let mut endpoints = self.endpoints.lock().await;
        endpoints
            .entry(endpoint.clone())
            .or_insert_with(|| {
                EndpointLock(Arc::new(Endpoint {
                    key: endpoint.clone(),
                    connector: self.connector.clone(),
                    connect_retry_window: self.connect_retry_window,
                    slot: Arc::new(Mutex::new(None)),
                    connected: AtomicBool::new(false),
                }))
            })
            .clone()
    }

    pub async fn acquire(&self, endpoint: &EndpointKey) -> Result<TransportHandle, TransportError> {
        self.lock_for(endpoint).await.acquire().await
    }

    /// Never waits on an endpoint lock
    pub async fn is_connected(&self, endpoint: &EndpointKey) -> bool {
        self.endpoints
            .lock()
            .await
            .get(endpoint)
            .is_some_and(EndpointLock::is_connected)
    }

    /// Close every transport
    ///
    /// Waits for in-flight transactions to finish. Locks stay registered so
    /// that readers holding one keep sharing it; the next `acquire` reconnects.
    /// Calling this again is harmless.
    pub async fn close_all(&self) {
        let endpoints: Vec<EndpointLock> = self.endpoints.lock().await.values().cloned().collect();
        for endpoint in endpoints {
            endpoint.close().await;
        }
    }
}
