//! Registrations issued by the service and their delivery queues.
//!
//! Each registration owns a bounded queue drained by its own Tokio task,
//! so one slow callback never holds up another registration while events
//! for the same registration keep their arrival order.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::listener::{dispatch, ExtPhoneCallback};
use crate::connection::ConnectionManager;
use crate::error::{ExtPhoneError, Result};
use crate::transport::{Registration, RegistrationKind};
use crate::types::{Client, EventKind, EventSet, InboundEvent};

struct Entry {
    package: String,
    interest: EventSet,
    queue: mpsc::Sender<Arc<InboundEvent>>,
    active: Arc<AtomicBool>,
}

impl Entry {
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Local view of the registrations valid on the current connection.
pub struct ClientRegistry {
    entries: Mutex<HashMap<Client, Entry>>,
    queue_capacity: usize,
}

impl ClientRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register `callback` with the service and start delivering to it.
    ///
    /// `Ok(None)` when not connected, when the service refused, or when the
    /// connection changed while the registration was in flight.
    pub(crate) async fn register(
        &self,
        connection: &ConnectionManager,
        package: &str,
        callback: Arc<dyn ExtPhoneCallback>,
        kind: RegistrationKind,
    ) -> Result<Option<Client>> {
        if package.trim().is_empty() {
            return Err(ExtPhoneError::InvalidArgument(
                "package name must not be empty".into(),
            ));
        }
        if let RegistrationKind::Events(set) = &kind {
            if set.is_empty() {
                return Err(ExtPhoneError::InvalidArgument(
                    "event set must not be empty".into(),
                ));
            }
        }

        let Some(live) = connection.live() else {
            tracing::warn!(package, "register: service not connected");
            return Ok(None);
        };

        let interest = kind.interest();
        let registration = Registration {
            package: package.to_string(),
            kind,
        };
        let client = match live.service.register(registration).await {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(package, error = %e, "register: service call failed");
                return Ok(None);
            }
        };

        let bound = connection.if_current(live.epoch, || {
            self.bind(client, package, callback, interest)
        });
        if bound.is_none() {
            tracing::debug!(%client, "connection changed while registering, handle discarded");
            return Ok(None);
        }

        tracing::debug!(%client, package, kinds = interest.len(), "client registered");
        Ok(Some(client))
    }

    /// Drop `client` locally and tell the service if still connected.
    ///
    /// Unknown or already removed clients are ignored.
    pub(crate) async fn unregister(&self, connection: &ConnectionManager, client: Client) {
        let Some(entry) = self.entries.lock().remove(&client) else {
            tracing::debug!(%client, "unregister: not registered");
            return;
        };
        entry.deactivate();

        if let Some(live) = connection.live() {
            if let Err(e) = live.service.unregister(client).await {
                tracing::warn!(%client, error = %e, "unregister: service call failed");
            }
        }
        tracing::debug!(%client, package = %entry.package, "client unregistered");
    }

    pub(super) fn bind(
        &self,
        client: Client,
        package: &str,
        callback: Arc<dyn ExtPhoneCallback>,
        interest: EventSet,
    ) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let active = Arc::new(AtomicBool::new(true));
        tokio::spawn(deliver_loop(client, callback, rx, active.clone()));

        let entry = Entry {
            package: package.to_string(),
            interest,
            queue: tx,
            active,
        };
        if let Some(old) = self.entries.lock().insert(client, entry) {
            old.deactivate();
        }
    }

    /// Forget every registration. Their delivery tasks stop without
    /// running anything still queued.
    pub(crate) fn clear(&self) {
        let drained: Vec<Entry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            entry.deactivate();
        }
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "registrations invalidated");
        }
    }

    pub fn contains(&self, client: Client) -> bool {
        self.entries.lock().contains_key(&client)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue `event` for `client`. `false` if unknown.
    pub(crate) fn enqueue_to(&self, client: Client, event: &Arc<InboundEvent>) -> bool {
        let entries = self.entries.lock();
        match entries.get(&client) {
            Some(entry) => {
                offer(client, entry, event);
                true
            }
            None => false,
        }
    }

    /// Queue `event` for every registration interested in `kind`.
    /// Returns how many were reached.
    pub(crate) fn enqueue_interested(&self, kind: EventKind, event: &Arc<InboundEvent>) -> usize {
        let entries = self.entries.lock();
        let mut reached = 0;
        for (client, entry) in entries.iter() {
            if entry.interest.contains(kind) {
                offer(*client, entry, event);
                reached += 1;
            }
        }
        reached
    }
}

fn offer(client: Client, entry: &Entry, event: &Arc<InboundEvent>) {
    match entry.queue.try_send(event.clone()) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(%client, kind = ?event.kind(), "delivery queue full, event dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(%client, "delivery task gone, event dropped");
        }
    }
}

async fn deliver_loop(
    client: Client,
    callback: Arc<dyn ExtPhoneCallback>,
    mut rx: mpsc::Receiver<Arc<InboundEvent>>,
    active: Arc<AtomicBool>,
) {
    while let Some(event) = rx.recv().await {
        if !active.load(Ordering::Acquire) {
            break;
        }
        let outcome = catch_unwind(AssertUnwindSafe(|| dispatch(callback.as_ref(), &event)));
        if outcome.is_err() {
            tracing::error!(%client, kind = ?event.kind(), "callback panicked");
        }
    }
    tracing::trace!(%client, "delivery task finished");
}
