//! Async driver for one [`FieldSynchronizer`].
//!
//! A spawned task exclusively owns the engine. [`SyncHandle`] talks to it
//! over an mpsc command channel and reads the published [`SyncView`] from a
//! watch channel. The task arms the debounce and status timers with
//! `sleep_until`, runs each save in its own task and feeds the outcome back
//! into the engine.

use crate::endpoint::PersistenceEndpoint;
use crate::error::{ClientError, Result};
use fieldsync_engine::{
    FieldKey, FieldSynchronizer, FieldValue, FlushRequest, FlushTicket, Patch, RecordId,
    SaveFailure, SaveStatus, SyncConfig, SyncView, Timestamp,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

enum Command<K: FieldKey> {
    Edit {
        key: K,
        value: FieldValue,
    },
    FlushNow,
    ApplyAuthoritative {
        values: Patch<K>,
        respond: oneshot::Sender<std::result::Result<(), fieldsync_engine::Error>>,
    },
    Snapshot {
        respond: oneshot::Sender<SyncView<K>>,
    },
    Shutdown {
        respond: oneshot::Sender<()>,
    },
}

/// Handle to a running driver. Cheap to clone.
///
/// When every handle is dropped the driver flushes what is queued, waits for
/// the request in flight and exits.
#[derive(Clone)]
pub struct SyncHandle<K: FieldKey> {
    record_id: RecordId,
    commands: mpsc::UnboundedSender<Command<K>>,
    view: watch::Receiver<SyncView<K>>,
}

impl<K: FieldKey> SyncHandle<K> {
    /// Seed an engine from `snapshot` and start driving it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<E>(
        record_id: impl Into<RecordId>,
        snapshot: Patch<K>,
        config: SyncConfig,
        endpoint: Arc<E>,
    ) -> Result<Self>
    where
        E: PersistenceEndpoint<K> + ?Sized + 'static,
    {
        let sync = FieldSynchronizer::new(record_id, snapshot, config)?;
        Ok(Self::spawn_with(sync, endpoint))
    }

    /// Drive an already constructed engine.
    pub fn spawn_with<E>(sync: FieldSynchronizer<K>, endpoint: Arc<E>) -> Self
    where
        E: PersistenceEndpoint<K> + ?Sized + 'static,
    {
        let record_id = sync.record_id().clone();
        let (commands, inbox) = mpsc::unbounded_channel();
        let (publisher, view) = watch::channel(sync.view());

        let driver = Driver {
            sync,
            endpoint,
            inbox,
            inbox_open: true,
            publisher,
            origin: Instant::now(),
            pending: None,
            closing: false,
            waiters: Vec::new(),
        };
        tokio::spawn(driver.run());

        Self {
            record_id,
            commands,
            view,
        }
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    fn send(&self, command: Command<K>) -> Result<()> {
        self.commands.send(command).map_err(|_| ClientError::Closed)
    }

    /// Record a local edit. Fire-and-forget: the value shows up in the next
    /// published view and is saved after the debounce interval.
    pub fn apply_edit(&self, key: K, value: impl Into<FieldValue>) -> Result<()> {
        self.send(Command::Edit {
            key,
            value: value.into(),
        })
    }

    /// Send queued edits now instead of waiting for the debounce.
    pub fn flush_now(&self) -> Result<()> {
        self.send(Command::FlushNow)
    }

    /// Replace values with authoritative ones, e.g. after a change
    /// notification. Refused while this session has unconfirmed edits.
    pub async fn apply_authoritative(&self, values: Patch<K>) -> Result<()> {
        let (respond, response) = oneshot::channel();
        self.send(Command::ApplyAuthoritative { values, respond })?;
        response.await.map_err(|_| ClientError::Closed)??;
        Ok(())
    }

    /// View after every command sent so far has been applied.
    pub async fn snapshot(&self) -> Result<SyncView<K>> {
        let (respond, response) = oneshot::channel();
        self.send(Command::Snapshot { respond })?;
        response.await.map_err(|_| ClientError::Closed)
    }

    /// Latest published view.
    pub fn view(&self) -> SyncView<K> {
        self.view.borrow().clone()
    }

    /// Receiver notified whenever the view changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncView<K>> {
        self.view.clone()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.view.borrow().status
    }

    pub fn pending_keys(&self) -> Vec<K> {
        self.view.borrow().pending_keys.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.view.borrow().last_error.clone()
    }

    pub fn value(&self, key: K) -> Option<FieldValue> {
        self.view.borrow().values.get(&key).cloned()
    }

    /// Flush queued edits, wait for the request in flight and stop the
    /// driver. Other handles get [`ClientError::Closed`] afterwards.
    pub async fn shutdown(self) -> Result<()> {
        let (respond, response) = oneshot::channel();
        self.send(Command::Shutdown { respond })?;
        response.await.map_err(|_| ClientError::Closed)
    }
}

/// A save running in its own task.
struct Pending<K: FieldKey> {
    ticket: FlushTicket,
    handle: JoinHandle<std::result::Result<Patch<K>, SaveFailure>>,
}

/// Resolve once the pending save finished; never while nothing is pending.
async fn settled<K: FieldKey>(
    pending: &mut Option<Pending<K>>,
) -> (FlushTicket, std::result::Result<Patch<K>, SaveFailure>) {
    match pending {
        Some(pending) => {
            let result = match (&mut pending.handle).await {
                Ok(result) => result,
                Err(err) => Err(SaveFailure::transport(format!("save task failed: {err}"))),
            };
            (pending.ticket, result)
        }
        None => std::future::pending().await,
    }
}

struct Driver<K: FieldKey, E: ?Sized> {
    sync: FieldSynchronizer<K>,
    endpoint: Arc<E>,
    inbox: mpsc::UnboundedReceiver<Command<K>>,
    inbox_open: bool,
    publisher: watch::Sender<SyncView<K>>,
    origin: Instant,
    pending: Option<Pending<K>>,
    closing: bool,
    waiters: Vec<oneshot::Sender<()>>,
}

impl<K, E> Driver<K, E>
where
    K: FieldKey,
    E: PersistenceEndpoint<K> + ?Sized + 'static,
{
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }

    fn instant(&self, at: Timestamp) -> Instant {
        self.origin + Duration::from_millis(at)
    }

    async fn run(mut self) {
        debug!(record_id = %self.sync.record_id(), "sync driver started");

        loop {
            if self.closing {
                let request = self.sync.flush_now(self.now());
                self.dispatch(request);
                if self.pending.is_none() {
                    break;
                }
            }

            let deadline = self.sync.next_deadline();
            let wake = self.instant(deadline.unwrap_or_default());

            tokio::select! {
                command = self.inbox.recv(), if self.inbox_open => match command {
                    Some(command) => self.handle(command),
                    None => {
                        self.inbox_open = false;
                        self.closing = true;
                    }
                },
                (ticket, result) = settled(&mut self.pending) => {
                    self.pending = None;
                    self.finish(ticket, result);
                }
                _ = sleep_until(wake), if deadline.is_some() => {
                    let request = self.sync.tick(self.now());
                    self.dispatch(request);
                }
            }

            self.publish();
        }

        self.publish();
        info!(
            record_id = %self.sync.record_id(),
            status = %self.sync.save_status(),
            "sync driver stopped"
        );
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn handle(&mut self, command: Command<K>) {
        match command {
            Command::Edit { key, value } => {
                let deadline = self.sync.apply_edit(key, value, self.now());
                debug!(
                    record_id = %self.sync.record_id(),
                    key = key.name(),
                    ?deadline,
                    "edit applied"
                );
            }
            Command::FlushNow => {
                let request = self.sync.flush_now(self.now());
                self.dispatch(request);
            }
            Command::ApplyAuthoritative { values, respond } => {
                let result = self.sync.apply_authoritative(values);
                if let Err(err) = &result {
                    debug!(
                        record_id = %self.sync.record_id(),
                        %err,
                        "authoritative values refused"
                    );
                }
                let _ = respond.send(result);
            }
            Command::Snapshot { respond } => {
                let _ = respond.send(self.sync.view());
            }
            Command::Shutdown { respond } => {
                self.waiters.push(respond);
                self.closing = true;
                // Buffered commands are still drained; new sends fail
                self.inbox.close();
            }
        }
    }

    /// Start the save for `request`, if any.
    fn dispatch(&mut self, request: Option<FlushRequest<K>>) {
        let Some(FlushRequest {
            ticket,
            record_id,
            patch,
        }) = request
        else {
            return;
        };

        debug!(
            %record_id,
            %ticket,
            keys = ?fieldsync_engine::key_names(patch.keys().copied()),
            "sending patch"
        );

        let endpoint = Arc::clone(&self.endpoint);
        let handle = tokio::spawn(async move { endpoint.save(&record_id, patch).await });
        self.pending = Some(Pending { ticket, handle });
    }

    fn finish(&mut self, ticket: FlushTicket, result: std::result::Result<Patch<K>, SaveFailure>) {
        if let Err(failure) = &result {
            warn!(record_id = %self.sync.record_id(), %ticket, %failure, "save failed");
        }

        match self.sync.complete_flush(ticket, result, self.now()) {
            Ok(settlement) => {
                let report = &settlement.report;
                info!(
                    record_id = %self.sync.record_id(),
                    %ticket,
                    adopted = ?fieldsync_engine::key_names(report.adopted.iter().copied()),
                    rolled_back = ?fieldsync_engine::key_names(report.rolled_back.iter().copied()),
                    superseded = ?fieldsync_engine::key_names(report.superseded.iter().copied()),
                    status = %self.sync.save_status(),
                    "flush settled"
                );
                self.dispatch(settlement.next);
            }
            Err(err) => {
                warn!(
                    record_id = %self.sync.record_id(),
                    %ticket,
                    %err,
                    "stale completion ignored"
                );
            }
        }
    }

    fn publish(&self) {
        let view = self.sync.view();
        self.publisher.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
