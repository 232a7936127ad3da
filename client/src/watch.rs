//! Async driver for a [`CounterToggle`].
//!
//! Every toggle is sent right away in its own task; responses may arrive in
//! any order. Once none are left in flight the authoritative state is
//! refetched.

use crate::endpoint::WatchEndpoint;
use crate::error::{ClientError, Result};
use fieldsync_engine::{
    CounterToggle, RecordId, SaveFailure, ToggleSettlement, ToggleView, WatchState,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

enum WatchCommand {
    Toggle { respond: oneshot::Sender<ToggleView> },
    Refresh,
    Shutdown { respond: oneshot::Sender<()> },
}

/// Handle to a running watch toggle driver. Cheap to clone.
#[derive(Clone)]
pub struct WatchHandle {
    record_id: RecordId,
    commands: mpsc::UnboundedSender<WatchCommand>,
    view: watch::Receiver<ToggleView>,
}

impl WatchHandle {
    /// Start from a known authoritative state.
    pub fn spawn<E>(
        record_id: impl Into<RecordId>,
        initial: WatchState,
        endpoint: Arc<E>,
    ) -> Self
    where
        E: WatchEndpoint + ?Sized + 'static,
    {
        let record_id = record_id.into();
        let toggle = CounterToggle::new(initial);
        let (commands, inbox) = mpsc::unbounded_channel();
        let (publisher, view) = watch::channel(toggle.view());

        let driver = WatchDriver {
            record_id: record_id.clone(),
            toggle,
            endpoint,
            inbox,
            inbox_open: true,
            publisher,
            toggles: JoinSet::new(),
            fetch: None,
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

    /// Fetch the authoritative state first, then start.
    pub async fn connect<E>(record_id: impl Into<RecordId>, endpoint: Arc<E>) -> Result<Self>
    where
        E: WatchEndpoint + ?Sized + 'static,
    {
        let record_id = record_id.into();
        let initial = endpoint.fetch_watch(&record_id).await?;
        Ok(Self::spawn(record_id, initial, endpoint))
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    /// Flip the flag optimistically and send it. Returns the view right
    /// after the flip.
    pub async fn toggle(&self) -> Result<ToggleView> {
        let (respond, response) = oneshot::channel();
        self.commands
            .send(WatchCommand::Toggle { respond })
            .map_err(|_| ClientError::Closed)?;
        response.await.map_err(|_| ClientError::Closed)
    }

    /// Refetch the authoritative state once nothing is in flight.
    pub fn refresh(&self) -> Result<()> {
        self.commands
            .send(WatchCommand::Refresh)
            .map_err(|_| ClientError::Closed)
    }

    pub fn view(&self) -> ToggleView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ToggleView> {
        self.view.clone()
    }

    /// Wait for toggles and the refetch in flight, then stop.
    pub async fn shutdown(self) -> Result<()> {
        let (respond, response) = oneshot::channel();
        self.commands
            .send(WatchCommand::Shutdown { respond })
            .map_err(|_| ClientError::Closed)?;
        response.await.map_err(|_| ClientError::Closed)
    }
}

type FetchResult = std::result::Result<WatchState, SaveFailure>;

async fn fetched(fetch: &mut Option<JoinHandle<FetchResult>>) -> FetchResult {
    match fetch {
        Some(handle) => match handle.await {
            Ok(result) => result,
            Err(err) => Err(SaveFailure::transport(format!("watch fetch failed: {err}"))),
        },
        None => std::future::pending().await,
    }
}

struct WatchDriver<E: ?Sized> {
    record_id: RecordId,
    toggle: CounterToggle,
    endpoint: Arc<E>,
    inbox: mpsc::UnboundedReceiver<WatchCommand>,
    inbox_open: bool,
    publisher: watch::Sender<ToggleView>,
    toggles: JoinSet<std::result::Result<(), SaveFailure>>,
    fetch: Option<JoinHandle<FetchResult>>,
    closing: bool,
    waiters: Vec<oneshot::Sender<()>>,
}

impl<E> WatchDriver<E>
where
    E: WatchEndpoint + ?Sized + 'static,
{
    async fn run(mut self) {
        loop {
            if self.closing && self.toggles.is_empty() && self.fetch.is_none() {
                break;
            }

            tokio::select! {
                command = self.inbox.recv(), if self.inbox_open => match command {
                    Some(command) => self.handle(command),
                    None => {
                        self.inbox_open = false;
                        self.closing = true;
                    }
                },
                Some(joined) = self.toggles.join_next() => {
                    let result = joined.unwrap_or_else(|err| {
                        Err(SaveFailure::transport(format!("watch toggle failed: {err}")))
                    });
                    if let Err(failure) = &result {
                        warn!(record_id = %self.record_id, %failure, "watch toggle failed");
                    }
                    if self.toggle.complete(result) == ToggleSettlement::Resync {
                        self.resync();
                    }
                }
                result = fetched(&mut self.fetch) => {
                    self.fetch = None;
                    match result {
                        Ok(state) => {
                            if !self.toggle.apply_authoritative(state) {
                                debug!(
                                    record_id = %self.record_id,
                                    "watch state predates a toggle"
                                );
                            }
                        }
                        Err(failure) => {
                            warn!(record_id = %self.record_id, %failure, "watch refetch failed");
                            self.toggle.resync_failed(failure);
                        }
                    }
                }
            }

            self.publisher.send_replace(self.toggle.view());
        }

        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn handle(&mut self, command: WatchCommand) {
        match command {
            WatchCommand::Toggle { respond } => {
                let request = self.toggle.toggle();
                debug!(
                    record_id = %self.record_id,
                    watching = request.watching,
                    in_flight = self.toggle.in_flight(),
                    "watch toggled"
                );

                let endpoint = Arc::clone(&self.endpoint);
                let record_id = self.record_id.clone();
                self.toggles.spawn(async move {
                    endpoint.set_watching(&record_id, request.watching).await
                });
                let _ = respond.send(self.toggle.view());
            }
            WatchCommand::Refresh => {
                if self.toggle.in_flight() == 0 {
                    self.resync();
                }
            }
            WatchCommand::Shutdown { respond } => {
                self.waiters.push(respond);
                self.closing = true;
                self.inbox.close();
            }
        }
    }

    /// Start a fresh authoritative fetch, replacing an older one.
    fn resync(&mut self) {
        if let Some(stale) = self.fetch.take() {
            stale.abort();
        }
        let endpoint = Arc::clone(&self.endpoint);
        let record_id = self.record_id.clone();
        self.fetch = Some(tokio::spawn(async move { endpoint.fetch_watch(&record_id).await }));
    }
}
