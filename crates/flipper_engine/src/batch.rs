//! Paged listing of one batch's items, optionally narrowed by item state.
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use flipper_core::{
    update_batch, BatchContentState, BatchContentView, BatchEffect, BatchEntry, BatchFilter,
    BatchId, BatchMsg, Generation,
};
use flipper_logging::{flipper_debug, flipper_info, flipper_warn};

use crate::api::{ServiceApi, BATCH_CONTENT};
use crate::settings::PagingSettings;
use crate::shared::{apply, lock};
use crate::stream::{DiagnosticSink, PageEnd, StreamCursor, StreamOptions, StreamSession};
use crate::types::{ClientError, Diagnostic};

type SharedState = Arc<Mutex<BatchContentState>>;

/// A session that stopped at the page limit, kept for `load_more`.
struct Parked {
    generation: Generation,
    session: StreamSession<BatchEntry>,
}

type SharedParked = Arc<Mutex<Option<Parked>>>;

/// Streams a batch's items into `BatchContentState`, one page at a time.
///
/// Every new load or filter change cancels the session feeding the previous one before
/// the new request is issued. Records still arriving from a superseded session are
/// dropped, so the visible page only ever holds items of the current load.
pub struct BatchContentController {
    api: Arc<dyn ServiceApi>,
    paging: PagingSettings,
    state: SharedState,
    cursor: StreamCursor,
    parked: SharedParked,
    reader: Option<JoinHandle<()>>,
}

impl BatchContentController {
    pub fn new(api: Arc<dyn ServiceApi>, paging: PagingSettings) -> Self {
        Self {
            api,
            paging,
            state: Arc::new(Mutex::new(BatchContentState::new())),
            cursor: StreamCursor::new(),
            parked: Arc::new(Mutex::new(None)),
            reader: None,
        }
    }

    pub fn view(&self) -> BatchContentView {
        lock(&self.state).view()
    }

    /// True once per change to the listing.
    pub fn consume_dirty(&self) -> bool {
        lock(&self.state).consume_dirty()
    }

    /// Clears the listing and starts reading the first page of `batch_id`.
    ///
    /// Returns once the request is open, or has failed; records arrive in the background.
    pub async fn load_page(&mut self, batch_id: BatchId, filter: BatchFilter) {
        self.dispatch(BatchMsg::LoadRequested { batch_id, filter })
            .await;
    }

    /// Reloads the current batch with a different filter. Ignored without a batch.
    pub async fn change_filter(&mut self, filter: BatchFilter) {
        self.dispatch(BatchMsg::FilterChanged { filter }).await;
    }

    /// Continues the current feed for one more page, if it stopped at the limit.
    pub async fn load_more(&mut self) {
        self.dispatch(BatchMsg::MoreRequested).await;
    }

    /// Aborts the feed in progress; the rows already shown stay.
    pub fn cancel(&mut self) {
        let effects = apply(&self.state, BatchMsg::CancelRequested, update_batch);
        for effect in effects {
            self.run_now(effect);
        }
    }

    /// Waits for the background reader of the current page to finish.
    pub async fn settled(&mut self) {
        if let Some(reader) = self.reader.take() {
            if let Err(err) = reader.await {
                if !err.is_cancelled() {
                    flipper_warn!("batch reader ended abnormally: {}", err);
                }
            }
        }
    }

    /// Cancels the feed and any reader task; the controller is inert afterwards.
    pub fn teardown(&mut self) {
        self.cancel();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }

    async fn dispatch(&mut self, msg: BatchMsg) {
        let effects = apply(&self.state, msg, update_batch);
        for effect in effects {
            match effect {
                BatchEffect::OpenStream {
                    generation,
                    batch_id,
                    filter,
                } => self.open(generation, batch_id, filter).await,
                other => self.run_now(other),
            }
        }
    }

    fn run_now(&mut self, effect: BatchEffect) {
        match effect {
            BatchEffect::CancelStream => {
                self.cursor.cancel();
                // Dropping a parked session cancels it as well.
                lock(&self.parked).take();
            }
            BatchEffect::ResumeStream { generation } => self.resume(generation),
            BatchEffect::OpenStream { generation, .. } => {
                flipper_warn!("stream for generation {} cannot open here", generation);
            }
        }
    }

    async fn open(&mut self, generation: Generation, batch_id: BatchId, filter: BatchFilter) {
        let mut query = vec![("forId", batch_id.to_string())];
        if let Some(state) = filter {
            query.push(("state", state.query_value()));
        }
        let url = match self.api.resolve(BATCH_CONTENT, &query) {
            Ok(url) => url,
            Err(err) => return self.fail(generation, err),
        };

        flipper_info!("loading batch {} (generation {})", batch_id, generation);
        let sink = Arc::new(StateDiagnostics {
            generation,
            state: Arc::clone(&self.state),
        });
        let options = StreamOptions::new(&self.paging).with_diagnostics(sink);
        match self
            .cursor
            .open::<BatchEntry>(self.api.as_ref(), url, options)
            .await
        {
            Ok(session) => self.spawn_reader(generation, session),
            Err(err) => self.fail(generation, err),
        }
    }

    fn resume(&mut self, generation: Generation) {
        let parked = lock(&self.parked).take();
        match parked {
            Some(parked) if parked.generation == generation && parked.session.is_active() => {
                self.spawn_reader(generation, parked.session);
            }
            _ => {
                flipper_debug!("nothing left to resume for generation {}", generation);
                apply(
                    &self.state,
                    BatchMsg::StreamExhausted { generation },
                    update_batch,
                );
            }
        }
    }

    fn spawn_reader(&mut self, generation: Generation, session: StreamSession<BatchEntry>) {
        let state = Arc::clone(&self.state);
        let parked = Arc::clone(&self.parked);
        self.reader = Some(tokio::spawn(read_page(generation, session, state, parked)));
    }

    fn fail(&mut self, generation: Generation, err: ClientError) {
        flipper_warn!("batch load (generation {}) failed: {}", generation, err);
        let msg = BatchMsg::StreamFailed {
            generation,
            message: err.user_message(),
        };
        for effect in apply(&self.state, msg, update_batch) {
            self.run_now(effect);
        }
    }
}

impl Drop for BatchContentController {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn read_page(
    generation: Generation,
    mut session: StreamSession<BatchEntry>,
    state: SharedState,
    parked: SharedParked,
) {
    let outcome = session
        .read_page(|entry| {
            if !lock(&state).is_current(generation) {
                return ControlFlow::Break(());
            }
            apply(
                &state,
                BatchMsg::RecordReceived { generation, entry },
                update_batch,
            );
            ControlFlow::Continue(())
        })
        .await;

    let msg = match outcome {
        Ok(PageEnd::LimitReached) => {
            flipper_debug!("{} paused at page limit", session.id());
            *lock(&parked) = Some(Parked {
                generation,
                session,
            });
            BatchMsg::PageFilled { generation }
        }
        Ok(PageEnd::Exhausted) => BatchMsg::StreamExhausted { generation },
        Ok(PageEnd::Cancelled) | Ok(PageEnd::Stopped) => {
            flipper_debug!("{} superseded", session.id());
            return;
        }
        Err(err) => {
            flipper_warn!("{} failed: {}", session.id(), err);
            let msg = BatchMsg::StreamFailed {
                generation,
                message: err.user_message(),
            };
            for effect in apply(&state, msg, update_batch) {
                if let BatchEffect::CancelStream = effect {
                    session.cancel();
                }
            }
            return;
        }
    };
    apply(&state, msg, update_batch);
}

/// Routes malformed-line reports into the load they belong to.
struct StateDiagnostics {
    generation: Generation,
    state: SharedState,
}

impl DiagnosticSink for StateDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        flipper_warn!(
            "{} skipped a record from {}: {}",
            diagnostic.session,
            diagnostic.source_url,
            diagnostic.error
        );
        apply(
            &self.state,
            BatchMsg::MalformedRecord {
                generation: self.generation,
                message: diagnostic.error.to_string(),
            },
            update_batch,
        );
    }
}
