//! Page-bounded, cancellable consumption of newline-delimited JSON feeds.
//!
//! A [`StreamCursor`] owns at most one live session. Opening a new session cancels
//! the previous one first. A [`StreamSession`] is pulled one record at a time; the
//! paging helper [`StreamSession::read_page`] stops after `page_limit` records and
//! leaves the session open so the caller can ask for more later.
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use flipper_logging::{flipper_debug, flipper_info, flipper_warn};

use crate::api::ByteStream;
use crate::{ClientError, Diagnostic, PagingSettings, ServiceApi, SessionId};

/// Receives lines that were dropped from a feed.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Default sink: writes a warning without the offending bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        flipper_warn!(
            "{} dropped a record from {}: {}",
            diagnostic.session,
            diagnostic.source_url,
            diagnostic.error
        );
    }
}

/// Forwards dropped lines to a channel, for callers that surface them.
pub struct ChannelDiagnostics {
    tx: tokio::sync::mpsc::UnboundedSender<Diagnostic>,
}

impl ChannelDiagnostics {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<Diagnostic>) -> Self {
        Self { tx }
    }
}

impl DiagnosticSink for ChannelDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        let _ = self.tx.send(diagnostic);
    }
}

/// Longest line a session buffers while waiting for its terminating newline.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

#[derive(Clone)]
pub struct StreamOptions {
    pub page_limit: usize,
    pub pace: Duration,
    /// Lines longer than this are dropped as malformed.
    pub max_line_len: usize,
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl StreamOptions {
    pub fn new(paging: &PagingSettings) -> Self {
        Self {
            page_limit: paging.page_limit.max(1),
            pace: paging.pace,
            max_line_len: MAX_LINE_LEN,
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new(&PagingSettings::default())
    }
}

/// Result of one pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadNext<T> {
    Record(T),
    /// The feed ended or the session was cancelled.
    Done,
}

/// Why [`StreamSession::read_page`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEnd {
    /// `page_limit` records were delivered; the session is still open.
    LimitReached,
    Exhausted,
    Cancelled,
    /// The consumer asked to stop.
    Stopped,
}

#[derive(Debug)]
struct ActiveSession {
    id: SessionId,
    token: CancellationToken,
}

/// Owner of the single stream session a controller may have open.
#[derive(Debug, Default)]
pub struct StreamCursor {
    last_id: u64,
    current: Option<ActiveSession>,
}

impl StreamCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any open session, then requests `url` and wraps its body.
    ///
    /// Fails with `ClientError::Connection` when the request cannot be made and with
    /// `ClientError::Server` on a non-success status.
    pub async fn open<T: DeserializeOwned>(
        &mut self,
        source: &dyn ServiceApi,
        url: Url,
        options: StreamOptions,
    ) -> Result<StreamSession<T>, ClientError> {
        self.cancel();
        self.last_id += 1;
        let id = SessionId(self.last_id);
        let token = CancellationToken::new();
        self.current = Some(ActiveSession {
            id,
            token: token.clone(),
        });

        flipper_info!("{} opening {}", id, url);
        let source_url = url.to_string();
        let body = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(ClientError::Connection(format!("{id} cancelled while connecting")));
            }
            body = source.open_stream(url) => body,
        };
        match body {
            Ok(body) => Ok(StreamSession::new(id, source_url, token, body, options)),
            Err(err) => {
                flipper_warn!("{} failed to open: {}", id, err);
                self.release(id);
                Err(err)
            }
        }
    }

    /// Aborts the open session, if any. Calling it again is a no-op.
    pub fn cancel(&mut self) {
        if let Some(active) = self.current.take() {
            if !active.token.is_cancelled() {
                flipper_debug!("{} cancelled", active.id);
                active.token.cancel();
            }
        }
    }

    /// Id of the session this cursor considers live; at most one at a time.
    pub fn active_session(&self) -> Option<SessionId> {
        self.current
            .as_ref()
            .filter(|active| !active.token.is_cancelled())
            .map(|active| active.id)
    }

    fn release(&mut self, id: SessionId) {
        if self.current.as_ref().is_some_and(|active| active.id == id) {
            self.current = None;
        }
    }
}

impl Drop for StreamCursor {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One open record feed.
pub struct StreamSession<T> {
    id: SessionId,
    source_url: String,
    token: CancellationToken,
    body: ByteStream,
    buffer: BytesMut,
    max_line_len: usize,
    /// Set while the rest of an over-long line is being skipped.
    discarding: bool,
    body_finished: bool,
    active: bool,
    page_limit: usize,
    items_in_page: usize,
    pace: Duration,
    diagnostics: Arc<dyn DiagnosticSink>,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> StreamSession<T> {
    pub(crate) fn new(
        id: SessionId,
        source_url: String,
        token: CancellationToken,
        body: ByteStream,
        options: StreamOptions,
    ) -> Self {
        Self {
            id,
            source_url,
            token,
            body,
            buffer: BytesMut::new(),
            max_line_len: options.max_line_len.max(1),
            discarding: false,
            body_finished: false,
            active: true,
            page_limit: options.page_limit.max(1),
            items_in_page: 0,
            pace: options.pace,
            diagnostics: options.diagnostics,
            _record: PhantomData,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active && !self.token.is_cancelled()
    }

    pub fn items_in_page(&self) -> usize {
        self.items_in_page
    }

    /// Marks the session inactive and aborts the transfer; idempotent.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.finish();
    }

    /// Pulls exactly one record, or reports that the feed is done.
    ///
    /// Unparseable lines are reported to the diagnostic sink and skipped. A pull that
    /// is waiting on the network settles with `Done` as soon as the session is
    /// cancelled.
    pub async fn read_next(&mut self) -> Result<ReadNext<T>, ClientError> {
        loop {
            if !self.is_active() {
                return Ok(ReadNext::Done);
            }
            if let Some(line) = self.next_line() {
                if let Some(record) = self.parse(&line) {
                    self.items_in_page += 1;
                    return Ok(ReadNext::Record(record));
                }
                continue;
            }
            if self.body_finished {
                flipper_debug!("{} exhausted", self.id);
                self.finish();
                return Ok(ReadNext::Done);
            }

            let chunk = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    self.finish();
                    return Ok(ReadNext::Done);
                }
                chunk = self.body.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(err)) => {
                    self.finish();
                    return Err(err);
                }
                None => self.body_finished = true,
            }
        }
    }

    /// Delivers records to `on_record` until the page limit, the end of the feed, or
    /// cancellation, pausing `pace` between pulls.
    pub async fn read_page<F>(&mut self, mut on_record: F) -> Result<PageEnd, ClientError>
    where
        F: FnMut(T) -> ControlFlow<()>,
    {
        self.items_in_page = 0;
        loop {
            match self.read_next().await? {
                ReadNext::Done => {
                    return Ok(if self.token.is_cancelled() {
                        PageEnd::Cancelled
                    } else {
                        PageEnd::Exhausted
                    });
                }
                ReadNext::Record(record) => {
                    if on_record(record).is_break() {
                        return Ok(PageEnd::Stopped);
                    }
                    if self.items_in_page >= self.page_limit {
                        return Ok(PageEnd::LimitReached);
                    }
                    if !self.pause().await {
                        return Ok(PageEnd::Cancelled);
                    }
                }
            }
        }
    }

    /// Yields to other tasks between pulls; false if cancelled meanwhile.
    async fn pause(&mut self) -> bool {
        if self.pace.is_zero() {
            tokio::task::yield_now().await;
            return !self.token.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(self.pace) => true,
        }
    }

    /// Next complete line, or the unterminated tail once the body has ended.
    ///
    /// The buffer never holds more than `max_line_len` bytes of one line; a longer
    /// line is reported and skipped up to its newline.
    fn next_line(&mut self) -> Option<BytesMut> {
        loop {
            let newline = self.buffer.iter().position(|byte| *byte == b'\n');
            if self.discarding {
                match newline {
                    Some(pos) => {
                        let _ = self.buffer.split_to(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buffer.clear();
                        return None;
                    }
                }
            }
            let line = match newline {
                Some(pos) if pos > self.max_line_len => {
                    self.report_oversized();
                    let _ = self.buffer.split_to(pos + 1);
                    continue;
                }
                None if self.buffer.len() > self.max_line_len => {
                    self.report_oversized();
                    self.buffer.clear();
                    self.discarding = true;
                    return None;
                }
                Some(pos) => {
                    let mut line = self.buffer.split_to(pos + 1);
                    line.truncate(pos);
                    line
                }
                None if self.body_finished && !self.buffer.is_empty() => {
                    self.buffer.split_to(self.buffer.len())
                }
                None => return None,
            };
            if !line.iter().all(u8::is_ascii_whitespace) {
                return Some(line);
            }
        }
    }

    fn parse(&self, line: &[u8]) -> Option<T> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        match serde_json::from_slice(line) {
            Ok(record) => Some(record),
            Err(err) => {
                self.report(ClientError::MalformedRecord(err.to_string()));
                None
            }
        }
    }

    fn report_oversized(&self) {
        self.report(ClientError::MalformedRecord(format!(
            "line exceeds {} bytes",
            self.max_line_len
        )));
    }

    fn report(&self, error: ClientError) {
        self.diagnostics.emit(Diagnostic {
            session: self.id,
            source_url: self.source_url.clone(),
            error,
        });
    }

    fn finish(&mut self) {
        if self.active {
            self.active = false;
            self.discarding = false;
            self.buffer.clear();
        }
    }
}

impl<T> Drop for StreamSession<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
