//! Survival tracker: follows accepted and rejected suggestions over time.
//!
//! Every [`SurvivalTracker::accepted`] or [`SurvivalTracker::rejected`] call
//! spawns one session task. The task owns the session's [`OffsetTracker`]s
//! and waits on three things at once:
//!
//! ```text
//!   timer (next horizon) ──┐
//!   document events ───────┼──► select ──► fire horizon ──► telemetry
//!   disposal / shutdown ───┘
//! ```
//!
//! Horizons fire in increasing order, each measured from the moment the
//! suggestion was accepted or rejected. At a horizon an accepted session
//! searches the live document for the inserted text (near margin first, then
//! once with the far margin) and reports the verdict; a rejected session
//! only captures the code that was written where the suggestion would have
//! gone.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use stillcode_config::{ConfigError, TimeoutDescriptor, TrackerConfig};

use crate::capture;
use crate::citation::{self, CitationSink, CodeCitation};
use crate::document::{DocumentChange, DocumentEvent, DocumentSnapshot, DocumentSource};
use crate::locate;
use crate::telemetry::{
    CaptureReport, InsertionCategory, InsertionReport, Properties, SurvivalReport, TelemetrySink,
};
use crate::text;
use crate::tracking::OffsetTracker;

/// An accepted suggestion, reported after its text was inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct Acceptance {
    pub uri: String,
    pub category: InsertionCategory,
    /// The full suggestion as offered.
    pub completion_text: String,
    /// The prefix of the suggestion actually inserted.
    pub inserted_text: String,
    /// Character offset the text was inserted at.
    pub offset: usize,
    pub citations: Vec<CodeCitation>,
    pub properties: Properties,
}

impl Acceptance {
    /// A fully accepted suggestion.
    pub fn new(
        uri: impl Into<String>,
        category: InsertionCategory,
        offset: usize,
        completion_text: impl Into<String>,
    ) -> Self {
        let completion_text = completion_text.into();
        Self {
            uri: uri.into(),
            category,
            inserted_text: completion_text.clone(),
            completion_text,
            offset,
            citations: Vec::new(),
            properties: Properties::new(),
        }
    }

    /// Mark the acceptance as partial: only `inserted_text` was inserted.
    pub fn partial(mut self, inserted_text: impl Into<String>) -> Self {
        self.inserted_text = inserted_text.into();
        self
    }

    pub fn with_citation(mut self, citation: CodeCitation) -> Self {
        self.citations.push(citation);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One suggestion the user was shown and did not take.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCompletion {
    pub completion_text: String,
    pub properties: Properties,
}

/// A set of suggestions rejected at one offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub uri: String,
    pub category: InsertionCategory,
    pub offset: usize,
    pub completions: Vec<RejectedCompletion>,
}

impl Rejection {
    pub fn new(uri: impl Into<String>, category: InsertionCategory, offset: usize) -> Self {
        Self {
            uri: uri.into(),
            category,
            offset,
            completions: Vec::new(),
        }
    }

    pub fn with_completion(
        mut self,
        completion_text: impl Into<String>,
        properties: Properties,
    ) -> Self {
        self.completions.push(RejectedCompletion {
            completion_text: completion_text.into(),
            properties,
        });
        self
    }
}

/// Handle to one running session.
///
/// Dropping the handle does not stop the session; call [`SessionHandle::dispose`].
#[derive(Debug)]
pub struct SessionHandle {
    id: u64,
    dispose: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancel the session. Horizons that have not fired yet never will, and a
    /// check already in flight is discarded.
    pub fn dispose(&self) {
        self.dispose.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the session task has exited.
    pub async fn finished(self) {
        if let Err(err) = self.task.await {
            warn!(session = self.id, error = %err, "Survival session task failed");
        }
    }
}

struct Shared {
    config: TrackerConfig,
    documents: Arc<dyn DocumentSource>,
    telemetry: Arc<dyn TelemetrySink>,
    citations: Arc<dyn CitationSink>,
}

/// Tracks what happens to suggestions after the user acted on them.
pub struct SurvivalTracker {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    next_id: AtomicU64,
}

impl SurvivalTracker {
    /// Fails when `config` does not pass [`TrackerConfig::validate`].
    pub fn new(
        config: TrackerConfig,
        documents: Arc<dyn DocumentSource>,
        telemetry: Arc<dyn TelemetrySink>,
        citations: Arc<dyn CitationSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                documents,
                telemetry,
                citations,
            }),
            shutdown,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    /// Record an accepted suggestion and start tracking it.
    ///
    /// Emits `accepted` immediately, then schedules a survival check for
    /// every configured timeout and resolves the suggestion's citations.
    /// Must be called from within a tokio runtime.
    pub fn accepted(&self, acceptance: Acceptance) -> SessionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let inserted_len = text::char_len(&acceptance.inserted_text);

        self.shared.telemetry.accepted(&InsertionReport {
            category: acceptance.category,
            uri: acceptance.uri.clone(),
            insertion_offset: acceptance.offset,
            completion_len: text::char_len(&acceptance.completion_text),
            inserted_len,
            properties: acceptance.properties.clone(),
        });
        debug!(
            session = id,
            uri = %acceptance.uri,
            offset = acceptance.offset,
            inserted_len,
            "Tracking accepted suggestion"
        );

        let citations = (!acceptance.citations.is_empty()).then(|| CitationJob {
            uri: acceptance.uri.clone(),
            offset: acceptance.offset,
            completion_len: text::char_len(&acceptance.completion_text),
            inserted_text: acceptance.inserted_text.clone(),
            citations: acceptance.citations.clone(),
        });

        let (dispose, dispose_rx) = watch::channel(false);
        let session = match self.shared.documents.subscribe(&acceptance.uri) {
            Ok(events) => Some(Session {
                id,
                uri: acceptance.uri,
                category: acceptance.category,
                insertion_offset: acceptance.offset,
                start: OffsetTracker::new(acceptance.offset),
                end: OffsetTracker::new(acceptance.offset + inserted_len),
                kind: SessionKind::Accepted {
                    inserted_text: acceptance.inserted_text,
                    properties: acceptance.properties,
                },
                horizons: self.shared.config.timeouts.clone(),
                started,
                events,
                dispose: dispose_rx,
                shutdown: self.shutdown.subscribe(),
                shared: Arc::clone(&self.shared),
            }),
            Err(err) => {
                warn!(
                    session = id,
                    error = %err,
                    "Cannot follow document, survival checks skipped"
                );
                None
            }
        };

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            if let Some(job) = citations {
                shared.report_citations(job).await;
            }
            if let Some(session) = session {
                session.run().await;
            }
        });

        SessionHandle { id, dispose, task }
    }

    /// Record rejected suggestions.
    ///
    /// Emits `rejected` for every completion. When some timeout requests
    /// rejection capture, starts a session that captures the code written at
    /// the rejection point at those horizons; otherwise returns `None`.
    pub fn rejected(&self, rejection: Rejection) -> Option<SessionHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        for completion in &rejection.completions {
            self.shared.telemetry.rejected(&InsertionReport {
                category: rejection.category,
                uri: rejection.uri.clone(),
                insertion_offset: rejection.offset,
                completion_len: text::char_len(&completion.completion_text),
                inserted_len: 0,
                properties: completion.properties.clone(),
            });
        }

        let horizons: Vec<TimeoutDescriptor> =
            self.shared.config.rejection_timeouts().copied().collect();
        if horizons.is_empty() || rejection.completions.is_empty() {
            return None;
        }

        let events = match self.shared.documents.subscribe(&rejection.uri) {
            Ok(events) => events,
            Err(err) => {
                warn!(
                    session = id,
                    error = %err,
                    "Cannot follow document, rejection capture skipped"
                );
                return None;
            }
        };

        // Anchored one character back so text typed at the rejection point
        // lands after the tracker instead of pushing it.
        let anchor = rejection.offset.saturating_sub(1);
        let (dispose, dispose_rx) = watch::channel(false);
        let session = Session {
            id,
            uri: rejection.uri,
            category: rejection.category,
            insertion_offset: rejection.offset,
            start: OffsetTracker::new(anchor),
            end: OffsetTracker::new(anchor),
            kind: SessionKind::Rejected {
                completions: rejection.completions,
                capture_shift: usize::from(rejection.offset > 0),
            },
            horizons,
            started,
            events,
            dispose: dispose_rx,
            shutdown: self.shutdown.subscribe(),
            shared: Arc::clone(&self.shared),
        };
        debug!(session = id, uri = %session.uri, anchor, "Tracking rejected suggestions");

        let task = tokio::spawn(session.run());
        Some(SessionHandle { id, dispose, task })
    }

    /// Cancel every session started by this tracker.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

struct CitationJob {
    uri: String,
    offset: usize,
    completion_len: usize,
    inserted_text: String,
    citations: Vec<CodeCitation>,
}

impl Shared {
    async fn report_citations(&self, job: CitationJob) {
        let snapshot = match self.documents.snapshot(&job.uri).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(uri = %job.uri, error = %err, "Document unavailable, citations skipped");
                return;
            }
        };
        let records = citation::resolve_citations(
            &snapshot,
            job.offset,
            &job.inserted_text,
            job.completion_len,
            &job.citations,
            self.config.near_margin,
        );
        for record in records {
            self.citations.handle_citation(record);
        }
    }
}

enum SessionKind {
    Accepted {
        inserted_text: String,
        properties: Properties,
    },
    Rejected {
        completions: Vec<RejectedCompletion>,
        /// Offset from the tracked anchor to the rejection point.
        capture_shift: usize,
    },
}

struct Session {
    id: u64,
    uri: String,
    category: InsertionCategory,
    insertion_offset: usize,
    start: OffsetTracker,
    end: OffsetTracker,
    kind: SessionKind,
    horizons: Vec<TimeoutDescriptor>,
    started: Instant,
    events: broadcast::Receiver<DocumentEvent>,
    dispose: watch::Receiver<bool>,
    shutdown: watch::Receiver<bool>,
    shared: Arc<Shared>,
}

/// Why a session stopped waiting.
enum Stop {
    Disposed,
    DocumentClosed,
}

impl Session {
    async fn run(mut self) {
        let horizons = std::mem::take(&mut self.horizons);
        for horizon in &horizons {
            let outcome = match self.wait_until(self.started + horizon.delay()).await {
                Ok(()) => self.fire(horizon).await,
                Err(stop) => Err(stop),
            };
            match outcome {
                Ok(()) => {}
                Err(Stop::Disposed) => {
                    debug!(session = self.id, "Survival session disposed");
                    return;
                }
                Err(Stop::DocumentClosed) => {
                    debug!(
                        session = self.id,
                        uri = %self.uri,
                        "Document closed, survival session ended"
                    );
                    return;
                }
            }
        }
        debug!(session = self.id, "Survival session complete");
    }

    /// Apply document events until `deadline`.
    async fn wait_until(&mut self, deadline: Instant) -> Result<(), Stop> {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                _ = disposed(&mut self.dispose) => return Err(Stop::Disposed),
                _ = disposed(&mut self.shutdown) => return Err(Stop::Disposed),
                event = self.events.recv() => match event {
                    Ok(DocumentEvent::Changed(change)) => self.apply(&change),
                    Ok(DocumentEvent::Closed { .. }) | Err(RecvError::Closed) => {
                        return Err(Stop::DocumentClosed);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(
                            session = self.id,
                            missed,
                            "Document events lagged, offsets may drift"
                        );
                    }
                },
                _ = &mut sleep => return Ok(()),
            }
        }
    }

    fn apply(&mut self, change: &DocumentChange) {
        self.start.apply(change);
        self.end.apply(change);
    }

    fn is_disposed(&self) -> bool {
        *self.dispose.borrow() || *self.shutdown.borrow()
    }

    /// Drain events already published up to `version`, so the trackers
    /// describe the same document the snapshot does.
    fn catch_up(&mut self, version: u64) -> Result<(), Stop> {
        while !self.start.is_current(version) {
            match self.events.try_recv() {
                Ok(DocumentEvent::Changed(change)) => self.apply(&change),
                Ok(DocumentEvent::Closed { .. }) | Err(TryRecvError::Closed) => {
                    return Err(Stop::DocumentClosed);
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(session = self.id, missed, "Document events lagged, offsets may drift");
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        Ok(())
    }

    async fn fire(&mut self, horizon: &TimeoutDescriptor) -> Result<(), Stop> {
        if self.is_disposed() {
            return Err(Stop::Disposed);
        }
        let snapshot = match self.shared.documents.snapshot(&self.uri).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    session = self.id,
                    timeout = horizon.delay_secs,
                    error = %err,
                    "Document unavailable, check skipped"
                );
                return Ok(());
            }
        };
        if self.is_disposed() {
            return Err(Stop::Disposed);
        }
        self.catch_up(snapshot.version)?;

        match &self.kind {
            SessionKind::Accepted {
                inserted_text,
                properties,
            } => self.check_survival(&snapshot, horizon, inserted_text, properties),
            SessionKind::Rejected {
                completions,
                capture_shift,
            } => self.capture_rejected(&snapshot, horizon, completions, *capture_shift),
        }
        Ok(())
    }

    fn check_survival(
        &self,
        snapshot: &DocumentSnapshot,
        horizon: &TimeoutDescriptor,
        inserted_text: &str,
        properties: &Properties,
    ) {
        let config = &self.shared.config;
        let tracked = self.start.offset();
        let search = |margin| {
            locate::find_with_threshold(
                &snapshot.text,
                tracked,
                margin,
                inserted_text,
                config.still_in_code_threshold,
            )
        };

        let near = search(config.near_margin);
        let (result, far_search) = if near.still_in_code {
            (near, false)
        } else {
            (search(config.far_margin), true)
        };
        debug!(
            session = self.id,
            timeout = horizon.delay_secs,
            tracked,
            still_in_code = result.still_in_code,
            far_search,
            "Survival check"
        );

        self.shared.telemetry.still_in_code(&SurvivalReport {
            category: self.category,
            uri: self.uri.clone(),
            timeout_secs: horizon.delay_secs,
            insertion_offset: self.insertion_offset,
            tracked_offset: tracked,
            far_search,
            result,
            properties: properties.clone(),
        });

        if horizon.capture_code {
            let capture = capture::capture_code(
                snapshot,
                tracked,
                self.end.offset(),
                config.capture_code_margin,
                config.capture_prefix_chars,
            );
            self.shared.telemetry.captured_after_accepted(&CaptureReport {
                category: self.category,
                uri: self.uri.clone(),
                timeout_secs: horizon.delay_secs,
                insertion_offset: self.insertion_offset,
                tracked_offset: tracked,
                capture,
                properties: properties.clone(),
            });
        }
    }

    fn capture_rejected(
        &self,
        snapshot: &DocumentSnapshot,
        horizon: &TimeoutDescriptor,
        completions: &[RejectedCompletion],
        capture_shift: usize,
    ) {
        let config = &self.shared.config;
        let tracked = self.start.offset() + capture_shift;
        let capture = capture::capture_code(
            snapshot,
            tracked,
            tracked,
            config.capture_code_margin,
            config.capture_prefix_chars,
        );
        debug!(
            session = self.id,
            timeout = horizon.delay_secs,
            tracked,
            "Rejection capture"
        );

        for completion in completions {
            self.shared.telemetry.captured_after_rejected(&CaptureReport {
                category: self.category,
                uri: self.uri.clone(),
                timeout_secs: horizon.delay_secs,
                insertion_offset: self.insertion_offset,
                tracked_offset: tracked,
                capture: capture.clone(),
                properties: completion.properties.clone(),
            });
        }
    }
}

/// Resolves once the flag is raised; never resolves if its sender is gone.
async fn disposed(rx: &mut watch::Receiver<bool>) {
    let closed = rx.wait_for(|disposed| *disposed).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
