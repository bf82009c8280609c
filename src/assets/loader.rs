use std::{
    sync::{Arc, mpsc},
    time::{Duration, Instant},
};

use crate::{
    assets::decode::{DecodedImage, decode_image},
    assets::source::{ImageSource, LocalFetcher, SourceFetcher, SourceKind},
    foundation::error::{TimberlensError, TimberlensResult},
};

/// Loader configuration.
#[derive(Clone, Debug)]
pub struct LoaderOpts {
    /// Decode worker threads. Must be >= 1.
    pub decode_threads: usize,
    /// Give up waiting on a decode after this long (`None` waits forever).
    pub decode_timeout: Option<Duration>,
    /// Reject images with more pixels than this.
    pub max_decoded_pixels: u64,
}

impl Default for LoaderOpts {
    fn default() -> Self {
        Self {
            decode_threads: 1,
            decode_timeout: None,
            max_decoded_pixels: 64 * 1024 * 1024,
        }
    }
}

impl LoaderOpts {
    /// Defaults overridden by `TIMBERLENS_DECODE_THREADS` and `TIMBERLENS_DECODE_TIMEOUT_MS`.
    ///
    /// Unparsable or zero values are ignored.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Some(n) = std::env::var("TIMBERLENS_DECODE_THREADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            opts.decode_threads = n;
        }
        if let Some(ms) = std::env::var("TIMBERLENS_DECODE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
        {
            opts.decode_timeout = Some(Duration::from_millis(ms));
        }
        opts
    }

    /// Return options with a decode timeout.
    pub fn with_decode_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.decode_timeout = timeout;
        self
    }

    /// Return options with a worker count.
    pub fn with_decode_threads(mut self, threads: usize) -> Self {
        self.decode_threads = threads;
        self
    }
}

/// Generation token identifying one `begin` call. Only the latest token's completion is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecodeToken(u64);

impl DecodeToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Observable state of the current source.
#[derive(Clone, Debug)]
pub enum LoadState {
    /// No source has been supplied (or interest was cancelled).
    Idle,
    /// Decode in flight for the current source.
    Pending { token: DecodeToken },
    /// Decode finished for the current source.
    Ready(Arc<DecodedImage>),
    /// Fetch or decode failed for the current source.
    Failed { token: DecodeToken, reason: String },
    /// The decode outlived [`LoaderOpts::decode_timeout`].
    TimedOut { token: DecodeToken },
}

impl LoadState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn decoded(&self) -> Option<&Arc<DecodedImage>> {
        match self {
            Self::Ready(img) => Some(img),
            _ => None,
        }
    }
}

/// Outcome of offering a completed decode to a [`LoadSlot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The completion belongs to the active source and was recorded.
    Applied,
    /// The completion belongs to a superseded source (or was already resolved) and was dropped.
    Stale,
}

#[derive(Clone, Debug)]
struct ActiveLoad {
    token: DecodeToken,
    source: ImageSource,
    started: Instant,
}

/// Generation-guarded state machine behind [`ImageLoader`].
///
/// Pure bookkeeping with no threads or IO, so the out-of-order completion rules can be driven
/// directly.
#[derive(Debug)]
pub struct LoadSlot {
    generation: u64,
    active: Option<ActiveLoad>,
    state: LoadState,
}

impl Default for LoadSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSlot {
    pub fn new() -> Self {
        Self {
            generation: 0,
            active: None,
            state: LoadState::Idle,
        }
    }

    /// Supersede whatever was active and start tracking `source`.
    pub fn begin(&mut self, source: ImageSource, now: Instant) -> DecodeToken {
        self.generation += 1;
        let token = DecodeToken(self.generation);
        self.active = Some(ActiveLoad {
            token,
            source,
            started: now,
        });
        self.state = LoadState::Pending { token };
        token
    }

    /// Drop interest in the active source without supplying a new one.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.active = None;
        self.state = LoadState::Idle;
    }

    /// Offer a finished decode. Applied only when `token` is the current generation and the
    /// slot has not already resolved it; a success after a timeout is still accepted.
    pub fn complete(
        &mut self,
        token: DecodeToken,
        result: TimberlensResult<DecodedImage>,
    ) -> Completion {
        let Some(active) = self.active.as_ref() else {
            return Completion::Stale;
        };
        if token != active.token || token.0 != self.generation {
            return Completion::Stale;
        }
        let timed_out = matches!(self.state, LoadState::TimedOut { .. });
        if !timed_out && !self.state.is_pending() {
            return Completion::Stale;
        }
        match result {
            Ok(img) => {
                self.state = LoadState::Ready(Arc::new(img.with_generation(token.0)));
                Completion::Applied
            }
            Err(_) if timed_out => Completion::Stale,
            Err(err) => {
                self.state = LoadState::Failed {
                    token,
                    reason: err.to_string(),
                };
                Completion::Applied
            }
        }
    }

    /// Move a pending decode older than `timeout` to [`LoadState::TimedOut`].
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> bool {
        match self.deadline(timeout) {
            Some(deadline) if now >= deadline => {
                if let LoadState::Pending { token } = self.state {
                    self.state = LoadState::TimedOut { token };
                }
                true
            }
            _ => false,
        }
    }

    fn deadline(&self, timeout: Duration) -> Option<Instant> {
        match (&self.state, self.active.as_ref()) {
            (LoadState::Pending { .. }, Some(active)) => Some(active.started + timeout),
            _ => None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_source(&self) -> Option<&ImageSource> {
        self.active.as_ref().map(|a| &a.source)
    }
}

struct DecodeMsg {
    token: DecodeToken,
    result: TimberlensResult<DecodedImage>,
}

/// Asynchronous image loader.
///
/// Fetch and decode run on a private `rayon` pool; completions travel back over a channel and
/// are applied on the owning thread in [`ImageLoader::poll`] / [`ImageLoader::wait`], so the
/// owner is the only mutator of load state. Superseded decodes are not aborted; their results
/// are discarded by the generation check.
pub struct ImageLoader {
    opts: LoaderOpts,
    pool: rayon::ThreadPool,
    fetcher: Arc<dyn SourceFetcher>,
    tx: mpsc::Sender<DecodeMsg>,
    rx: mpsc::Receiver<DecodeMsg>,
    slot: LoadSlot,
    stale_completions: u64,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("opts", &self.opts)
            .field("slot", &self.slot)
            .field("stale_completions", &self.stale_completions)
            .finish()
    }
}

impl ImageLoader {
    /// Create a loader using [`LocalFetcher`].
    pub fn new(opts: LoaderOpts) -> TimberlensResult<Self> {
        Self::with_fetcher(opts, Arc::new(LocalFetcher))
    }

    /// Create a loader with a custom [`SourceFetcher`] (e.g. one that can reach remote URLs).
    pub fn with_fetcher(
        opts: LoaderOpts,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> TimberlensResult<Self> {
        let pool = build_decode_pool(opts.decode_threads)?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            opts,
            pool,
            fetcher,
            tx,
            rx,
            slot: LoadSlot::new(),
            stale_completions: 0,
        })
    }

    /// Start decoding `source`, superseding any decode still in flight.
    #[tracing::instrument(skip(self, source), fields(source = %source))]
    pub fn begin(&mut self, source: ImageSource) -> DecodeToken {
        let token = self.slot.begin(source.clone(), Instant::now());
        let tx = self.tx.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let max_pixels = self.opts.max_decoded_pixels;

        self.pool.spawn(move || {
            let result = fetch_and_decode(fetcher.as_ref(), &source, max_pixels);
            // The loader may have been dropped while this decode ran.
            let _ = tx.send(DecodeMsg { token, result });
        });
        tracing::debug!(generation = token.0, "decode started");
        token
    }

    /// Drop interest in the current source.
    pub fn cancel(&mut self) {
        self.slot.cancel();
    }

    /// Apply any finished decodes without blocking. Returns whether the load state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            changed |= self.apply(msg);
        }
        if let Some(timeout) = self.opts.decode_timeout
            && self.slot.expire(Instant::now(), timeout)
        {
            tracing::warn!(generation = self.slot.generation(), "decode timed out");
            changed = true;
        }
        changed
    }

    /// Block until the current source resolves or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> &LoadState {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.slot.state().is_pending() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wake = self
                .opts
                .decode_timeout
                .and_then(|t| self.slot.deadline(t))
                .map_or(deadline, |d| d.min(deadline));
            match self.rx.recv_timeout(wake.saturating_duration_since(now)) {
                Ok(msg) => {
                    self.apply(msg);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
            self.poll();
        }
        self.slot.state()
    }

    pub fn state(&self) -> &LoadState {
        self.slot.state()
    }

    /// Decoded bitmap for the current source, if it is ready.
    pub fn decoded(&self) -> Option<&Arc<DecodedImage>> {
        self.slot.state().decoded()
    }

    pub fn active_source(&self) -> Option<&ImageSource> {
        self.slot.active_source()
    }

    pub fn generation(&self) -> u64 {
        self.slot.generation()
    }

    /// Number of completions discarded because their source had been superseded.
    pub fn stale_completions(&self) -> u64 {
        self.stale_completions
    }

    pub fn opts(&self) -> &LoaderOpts {
        &self.opts
    }

    fn apply(&mut self, msg: DecodeMsg) -> bool {
        let failed = msg.result.as_ref().err().map(ToString::to_string);
        match self.slot.complete(msg.token, msg.result) {
            Completion::Applied => {
                match failed {
                    Some(reason) => {
                        tracing::warn!(generation = msg.token.0, %reason, "decode failed")
                    }
                    None => tracing::debug!(generation = msg.token.0, "decode applied"),
                }
                true
            }
            Completion::Stale => {
                self.stale_completions += 1;
                tracing::debug!(
                    generation = msg.token.0,
                    current = self.slot.generation(),
                    "discarding stale decode"
                );
                false
            }
        }
    }
}

fn fetch_and_decode(
    fetcher: &dyn SourceFetcher,
    source: &ImageSource,
    max_pixels: u64,
) -> TimberlensResult<DecodedImage> {
    let mime = match source.kind()? {
        SourceKind::DataUri { mime, .. } if !mime.is_empty() => Some(mime.to_string()),
        _ => None,
    };
    let bytes = fetcher.fetch(source)?;
    decode_image(&bytes, mime.as_deref(), max_pixels)
}

fn build_decode_pool(threads: usize) -> TimberlensResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(TimberlensError::validation("decode_threads must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("timberlens-decode-{i}"))
        .build()
        .map_err(|e| TimberlensError::validation(format!("failed to build decode pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
