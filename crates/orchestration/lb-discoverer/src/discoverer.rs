//! Time-windowed traversal of device roots.
//!
//! Per root, session folders are walked in name order. Each folder's span is
//! estimated from cheap first-file lookups of its neighbours, and only folders
//! whose span may overlap the window are listed. The first candidate folder
//! is located by binary search, and the walk stops at the first session that
//! starts at or after the window stop.
//!
//! How a first-file timestamp bounds a session depends on the backend's
//! [`TimestampKind`]. With start stamps a session lies in `[own, next)`. With end stamps it lies
//! after the previous session's files were closed and before the next
//! session's first file was, so it is bounded by `[previous, next)` and
//! tightened by the previous session's last file when that was listed.

use chrono::{DateTime, TimeZone, Utc};
use futures::{StreamExt, stream};
use lb_error::{LbError, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::DiscoveredFile;
use crate::anomaly::{Anomaly, AnomalyKind};
use crate::config::DiscoveryConfig;
use crate::filter::{Classification, RangeFilter, SkipReason};
use crate::naming::{NamingConvention, SessionFolder};
use crate::span::TimeSpan;
use crate::stats::DiscoveryStats;
use crate::storage::{StorageAdapter, TimestampKind, normalize_path};
use crate::window::QueryWindow;

/// Files, anomalies and statistics of a discovery run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Discovery {
    /// Matching files: name order within a root, roots in supplied order
    pub files: Vec<DiscoveredFile>,
    pub anomalies: Vec<Anomaly>,
    pub stats: DiscoveryStats,
}

impl Discovery {
    fn new() -> Self {
        Self {
            stats: DiscoveryStats::new(),
            ..Default::default()
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|file| file.path.clone()).collect()
    }

    pub fn into_paths(self) -> Vec<String> {
        self.files.into_iter().map(|file| file.path).collect()
    }

    /// Append the results of another run, typically of a later root.
    pub fn merge(&mut self, other: Discovery) {
        self.files.extend(other.files);
        self.anomalies.extend(other.anomalies);
        self.stats.merge(&other.stats);
    }
}

/// Outcome for a single device root of [`Discoverer::discover_each`].
#[derive(Debug)]
pub struct RootDiscovery {
    pub root: String,
    pub result: Result<Discovery>,
}

/// Discovers the log files of device roots that overlap a query window.
pub struct Discoverer {
    storage: Arc<dyn StorageAdapter>,
    naming: NamingConvention,
    config: DiscoveryConfig,
}

impl Discoverer {
    /// Create a new Discoverer.
    ///
    /// Fails with [`LbError::Config`] if a name pattern does not compile.
    pub fn new(storage: Arc<dyn StorageAdapter>, config: DiscoveryConfig) -> Result<Self> {
        Ok(Self {
            naming: NamingConvention::from_config(&config)?,
            storage,
            config,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover the roots one after another, failing on the first root whose
    /// backend call fails.
    pub async fn discover<S: AsRef<str>>(
        &self,
        roots: &[S],
        window: &QueryWindow,
    ) -> Result<Discovery> {
        let filter = RangeFilter::new(*window);
        let mut discovery = Discovery::new();

        debug!(
            storage = %self.storage.description(),
            roots = roots.len(),
            filter = %filter.description(),
            "Starting discovery"
        );

        for root in unique_roots(roots) {
            let listing = self.discover_root(&root, filter).await?;
            discovery.merge(listing);
        }

        discovery.stats.complete();
        log_completed(&discovery.stats);

        Ok(discovery)
    }

    /// Discover up to `concurrency` roots at once.
    ///
    /// Results are returned in supplied order with one outcome per root, so a
    /// failing root does not hide the others.
    pub async fn discover_each<S: AsRef<str>>(
        &self,
        roots: &[S],
        window: &QueryWindow,
    ) -> Vec<RootDiscovery> {
        let filter = RangeFilter::new(*window);

        debug!(
            storage = %self.storage.description(),
            roots = roots.len(),
            concurrency = self.config.concurrency,
            filter = %filter.description(),
            "Starting concurrent discovery"
        );

        stream::iter(unique_roots(roots))
            .map(|root| async move {
                let result = self.discover_root(&root, filter).await;
                if let Err(e) = &result {
                    warn!(root = %root, error = %e, "Discovery failed for device root");
                }
                RootDiscovery { root, result }
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    async fn discover_root(&self, root: &str, filter: RangeFilter) -> Result<Discovery> {
        RootWalk::new(self.storage.as_ref(), &self.naming, filter, root)
            .run()
            .await
    }
}

/// Discover the paths of the log files below `roots` that overlap
/// `[start, stop)`.
///
/// `extensions` replaces the default `MF4` filter; an empty slice accepts
/// every file. The window is validated before the backend is touched.
pub async fn discover<S, A, B>(
    storage: Arc<dyn StorageAdapter>,
    roots: &[S],
    start: DateTime<A>,
    stop: DateTime<B>,
    extensions: Option<&[&str]>,
) -> Result<Vec<String>>
where
    S: AsRef<str>,
    A: TimeZone,
    B: TimeZone,
{
    let window = QueryWindow::new(start, stop)?;

    let mut config = DiscoveryConfig::new();
    if let Some(extensions) = extensions {
        config = config.with_extensions(extensions.iter().copied());
    }

    let discoverer = Discoverer::new(storage, config)?;
    Ok(discoverer.discover(roots, &window).await?.into_paths())
}

fn unique_roots<S: AsRef<str>>(roots: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    roots
        .iter()
        .map(|root| normalize_path(root.as_ref()))
        .filter(|root| {
            let first = seen.insert(root.clone());
            if !first {
                warn!(root = %root, "Ignoring duplicate device root");
            }
            first
        })
        .collect()
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn log_completed(stats: &DiscoveryStats) {
    debug!(
        roots = stats.roots_processed,
        empty_roots = stats.empty_roots,
        folders_seen = stats.folders_seen,
        folders_listed = stats.folders_listed,
        folders_pruned = stats.folders_pruned,
        first_file_lookups = stats.first_file_lookups,
        files_matched = stats.files_matched,
        files_skipped = stats.files_skipped,
        bytes = stats.bytes_matched,
        anomalies = stats.anomalies,
        "Discovery completed"
    );
}

/// State of the traversal of one device root.
struct RootWalk<'a> {
    storage: &'a dyn StorageAdapter,
    naming: &'a NamingConvention,
    filter: RangeFilter,
    root: String,
    folders: Vec<SessionFolder>,
    /// Positions of the conforming folders in `folders`
    sessions: Vec<usize>,
    /// First-file timestamps, keyed by index into `sessions`
    stamps: HashMap<usize, Option<DateTime<Utc>>>,
    out: Discovery,
}

impl<'a> RootWalk<'a> {
    fn new(
        storage: &'a dyn StorageAdapter,
        naming: &'a NamingConvention,
        filter: RangeFilter,
        root: &str,
    ) -> Self {
        Self {
            storage,
            naming,
            filter,
            root: root.to_string(),
            folders: Vec::new(),
            sessions: Vec::new(),
            stamps: HashMap::new(),
            out: Discovery::new(),
        }
    }

    async fn run(mut self) -> Result<Discovery> {
        self.folders = self
            .naming
            .session_folders_of(self.storage, &self.root)
            .await
            .map_err(|e| LbError::backend(&self.root, e))?;

        if self.folders.is_empty() {
            debug!(root = %self.root, "Device root is missing or empty");
            self.out.stats.empty_roots += 1;
            return Ok(self.finish());
        }

        self.sessions = self
            .folders
            .iter()
            .enumerate()
            .filter(|(_, folder)| folder.conforming)
            .map(|(idx, _)| idx)
            .collect();
        self.out.stats.folders_seen = self.folders.len();

        let candidate = self.first_candidate().await?;
        debug!(
            root = %self.root,
            folders = self.folders.len(),
            sessions = self.sessions.len(),
            candidate,
            "Located first candidate session"
        );

        let kind = self.storage.timestamp_kind();
        let mut session = 0;
        let mut ordered = true;
        let mut terminated = false;
        let mut last_stamp: Option<DateTime<Utc>> = None;
        // Latest file timestamp of the previous session, when it was listed
        let mut carried: Option<DateTime<Utc>> = None;

        for idx in 0..self.folders.len() {
            if !self.folders[idx].conforming {
                let path = self.folders[idx].path.clone();
                self.record(path, AnomalyKind::UnrecognizedFolder);
                self.collect(idx, None, None).await?;
                continue;
            }

            let current = session;
            session += 1;
            let previous_end = carried.take();

            if current < candidate || terminated {
                self.out.stats.folders_pruned += 1;
                continue;
            }

            let own = self.first_stamp(current).await?;
            let next = if current + 1 < self.sessions.len() {
                self.first_stamp(current + 1).await?
            } else {
                None
            };

            if let (Some(reference), Some(next_stamp)) = (own.or(last_stamp), next) {
                if next_stamp < reference {
                    let path = self.folders[self.sessions[current + 1]].path.clone();
                    self.record(
                        path,
                        AnomalyKind::OutOfOrderSession {
                            previous_start: reference,
                            start: next_stamp,
                        },
                    );
                    ordered = false;
                }
            }
            last_stamp = own.or(last_stamp);

            // A session's records lie after its own first-file start, or
            // after the previous session's files were closed.
            let lower = match kind {
                TimestampKind::Start => own,
                TimestampKind::End => {
                    let previous = match current.checked_sub(1) {
                        Some(previous) => self.first_stamp(previous).await?,
                        None => None,
                    };
                    latest(previous, previous_end)
                }
            };
            let upper = match (lower, next) {
                (Some(lower), Some(next)) if next > lower => Some(next),
                (None, next) => next,
                _ => None,
            };
            let span = match (lower, upper) {
                (Some(lower), Some(upper)) => TimeSpan::bounded(lower, upper),
                (Some(lower), None) => TimeSpan::starting_at(lower),
                (None, upper) => TimeSpan::from_end(upper),
            };

            match self.filter.classify(&span) {
                Classification::Skip(SkipReason::After) => {
                    self.out.stats.folders_pruned += 1;
                    if ordered {
                        debug!(
                            root = %self.root,
                            folder = %self.folders[idx].name,
                            "Session starts after the window, stopping"
                        );
                        terminated = true;
                    }
                }
                Classification::Skip(SkipReason::Before) => {
                    self.out.stats.folders_pruned += 1;
                }
                Classification::Include | Classification::Inspect => {
                    carried = self.collect(idx, lower, upper).await?;
                }
            }
        }

        Ok(self.finish())
    }

    /// Index into `sessions` of the first session that may overlap the window.
    ///
    /// Bisects on first-file timestamps: every session before the
    /// last one stamped ahead of the window start is known to end before it,
    /// whichever side of the recording the stamps mark. Falls back to the
    /// first session when a lookup is inconclusive or the stamps are
    /// not ascending.
    async fn first_candidate(&mut self) -> Result<usize> {
        let Some(window_start) = self.filter.window().start() else {
            return Ok(0);
        };

        let (mut lo, mut hi) = (0, self.sessions.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.first_stamp(mid).await? {
                Some(start) if start < window_start => lo = mid + 1,
                Some(_) => hi = mid,
                None => {
                    debug!(root = %self.root, session = mid, "Inconclusive first-file lookup, walking from the first session");
                    return Ok(0);
                }
            }
        }

        let mut sampled: Vec<(usize, DateTime<Utc>)> = self
            .stamps
            .iter()
            .filter_map(|(idx, start)| start.map(|start| (*idx, start)))
            .collect();
        sampled.sort_unstable();
        if sampled.windows(2).any(|pair| pair[1].1 < pair[0].1) {
            debug!(root = %self.root, "Session stamps are not ascending, walking from the first session");
            return Ok(0);
        }

        Ok(lo.saturating_sub(1))
    }

    /// Backend timestamp of a session's first accepted file, memoized.
    async fn first_stamp(&mut self, session: usize) -> Result<Option<DateTime<Utc>>> {
        if let Some(stamp) = self.stamps.get(&session) {
            return Ok(*stamp);
        }

        let storage = self.storage;
        let naming = self.naming;
        let path = &self.folders[self.sessions[session]].path;
        self.out.stats.first_file_lookups += 1;

        let accept = |name: &str| naming.accepts_extension(name);
        let stamp = match storage.first_file(path, &accept).await {
            Ok(Some(entry)) => entry.modified,
            Ok(None) => None,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(LbError::backend(&self.root, e)),
        };

        self.stamps.insert(session, stamp);
        Ok(stamp)
    }

    /// List a folder and keep the files that may overlap the window.
    ///
    /// Returns the latest timestamp seen in the folder.
    async fn collect(
        &mut self,
        idx: usize,
        lower: Option<DateTime<Utc>>,
        upper: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>> {
        let naming = self.naming;
        let path = self.folders[idx].path.clone();

        let files = naming
            .log_files_of(self.storage, &path, lower, upper)
            .await
            .map_err(|e| LbError::backend(&self.root, e))?;
        self.out.stats.folders_listed += 1;

        let mut latest_end = None;
        for file in files {
            latest_end = latest(latest_end, file.span.end());

            if !file.conforming {
                self.record(file.path.clone(), AnomalyKind::UnrecognizedFile);
            }

            let classification = self.filter.classify(&file.span);
            if !classification.may_overlap() {
                self.out.stats.record_skip();
                continue;
            }

            self.out.stats.record_match(file.size);
            self.out.files.push(DiscoveredFile {
                root: self.root.clone(),
                path: file.path,
                size_bytes: file.size,
                span: file.span,
                classification,
            });
        }

        Ok(latest_end)
    }

    fn record(&mut self, path: String, kind: AnomalyKind) {
        let anomaly = Anomaly::new(self.root.clone(), path, kind);
        warn!(root = %self.root, anomaly = %anomaly, "Naming anomaly");
        self.out.stats.anomalies += 1;
        self.out.anomalies.push(anomaly);
    }

    fn finish(mut self) -> Discovery {
        self.out.stats.roots_processed += 1;
        self.out.stats.complete();
        self.out
    }
}
