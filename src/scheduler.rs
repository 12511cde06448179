//! Fetch-and-match cycles on a fixed period

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::actions::Action;
use crate::config::{interval_duration, ConfigStore, Settings};
use crate::diagnostics::DiagnosticLog;
use crate::error::{Result, WatchError};
use crate::fetch::FeedSource;
use crate::matcher::{match_title, normalize, MatchKind, MatchResult};
use crate::notify::{Notification, Notifier};
use crate::site::SiteRegistry;

/// How many matches are remembered for the "open title" action
const RECENT_MATCHES: usize = 20;

/// A watchlist title found in the feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub title: String,
    pub site: String,
    pub kind: MatchKind,
    pub link: Option<String>,
}

/// Per-entry result within a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryStatus {
    pub title: String,
    pub result: MatchResult,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// Every entry was checked against a complete feed
    Completed,
    /// The feed stream broke; entries were checked against what arrived
    Interrupted(WatchError),
    /// Nothing to check
    EmptyWatchlist,
    /// The cycle was skipped
    Failed(WatchError),
}

/// Summary of one cycle
#[derive(Debug)]
pub struct CycleReport {
    pub site: Option<String>,
    pub entries: Vec<EntryStatus>,
    pub matches: Vec<Match>,
    pub fetches: usize,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    fn skipped(site: Option<String>, outcome: CycleOutcome) -> Self {
        Self {
            site,
            entries: Vec::new(),
            matches: Vec::new(),
            fetches: 0,
            outcome,
        }
    }

    pub fn error(&self) -> Option<&WatchError> {
        match &self.outcome {
            CycleOutcome::Interrupted(e) | CycleOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// What the user can do about this outcome, if anything
    pub fn hint(&self) -> Option<&'static str> {
        match &self.outcome {
            CycleOutcome::EmptyWatchlist => WatchError::EmptyWatchlist.hint(),
            CycleOutcome::Interrupted(e) | CycleOutcome::Failed(e) => e.hint(),
            CycleOutcome::Completed => None,
        }
    }
}

/// Builds the feed source and notifier for a set of settings
pub type Rebuild<S, N> = Box<dyn FnMut(&Settings) -> (S, N)>;

/// Something the run loop hands back to its caller
#[derive(Debug)]
pub enum LoopEvent<'a> {
    /// A cycle finished
    Cycle(&'a CycleReport),
    /// An action the loop does not handle itself, with the recent matches
    /// (newest first) for resolving `OpenTitle`
    Action(Action, &'a [Match]),
    /// The interval was re-read after a restart
    Restarted(Duration),
}

/// Index and due time of the tick that follows tick `last`.
///
/// Ticks sit on a fixed grid `start + n * interval`. When a cycle overruns
/// one or more ticks, they collapse into a single cycle that is due
/// immediately and takes the index of the latest missed tick, so the one
/// after it lands back on the grid.
pub fn next_tick(start: Instant, interval: Duration, last: u32, now: Instant) -> (u32, Instant) {
    let next = last.saturating_add(1);
    if interval.is_zero() {
        return (next, now);
    }

    let due = interval
        .checked_mul(next)
        .and_then(|offset| start.checked_add(offset));
    let Some(due) = due else {
        // Past the end of representable time: wait one more period
        return (next, now.checked_add(interval).unwrap_or(now));
    };
    if due >= now {
        return (next, due);
    }

    let elapsed = now.saturating_duration_since(start).as_nanos() / interval.as_nanos();
    let missed = u32::try_from(elapsed).unwrap_or(u32::MAX).max(next);
    (missed, now)
}

pub struct Scheduler<S, N> {
    store: ConfigStore,
    settings: Settings,
    registry: SiteRegistry,
    source: S,
    notifier: N,
    diagnostics: DiagnosticLog,
    interval: Duration,
    recent: Vec<Match>,
    rebuild: Option<Rebuild<S, N>>,
}

impl<S: FeedSource, N: Notifier> Scheduler<S, N> {
    /// Build a scheduler, reading the interval once.
    /// A malformed interval file fails here, before any cycle runs.
    pub fn new(store: ConfigStore, settings: Settings, source: S, notifier: N) -> Result<Self> {
        let registry = SiteRegistry::with_extra(&settings.sites)?;
        let minutes = store.read_interval(settings.default_interval_minutes)?;
        let interval = interval_duration(minutes)?;
        let diagnostics = DiagnosticLog::new(store.paths().error_log());

        Ok(Self {
            store,
            settings,
            registry,
            source,
            notifier,
            diagnostics,
            interval,
            recent: Vec::new(),
            rebuild: None,
        })
    }

    /// Rebuild the feed source and notifier from fresh settings on restart
    pub fn with_rebuild<F>(mut self, rebuild: F) -> Self
    where
        F: FnMut(&Settings) -> (S, N) + 'static,
    {
        self.rebuild = Some(Box::new(rebuild));
        self
    }

    /// Override the period, mostly for tests
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticLog) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Matches from recent cycles, newest first
    pub fn recent_matches(&self) -> &[Match] {
        &self.recent
    }

    /// Log an error and tell the user about it
    fn report(&self, context: &str, error: &WatchError) {
        self.diagnostics.record(context, error);
        let body = match error.hint() {
            Some(hint) => format!("{}\n{}", error, hint),
            None => error.to_string(),
        };
        if let Err(e) = self.notifier.notify(&Notification::error(context_title(context), body)) {
            self.diagnostics.record("sending notification", &e);
        }
    }

    /// Run one full pass: read site and watchlist, fetch once, match every entry
    pub fn run_cycle(&mut self) -> CycleReport {
        let site_id = match self.store.read_site() {
            Ok(id) => id,
            Err(e) => {
                self.report("reading site", &e);
                return CycleReport::skipped(None, CycleOutcome::Failed(e));
            }
        };

        let site = match self.registry.resolve(&site_id) {
            Ok(site) => site.clone(),
            Err(e) => {
                self.report("selecting site", &e);
                return CycleReport::skipped(Some(site_id), CycleOutcome::Failed(e));
            }
        };

        let watchlist = match self.store.read_watchlist() {
            Ok(titles) => titles,
            Err(e) => {
                self.report("reading watchlist", &e);
                return CycleReport::skipped(Some(site.id), CycleOutcome::Failed(e));
            }
        };

        if watchlist.is_empty() {
            tracing::info!(site = %site.id, "watchlist is empty, nothing to check");
            return CycleReport::skipped(Some(site.id), CycleOutcome::EmptyWatchlist);
        }

        tracing::info!(site = %site.id, entries = watchlist.len(), "starting cycle");

        let feed = match self.source.fetch(&site.feed_url) {
            Ok(feed) => feed,
            Err(e) => {
                let e = match e {
                    WatchError::FetchFailed(_) => e,
                    other => WatchError::FetchFailed(other.to_string()),
                };
                self.report("fetching feed", &e);
                return CycleReport {
                    fetches: 1,
                    ..CycleReport::skipped(Some(site.id), CycleOutcome::Failed(e))
                };
            }
        };

        let mut entries = Vec::with_capacity(watchlist.len());
        let mut matches = Vec::new();

        for title in watchlist {
            let result = match_title(&title, &feed.text, &site);
            if result.found {
                let link = site.title_url(&normalize(&title), result.kind);
                tracing::info!(title = %title, site = %site.id, kind = %result.kind, "title available");

                let notification = Notification::available(&title, &site.id, result.kind, link.clone());
                if let Err(e) = self.notifier.notify(&notification) {
                    self.diagnostics.record("sending notification", &e);
                }
                matches.push(Match {
                    title: title.clone(),
                    site: site.id.clone(),
                    kind: result.kind,
                    link,
                });
            } else {
                tracing::debug!(title = %title, site = %site.id, "title not available");
            }
            entries.push(EntryStatus { title, result });
        }

        for m in matches.iter().rev() {
            self.recent.insert(0, m.clone());
        }
        self.recent.truncate(RECENT_MATCHES);

        // Matches found before the stream broke still count
        let outcome = match feed.interrupted {
            Some(reason) => {
                let e = WatchError::FetchFailed(format!("feed ended early: {}", reason));
                self.report("reading feed", &e);
                CycleOutcome::Interrupted(e)
            }
            None => CycleOutcome::Completed,
        };

        CycleReport {
            site: Some(site.id),
            entries,
            matches,
            fetches: 1,
            outcome,
        }
    }

    /// Re-read settings and the interval, as a fresh launch would.
    /// On failure the previous configuration stays in effect.
    pub fn reload(&mut self) -> Result<()> {
        self.store.ensure_files()?;
        let settings = self.store.load_settings()?;
        let registry = SiteRegistry::with_extra(&settings.sites)?;
        let minutes = self.store.read_interval(settings.default_interval_minutes)?;
        let interval = interval_duration(minutes)?;

        if let Some(rebuild) = self.rebuild.as_mut() {
            let (source, notifier) = rebuild(&settings);
            self.source = source;
            self.notifier = notifier;
        }
        self.registry = registry;
        self.settings = settings;
        self.interval = interval;
        Ok(())
    }

    /// Run cycles until an `Exit` action arrives.
    ///
    /// The first cycle runs immediately, later ones on a fixed grid of
    /// `interval`. Actions are handled between cycles; only one cycle is
    /// ever in flight.
    pub fn run<F>(&mut self, actions: &Receiver<Action>, mut on_event: F) -> Result<()>
    where
        F: FnMut(LoopEvent<'_>),
    {
        if let Err(e) = self.notifier.startup() {
            self.diagnostics.record("sending startup notification", &e);
        }

        let mut start = Instant::now();
        let mut tick = 0u32;
        let mut due = start;
        let mut actions_open = true;

        loop {
            let now = Instant::now();
            if now >= due {
                let report = self.run_cycle();
                on_event(LoopEvent::Cycle(&report));
                (tick, due) = next_tick(start, self.interval, tick, Instant::now());
                continue;
            }

            if !actions_open {
                std::thread::sleep(due - now);
                continue;
            }

            match actions.recv_timeout(due - now) {
                Ok(Action::Exit) => {
                    tracing::info!("exit requested");
                    return Ok(());
                }
                Ok(Action::CheckNow) => {
                    // Out of band; the tick grid is unchanged
                    let report = self.run_cycle();
                    on_event(LoopEvent::Cycle(&report));
                }
                Ok(Action::Restart) => match self.reload() {
                    Ok(()) => {
                        tracing::info!(interval_secs = self.interval.as_secs(), "restarted");
                        on_event(LoopEvent::Restarted(self.interval));
                        if let Err(e) = self.notifier.startup() {
                            self.diagnostics.record("sending startup notification", &e);
                        }
                        start = Instant::now();
                        tick = 0;
                        due = start;
                    }
                    Err(e) => self.report("restarting", &e),
                },
                Ok(action) => on_event(LoopEvent::Action(action, &self.recent)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => actions_open = false,
            }
        }
    }
}

fn context_title(context: &str) -> String {
    let mut chars = context.chars();
    match chars.next() {
        Some(first) => format!("Error {}{}", first.to_lowercase(), chars.as_str()),
        None => "Error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_ticks_are_on_grid() {
        let start = Instant::now();
        let interval = Duration::from_secs(60);

        let (tick, due) = next_tick(start, interval, 0, start + Duration::from_secs(3));
        assert_eq!(tick, 1);
        assert_eq!(due, start + interval);

        let (tick, due) = next_tick(start, interval, 1, start + Duration::from_secs(61));
        assert_eq!(tick, 2);
        assert_eq!(due, start + interval * 2);
    }

    #[test]
    fn test_overrun_runs_once_then_rejoins_grid() {
        let start = Instant::now();
        let interval = Duration::from_secs(10);

        // Cycle 0 took 25s: ticks 1 and 2 were missed
        let late = start + Duration::from_secs(25);
        let (tick, due) = next_tick(start, interval, 0, late);
        assert_eq!(tick, 2);
        assert_eq!(due, late);

        // The deferred cycle finished at 27s; tick 3 is back on the grid
        let (tick, due) = next_tick(start, interval, 2, start + Duration::from_secs(27));
        assert_eq!(tick, 3);
        assert_eq!(due, start + Duration::from_secs(30));
    }

    #[test]
    fn test_exactly_on_tick_is_not_an_overrun() {
        let start = Instant::now();
        let interval = Duration::from_secs(10);
        let (tick, due) = next_tick(start, interval, 0, start + interval);
        assert_eq!((tick, due), (1, start + interval));
    }

    #[test]
    fn test_grid_past_representable_time_waits_one_period() {
        let start = Instant::now();
        let interval = Duration::from_secs(u64::MAX / 4);
        let (tick, due) = next_tick(start, interval, 7, start);
        assert_eq!(tick, 8);
        assert!(due >= start);
    }

    #[test]
    fn test_zero_interval_is_immediate() {
        let start = Instant::now();
        let now = start + Duration::from_millis(5);
        assert_eq!(next_tick(start, Duration::ZERO, 4, now), (5, now));
    }

    #[test]
    fn test_context_title() {
        assert_eq!(context_title("fetching feed"), "Error fetching feed");
        assert_eq!(context_title(""), "Error");
    }
}
