//! End-to-end tests for fetch-and-match cycles and the run loop,
//! using an in-memory feed and a notifier that records what it was sent.

use std::cell::{Cell, RefCell};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use reelwatch::actions::Action;
use reelwatch::config::{ConfigStore, NotifyTarget, Paths, Settings};
use reelwatch::error::{Result, WatchError};
use reelwatch::fetch::{FeedBody, FeedSource};
use reelwatch::matcher::MatchKind;
use reelwatch::notify::{Notification, Notifier, Severity};
use reelwatch::scheduler::{CycleOutcome, LoopEvent, Scheduler};

const PSA_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
<title>PSA</title>
<item>
<title>The Matrix (1999)</title>
<link>https://psarips.eu/movie/the-matrix-1999/</link>
</item>
<item>
<title>Dark S03</title>
<link>https://psarips.eu/tv-show/dark/</link>
</item>
</channel>
</rss>
"#;

// ============================================================================
// Fakes
// ============================================================================

struct StaticFeed {
    body: String,
    interrupted: Option<String>,
    fail: Cell<bool>,
    fetches: Cell<usize>,
}

impl StaticFeed {
    fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            interrupted: None,
            fail: Cell::new(false),
            fetches: Cell::new(0),
        }
    }
}

impl FeedSource for StaticFeed {
    fn fetch(&self, url: &str) -> Result<FeedBody> {
        self.fetches.set(self.fetches.get() + 1);
        if self.fail.get() {
            return Err(WatchError::FetchFailed(format!("{}: connection refused", url)));
        }
        Ok(FeedBody {
            url: url.to_string(),
            text: self.body.clone(),
            interrupted: self.interrupted.clone(),
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: RefCell<Vec<Notification>>,
    fail: bool,
    target: &'static str,
}

impl RecordingNotifier {
    fn matches(&self) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .filter(|n| n.title.contains(" is available on "))
            .map(|n| n.title.clone())
            .collect()
    }

    fn errors(&self) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .filter(|n| n.severity == Severity::Error)
            .map(|n| format!("{}: {}", n.title, n.body))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.borrow_mut().push(notification.clone());
        if self.fail {
            return Err(WatchError::NotificationError("sink down".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn setup(site: &str, watchlist: &str) -> (tempfile::TempDir, ConfigStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::new(Paths::new(dir.path()));
    store.ensure_files().unwrap();
    std::fs::write(store.paths().site(), site).unwrap();
    std::fs::write(store.paths().watchlist(), watchlist).unwrap();
    (dir, store)
}

fn scheduler(
    store: &ConfigStore,
    feed: StaticFeed,
    notifier: RecordingNotifier,
) -> Scheduler<StaticFeed, RecordingNotifier> {
    Scheduler::new(store.clone(), Settings::default(), feed, notifier).unwrap()
}

// ============================================================================
// Single cycles
// ============================================================================

#[test]
fn test_matching_title_notifies_with_movie_kind() {
    let (_dir, store) = setup("psarips\n", "The Matrix (1999)\nNonexistent Title\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let report = s.run_cycle();

    assert!(matches!(report.outcome, CycleOutcome::Completed));
    assert_eq!(report.site.as_deref(), Some("psarips"));
    assert_eq!(report.entries.len(), 2);
    assert!(report.entries[0].result.found);
    assert_eq!(report.entries[0].result.kind, MatchKind::Movie);
    assert!(!report.entries[1].result.found);

    assert_eq!(report.matches.len(), 1);
    assert_eq!(
        report.matches[0].link.as_deref(),
        Some("https://psarips.eu/movie/the-matrix-1999/")
    );
    assert_eq!(
        s.notifier().matches(),
        vec!["The Matrix (1999) is available on psarips"]
    );
    assert!(s.notifier().errors().is_empty());
}

#[test]
fn test_show_kind_and_file_order() {
    let (_dir, store) = setup("PSARIPS", "Dark\nThe Matrix (1999)\nDark\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let report = s.run_cycle();

    let kinds: Vec<_> = report.entries.iter().map(|e| e.result.kind).collect();
    assert_eq!(kinds, vec![MatchKind::Show, MatchKind::Movie, MatchKind::Show]);
    // Duplicates are not collapsed
    assert_eq!(s.notifier().matches().len(), 3);
    assert_eq!(report.matches[0].link.as_deref(), Some("https://psarips.eu/tv-show/dark/"));
}

#[test]
fn test_feed_fetched_once_per_cycle() {
    let (_dir, store) = setup("psarips", "A\nB\nC\nD\nE\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let report = s.run_cycle();
    assert_eq!(report.fetches, 1);
    assert_eq!(s.source().fetches.get(), 1);

    s.run_cycle();
    assert_eq!(s.source().fetches.get(), 2);
}

#[test]
fn test_empty_watchlist_skips_fetch_without_error() {
    let (_dir, store) = setup("psarips", "\n   \n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let report = s.run_cycle();

    assert!(matches!(report.outcome, CycleOutcome::EmptyWatchlist));
    assert!(report.error().is_none());
    assert!(report.hint().unwrap().contains("reelwatch add"));
    assert_eq!(s.source().fetches.get(), 0);
    assert!(s.notifier().sent.borrow().is_empty());
}

#[test]
fn test_unknown_site_reports_and_skips_fetch() {
    let (dir, store) = setup("piratebay", "The Matrix (1999)\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let report = s.run_cycle();

    assert!(matches!(report.outcome, CycleOutcome::Failed(WatchError::UnknownSite(ref id)) if id == "piratebay"));
    assert_eq!(report.fetches, 0);
    assert_eq!(s.source().fetches.get(), 0);
    assert!(s.notifier().matches().is_empty());
    assert_eq!(s.notifier().errors().len(), 1);

    let log = std::fs::read_to_string(dir.path().join("error.log")).unwrap();
    assert!(log.contains("[UnknownSite]"));
    assert!(log.contains("OS name:"));
}

#[test]
fn test_empty_site_file_is_unknown_site() {
    let (_dir, store) = setup("", "The Matrix (1999)\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let report = s.run_cycle();
    assert!(matches!(report.error(), Some(WatchError::UnknownSite(_))));
    assert_eq!(s.source().fetches.get(), 0);
}

#[test]
fn test_missing_watchlist_is_reported() {
    let (_dir, store) = setup("yts", "");
    std::fs::remove_file(store.paths().watchlist()).unwrap();
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let report = s.run_cycle();
    assert!(matches!(report.error(), Some(WatchError::ConfigMissing(_))));
    assert_eq!(s.notifier().errors().len(), 1);
}

#[test]
fn test_fetch_failure_degrades_only_that_cycle() {
    let (_dir, store) = setup("psarips", "The Matrix (1999)\n");
    let feed = StaticFeed::new(PSA_FEED);
    feed.fail.set(true);
    let mut s = scheduler(&store, feed, RecordingNotifier::default());

    let report = s.run_cycle();
    assert!(matches!(report.error(), Some(WatchError::FetchFailed(_))));
    assert!(report.entries.is_empty());
    assert!(s.notifier().matches().is_empty());
    assert!(s.notifier().errors()[0].contains("connection refused"));

    s.source().fail.set(false);
    let report = s.run_cycle();
    assert!(matches!(report.outcome, CycleOutcome::Completed));
    assert_eq!(s.notifier().matches().len(), 1);
}

#[test]
fn test_partial_feed_matches_are_honoured() {
    let (_dir, store) = setup("psarips", "The Matrix (1999)\nDark\n");
    let mut feed = StaticFeed::new("<item><link>https://psarips.eu/movie/the-matrix-1999/</link>\n");
    feed.interrupted = Some("read timed out".into());
    let mut s = scheduler(&store, feed, RecordingNotifier::default());

    let report = s.run_cycle();

    assert!(matches!(report.outcome, CycleOutcome::Interrupted(WatchError::FetchFailed(_))));
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[0].title, "The Matrix (1999)");
    assert_eq!(s.notifier().matches().len(), 1);
    assert_eq!(s.notifier().errors().len(), 1);
}

#[test]
fn test_notifier_failure_does_not_abort_cycle() {
    let (_dir, store) = setup("psarips", "The Matrix (1999)\nDark\n");
    let notifier = RecordingNotifier { fail: true, ..Default::default() };
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), notifier);

    let report = s.run_cycle();
    assert!(matches!(report.outcome, CycleOutcome::Completed));
    assert_eq!(report.matches.len(), 2);
}

#[test]
fn test_watchlist_edits_picked_up_next_cycle() {
    let (_dir, store) = setup("psarips", "Nonexistent Title\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    assert!(s.run_cycle().matches.is_empty());

    store.append_watchlist("Dark").unwrap();
    let report = s.run_cycle();
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[0].kind, MatchKind::Show);
}

#[test]
fn test_recent_matches_newest_first() {
    let (_dir, store) = setup("psarips", "The Matrix (1999)\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    s.run_cycle();
    std::fs::write(store.paths().watchlist(), "Dark\n").unwrap();
    s.run_cycle();

    let titles: Vec<_> = s.recent_matches().iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Dark", "The Matrix (1999)"]);
}

#[test]
fn test_invalid_interval_fails_before_running() {
    let (_dir, store) = setup("psarips", "Dark\n");
    std::fs::write(store.paths().interval(), "every hour\n").unwrap();

    let result = Scheduler::new(
        store.clone(),
        Settings::default(),
        StaticFeed::new(PSA_FEED),
        RecordingNotifier::default(),
    );
    assert!(matches!(result, Err(WatchError::InvalidInterval(_))));
}

#[test]
fn test_interval_beyond_a_year_fails_before_running() {
    let (_dir, store) = setup("psarips", "Dark\n");
    for huge in ["200000000000000000", "400000000000000000", "525601"] {
        std::fs::write(store.paths().interval(), huge).unwrap();
        let result = Scheduler::new(
            store.clone(),
            Settings::default(),
            StaticFeed::new(PSA_FEED),
            RecordingNotifier::default(),
        );
        assert!(matches!(result, Err(WatchError::InvalidInterval(_))), "{}", huge);
    }
}

#[test]
fn test_year_long_interval_runs_and_exits() {
    let (_dir, store) = setup("psarips", "Dark\n");
    std::fs::write(store.paths().interval(), "525600\n").unwrap();
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let (tx, rx) = mpsc::channel();
    tx.send(Action::Exit).unwrap();
    let mut cycles = 0;
    s.run(&rx, |event| {
        if let LoopEvent::Cycle(_) = event {
            cycles += 1;
        }
    })
    .unwrap();
    assert_eq!(cycles, 1);
}

#[test]
fn test_interval_read_from_file() {
    let (_dir, store) = setup("psarips", "Dark\n");
    store.write_interval(45).unwrap();
    let s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());
    assert_eq!(s.interval(), Duration::from_secs(45 * 60));
}

// ============================================================================
// Run loop
// ============================================================================

#[test]
fn test_run_fires_immediately_then_handles_actions() {
    let (_dir, store) = setup("psarips", "The Matrix (1999)\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());

    let (tx, rx) = mpsc::channel();
    tx.send(Action::CheckNow).unwrap();
    tx.send(Action::OpenTitle(1)).unwrap();
    tx.send(Action::Exit).unwrap();

    let started = Instant::now();
    let mut cycles = Vec::new();
    let mut forwarded = Vec::new();
    s.run(&rx, |event| match event {
        LoopEvent::Cycle(report) => cycles.push((started.elapsed(), report.matches.len())),
        LoopEvent::Action(action, recent) => forwarded.push((action, recent.len())),
        LoopEvent::Restarted(_) => {}
    })
    .unwrap();

    // Cycle 0 plus the manual check; the hourly tick never came
    assert_eq!(cycles.len(), 2);
    assert!(cycles[0].0 < Duration::from_secs(5));
    assert_eq!(forwarded, vec![(Action::OpenTitle(1), 2)]);

    let sent = s.notifier().sent.borrow();
    assert!(sent[0].title.contains("running in the background"));
}

#[test]
fn test_run_keeps_fixed_period() {
    let (_dir, store) = setup("psarips", "Dark\n");
    let interval = Duration::from_millis(40);
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default())
        .with_interval(interval);

    let (tx, rx) = mpsc::channel();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(190));
        tx.send(Action::Exit).unwrap();
    });

    let started = Instant::now();
    let mut fired = Vec::new();
    s.run(&rx, |event| {
        if let LoopEvent::Cycle(_) = event {
            fired.push(started.elapsed());
        }
    })
    .unwrap();
    stopper.join().unwrap();

    assert!(fired.len() >= 3, "only {} cycles fired", fired.len());
    // Cycle n never fires before its slot on the grid
    for (n, at) in fired.iter().enumerate() {
        assert!(*at + Duration::from_millis(2) >= interval * n as u32, "cycle {} at {:?}", n, at);
    }
}

#[test]
fn test_restart_rereads_interval_and_fires_again() {
    let (_dir, store) = setup("psarips", "Dark\n");
    store.write_interval(1).unwrap();
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());
    assert_eq!(s.interval(), Duration::from_secs(60));

    store.write_interval(2).unwrap();
    let (tx, rx) = mpsc::channel();
    tx.send(Action::Restart).unwrap();
    tx.send(Action::Exit).unwrap();

    let mut cycles = 0;
    let mut restarted = None;
    s.run(&rx, |event| match event {
        LoopEvent::Cycle(_) => cycles += 1,
        LoopEvent::Restarted(interval) => restarted = Some(interval),
        LoopEvent::Action(..) => {}
    })
    .unwrap();

    assert_eq!(cycles, 2);
    assert_eq!(restarted, Some(Duration::from_secs(120)));
    assert_eq!(s.interval(), Duration::from_secs(120));
}

#[test]
fn test_failed_restart_keeps_old_interval() {
    let (_dir, store) = setup("psarips", "Dark\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default());
    let before = s.interval();

    std::fs::write(store.paths().interval(), "0\n").unwrap();
    let (tx, rx) = mpsc::channel();
    tx.send(Action::Restart).unwrap();
    tx.send(Action::Exit).unwrap();

    s.run(&rx, |_| {}).unwrap();

    assert_eq!(s.interval(), before);
    assert!(s.notifier().errors().iter().any(|e| e.contains("Invalid update interval")));
}

#[test]
fn test_restart_rebuilds_feed_and_notifier_from_new_settings() {
    let (_dir, store) = setup("psarips", "Dark\n");
    let mut s = scheduler(&store, StaticFeed::new(PSA_FEED), RecordingNotifier::default())
        .with_rebuild(|settings: &Settings| {
            let notifier = RecordingNotifier {
                target: settings.notify.name(),
                ..Default::default()
            };
            (StaticFeed::new(PSA_FEED), notifier)
        });
    assert_eq!(s.notifier().target, "");

    let settings = Settings {
        notify: NotifyTarget::Command { command: "cat".into() },
        ..Settings::default()
    };
    store.save_settings(&settings).unwrap();

    let (tx, rx) = mpsc::channel();
    tx.send(Action::Restart).unwrap();
    tx.send(Action::Exit).unwrap();
    s.run(&rx, |_| {}).unwrap();

    assert_eq!(s.notifier().target, "command");
    assert_eq!(s.settings().notify.name(), "command");
    // The cycle after the restart went through the new pair
    assert_eq!(s.source().fetches.get(), 1);
    assert_eq!(s.notifier().matches().len(), 1);
}
