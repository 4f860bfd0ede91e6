use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch as signal};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use locsync_core::Config;
use locsync_sync::{RunOptions, RunReport, SyncError};
use locsync_translate::TranslatorFactory;

use crate::error::WatchError;
use crate::gate::RunGate;

/// Quiet period after the last change before a run fires.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Flips to `true` when the watcher is stopping.
pub type StopSignal = signal::Receiver<bool>;

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// One full synchronization pass for a freshly loaded config.
///
/// `stop` asks the run to give up. A run that has already started writing
/// should finish instead; the watcher waits for it either way.
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    async fn run(&self, config: Arc<Config>, stop: StopSignal) -> Result<RunReport, SyncError>;
}

/// Runs the sync engine with a backend built from each loaded config.
pub struct SyncRunner<F> {
    options: RunOptions,
    make_factory: F,
}

impl<F> SyncRunner<F>
where
    F: Fn(&Config) -> Arc<dyn TranslatorFactory> + Send + Sync + 'static,
{
    pub fn new(options: RunOptions, make_factory: F) -> Self {
        Self {
            options,
            make_factory,
        }
    }
}

#[async_trait]
impl<F> Runner for SyncRunner<F>
where
    F: Fn(&Config) -> Arc<dyn TranslatorFactory> + Send + Sync + 'static,
{
    async fn run(
        &self,
        config: Arc<Config>,
        mut stop: StopSignal,
    ) -> Result<RunReport, SyncError> {
        let factory = (self.make_factory)(&config);
        locsync_sync::run_until(config, factory, self.options, async move {
            let _ = stop.wait_for(|stopping| *stopping).await;
        })
        .await
    }
}

/// Directory-level watch registration.
pub trait DirWatch {
    fn watch_dir(&mut self, dir: &Path) -> Result<(), WatchError>;
    fn unwatch_dir(&mut self, dir: &Path);
}

impl<W: Watcher> DirWatch for W {
    fn watch_dir(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unwatch_dir(&mut self, dir: &Path) {
        if let Err(err) = self.unwatch(dir) {
            tracing::debug!(dir = %dir.display(), error = %err, "unwatch failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run once, then again whenever the config, the source file or an
/// instructions file changes, until `shutdown` completes.
///
/// Runs never overlap; changes during a run produce exactly one follow-up.
/// A failed run is logged and watching continues.
pub async fn watch(
    config_path: PathBuf,
    runner: Arc<dyn Runner>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), WatchError> {
    let config = Config::load(&config_path)?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut watcher = recommended_watcher(move |event: notify::Result<Event>| match event {
        Ok(event) if is_relevant_event_kind(&event.kind) => {
            for path in event.paths {
                let _ = event_tx.send(path);
            }
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "watcher event error"),
    })?;

    event_loop(config_path, &config, runner, &mut watcher, event_rx, shutdown).await
}

pub(crate) async fn event_loop<D: DirWatch>(
    config_path: PathBuf,
    initial: &Config,
    runner: Arc<dyn Runner>,
    watcher: &mut D,
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), WatchError> {
    let mut watched = WatchSet::default();
    watched.update(watcher, &config_path, initial)?;
    tracing::info!(files = watched.len(), "watching for changes");

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Option<Config>>();
    let (stop_tx, stop_rx) = signal::channel(false);
    let spawn = || {
        spawn_run(
            config_path.clone(),
            Arc::clone(&runner),
            stop_rx.clone(),
            done_tx.clone(),
        )
    };

    let mut gate = RunGate::default();
    let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);
    let mut in_flight: Option<JoinHandle<()>> = None;
    if gate.trigger() {
        in_flight = Some(spawn());
    }

    tokio::pin!(shutdown);
    loop {
        let deadline = debouncer.deadline();
        tokio::select! {
            _ = &mut shutdown => {
                let _ = stop_tx.send(true);
                if let Some(handle) = in_flight.take() {
                    tracing::info!("stopping; waiting for the in-flight run to settle");
                    if let Err(err) = handle.await {
                        tracing::warn!(error = %err, "in-flight run did not finish cleanly");
                    }
                }
                break;
            }
            Some(path) = events.recv() => {
                if watched.contains(&path) {
                    tracing::debug!(path = %path.display(), "change detected");
                    debouncer.touch(Instant::now());
                }
            }
            _ = wait_until(deadline) => {
                debouncer.clear();
                if gate.trigger() {
                    in_flight = Some(spawn());
                } else {
                    tracing::debug!("run in flight; follow-up queued");
                }
            }
            Some(reloaded) = done_rx.recv() => {
                in_flight = None;
                if let Some(config) = reloaded {
                    if let Err(err) = watched.update(watcher, &config_path, &config) {
                        tracing::warn!(error = %err, "failed to update watched paths");
                    }
                }
                if gate.finish() {
                    in_flight = Some(spawn());
                }
            }
        }
    }

    Ok(())
}

/// Reload the config and run once. Sends the loaded config back, or `None`
/// when it failed to load.
fn spawn_run(
    config_path: PathBuf,
    runner: Arc<dyn Runner>,
    stop: StopSignal,
    done_tx: mpsc::UnboundedSender<Option<Config>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let config = match Config::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(error = %err, "config is invalid; skipping run");
                let _ = done_tx.send(None);
                return;
            }
        };

        let started = Instant::now();
        match runner.run(Arc::new(config.clone()), stop).await {
            Ok(report) => tracing::info!(
                changed = report.has_changes(),
                written = report.writes().filter(|w| w.is_change()).count(),
                failed = report.failures.len(),
                duration_ms = started.elapsed().as_millis() as u64,
                "watch-triggered sync completed",
            ),
            Err(SyncError::Aborted) => {
                tracing::info!("watch-triggered sync cancelled before writing")
            }
            Err(err) => tracing::error!(error = %err, "watch-triggered sync failed"),
        }
        let _ = done_tx.send(Some(config));
    })
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

/// Trailing-edge debounce: fires once input has been quiet for `window`.
#[derive(Debug)]
pub(crate) struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn clear(&mut self) {
        self.deadline = None;
    }
}

// ---------------------------------------------------------------------------
// Watched paths
// ---------------------------------------------------------------------------

/// Files that trigger a run, and the directories watched to see them.
///
/// Directories rather than files are watched so that editors which save by
/// writing a new file and renaming it over the old one are still seen.
#[derive(Debug, Default)]
pub(crate) struct WatchSet {
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
}

impl WatchSet {
    pub(crate) fn update(
        &mut self,
        watcher: &mut dyn DirWatch,
        config_path: &Path,
        config: &Config,
    ) -> Result<(), WatchError> {
        let files: HashSet<PathBuf> = std::iter::once(config_path.to_path_buf())
            .chain(config.input_paths())
            .map(|p| normalize(&p))
            .collect();
        let dirs: HashSet<PathBuf> = files
            .iter()
            .filter_map(|f| f.parent().map(Path::to_path_buf))
            .filter(|d| d.is_dir())
            .collect();

        for dir in dirs.difference(&self.dirs) {
            watcher.watch_dir(dir)?;
        }
        for dir in self.dirs.difference(&dirs) {
            watcher.unwatch_dir(dir);
        }
        self.files = files;
        self.dirs = dirs;
        Ok(())
    }

    pub(crate) fn contains(&self, path: &Path) -> bool {
        self.files.contains(&normalize(path))
    }

    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }
}

/// Canonicalize the parent directory so event paths (which may arrive as
/// real paths, e.g. /private/var/... on macOS) match configured paths. The
/// file itself may not exist.
fn normalize(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::oneshot;
    use tokio::time::{advance, sleep};

    /// Counts runs and the highest number running at once. Each run takes
    /// one second; with `honours_stop` it gives up as soon as stop is set.
    #[derive(Default)]
    struct SlowRunner {
        runs: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
        completed: AtomicUsize,
        cancelled: AtomicUsize,
        fail_first: bool,
        honours_stop: bool,
    }

    #[async_trait]
    impl Runner for SlowRunner {
        async fn run(
            &self,
            _config: Arc<Config>,
            mut stop: StopSignal,
        ) -> Result<RunReport, SyncError> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            let stopped = tokio::select! {
                _ = sleep(Duration::from_secs(1)) => false,
                _ = async { let _ = stop.wait_for(|s| *s).await; }, if self.honours_stop => true,
            };
            self.running.fetch_sub(1, Ordering::SeqCst);
            if stopped {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
                return Err(SyncError::Aborted);
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(SyncError::Join("scripted failure".into()));
            }
            Ok(RunReport::default())
        }
    }

    #[derive(Default)]
    struct RecordingWatch {
        watched: Vec<PathBuf>,
    }

    impl DirWatch for RecordingWatch {
        fn watch_dir(&mut self, dir: &Path) -> Result<(), WatchError> {
            self.watched.push(dir.to_path_buf());
            Ok(())
        }

        fn unwatch_dir(&mut self, dir: &Path) {
            self.watched.retain(|d| d != dir);
        }
    }

    const CONFIG: &str = "source:\n  file: en.csv\ntargets:\n  - language: French\n    file: fr.csv\n";

    struct Harness {
        dir: TempDir,
        config_path: PathBuf,
        events: mpsc::UnboundedSender<PathBuf>,
        stop: oneshot::Sender<()>,
        task: JoinHandle<Result<(), WatchError>>,
    }

    fn start(runner: Arc<SlowRunner>) -> Harness {
        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join("locsync.yaml");
        fs::write(&config_path, CONFIG).expect("write config");
        let config = Config::load(&config_path).expect("config");

        let (events, event_rx) = mpsc::unbounded_channel();
        let (stop, stop_rx) = oneshot::channel::<()>();
        let path = config_path.clone();
        let task = tokio::spawn(async move {
            let mut watcher = RecordingWatch::default();
            event_loop(path, &config, runner, &mut watcher, event_rx, async {
                let _ = stop_rx.await;
            })
            .await
        });
        Harness {
            dir,
            config_path,
            events,
            stop,
            task,
        }
    }

    impl Harness {
        fn source(&self) -> PathBuf {
            self.dir.path().join("en.csv")
        }

        async fn finish(self) {
            let _ = self.stop.send(());
            self.task.await.expect("join").expect("event loop");
        }
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn debounce_fires_once_after_quiet_window() {
        let mut debounce = Debouncer::new(Duration::from_millis(100));
        assert!(debounce.deadline().is_none());

        let start = Instant::now();
        for _ in 0..5 {
            debounce.touch(Instant::now());
            advance(Duration::from_millis(10)).await;
        }
        assert_eq!(
            debounce.deadline(),
            Some(start + Duration::from_millis(140)),
            "deadline trails the last touch"
        );
        debounce.clear();
        assert!(debounce.deadline().is_none());
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn burst_during_run_coalesces_into_one_follow_up() {
        let runner = Arc::new(SlowRunner::default());
        let harness = start(Arc::clone(&runner));

        // Initial run is in flight for 1s; save the source five times.
        for _ in 0..5 {
            sleep(Duration::from_millis(50)).await;
            harness.events.send(harness.source()).expect("send");
        }
        sleep(Duration::from_secs(5)).await;

        assert_eq!(runner.runs.load(Ordering::SeqCst), 2, "initial + one follow-up");
        assert_eq!(runner.max_running.load(Ordering::SeqCst), 1, "runs never overlap");
        harness.finish().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn shutdown_lets_a_writing_run_finish() {
        let runner = Arc::new(SlowRunner::default());
        let harness = start(Arc::clone(&runner));
        sleep(Duration::from_millis(200)).await;
        assert_eq!(runner.running.load(Ordering::SeqCst), 1);

        harness.finish().await;

        assert_eq!(runner.completed.load(Ordering::SeqCst), 1, "run was not cut short");
        assert_eq!(runner.running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn shutdown_signals_the_run_to_stop() {
        let runner = Arc::new(SlowRunner {
            honours_stop: true,
            ..SlowRunner::default()
        });
        let harness = start(Arc::clone(&runner));
        sleep(Duration::from_millis(200)).await;

        harness.finish().await;

        assert_eq!(runner.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(runner.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn unrelated_paths_are_ignored() {
        let runner = Arc::new(SlowRunner::default());
        let harness = start(Arc::clone(&runner));
        sleep(Duration::from_secs(2)).await;

        harness
            .events
            .send(harness.dir.path().join("fr.csv"))
            .expect("send");
        sleep(Duration::from_secs(3)).await;

        assert_eq!(runner.runs.load(Ordering::SeqCst), 1, "target writes must not retrigger");
        harness.finish().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn failed_run_keeps_watching() {
        let runner = Arc::new(SlowRunner {
            fail_first: true,
            ..SlowRunner::default()
        });
        let harness = start(Arc::clone(&runner));
        sleep(Duration::from_secs(2)).await;

        harness.events.send(harness.config_path.clone()).expect("send");
        sleep(Duration::from_secs(3)).await;

        assert_eq!(runner.runs.load(Ordering::SeqCst), 2);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn invalid_config_skips_run_until_fixed() {
        let runner = Arc::new(SlowRunner::default());
        let harness = start(Arc::clone(&runner));
        sleep(Duration::from_secs(2)).await;

        fs::write(&harness.config_path, "targets: []\n").expect("break config");
        harness.events.send(harness.config_path.clone()).expect("send");
        sleep(Duration::from_secs(2)).await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1, "broken config never reaches the runner");

        fs::write(&harness.config_path, CONFIG).expect("fix config");
        harness.events.send(harness.config_path.clone()).expect("send");
        sleep(Duration::from_secs(3)).await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 2);
        harness.finish().await;
    }

    #[test]
    fn watch_set_tracks_config_source_and_instructions() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("prompts")).expect("mkdir");
        let config_path = dir.path().join("locsync.yaml");
        fs::write(
            &config_path,
            "instructions: prompts/global.md\nsource:\n  file: en.csv\ntargets:\n  - language: French\n    file: fr.csv\n",
        )
        .expect("write");
        let config = Config::load(&config_path).expect("config");

        let mut watcher = RecordingWatch::default();
        let mut set = WatchSet::default();
        set.update(&mut watcher, &config_path, &config).expect("update");

        assert_eq!(set.len(), 3);
        assert!(set.contains(&dir.path().join("en.csv")));
        assert!(set.contains(&dir.path().join("prompts").join("global.md")));
        assert!(!set.contains(&dir.path().join("fr.csv")));
        assert_eq!(watcher.watched.len(), 2, "project dir and prompts dir");
    }
}
