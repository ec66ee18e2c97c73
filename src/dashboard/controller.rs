use crate::config::Settings;
use crate::dashboard::window::SnapshotWindow;
use crate::live::LiveSubscription;
use crate::repository::{RepoResult, SnapshotRepository};
use crate::snapshot::LiquiditySnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// What readers see: an immutable copy published after every change.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    /// Oldest first.
    pub window: Vec<LiquiditySnapshot>,
    pub latest: Option<LiquiditySnapshot>,
    pub loading: bool,
    pub last_update: DateTime<Utc>,
}

/// Result of one poll; each half fails independently.
#[derive(Debug)]
pub struct LoadOutcome {
    pub recent: RepoResult<Vec<LiquiditySnapshot>>,
    pub latest: RepoResult<Option<LiquiditySnapshot>>,
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub capacity: usize,
    pub fetch_limit: usize,
    pub refresh_every: Duration,
}

impl DashboardOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            capacity: settings.dashboard.window_capacity,
            fetch_limit: settings.dashboard.fetch_limit,
            refresh_every: settings.refresh_interval(),
        }
    }
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self { capacity: 100, fetch_limit: 100, refresh_every: Duration::from_secs(300) }
    }
}

/// The window/latest pair and the rules for changing it. No I/O.
#[derive(Debug)]
pub struct DashboardModel {
    window: SnapshotWindow,
    latest: Option<LiquiditySnapshot>,
    loads_in_flight: usize,
    last_update: DateTime<Utc>,
}

impl DashboardModel {
    pub fn new(capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            window: SnapshotWindow::new(capacity),
            latest: None,
            loads_in_flight: 0,
            last_update: now,
        }
    }

    pub fn window(&self) -> &SnapshotWindow {
        &self.window
    }

    pub fn latest(&self) -> Option<&LiquiditySnapshot> {
        self.latest.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loads_in_flight > 0
    }

    pub fn begin_load(&mut self) {
        self.loads_in_flight += 1;
    }

    /// Replace window and latest with the polled values. A failed half keeps what was there.
    pub fn apply_load(&mut self, outcome: LoadOutcome, now: DateTime<Utc>) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);

        match outcome.recent {
            Ok(rows) => self.window.replace(rows),
            Err(e) => {
                metrics::counter!("liquidity_monitor_load_failures_total", "query" => "recent").increment(1);
                warn!(error = %e, "Error fetching data; keeping previous window");
            }
        }
        match outcome.latest {
            Ok(latest) => self.latest = latest,
            Err(e) => {
                metrics::counter!("liquidity_monitor_load_failures_total", "query" => "latest").increment(1);
                warn!(error = %e, "Error fetching latest; keeping previous snapshot");
            }
        }
        self.last_update = now;
    }

    /// Append a pushed row and point `latest` at it. A row whose id is already in the
    /// window changes nothing, so a late notification cannot move `latest` backwards.
    pub fn apply_insert(&mut self, snapshot: LiquiditySnapshot, now: DateTime<Utc>) {
        if !self.window.push_live(snapshot.clone()) {
            debug!(id = snapshot.id, "Live row already in window");
            return;
        }
        self.latest = Some(snapshot);
        self.last_update = now;
    }

    pub fn state(&self) -> DashboardState {
        DashboardState {
            window: self.window.to_vec(),
            latest: self.latest.clone(),
            loading: self.is_loading(),
            last_update: self.last_update,
        }
    }
}

enum Command {
    Refresh,
    Loaded(LoadOutcome),
    Shutdown,
}

/// Cheap, cloneable access to a running dashboard.
#[derive(Clone)]
pub struct DashboardHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<Arc<DashboardState>>,
}

impl DashboardHandle {
    pub fn state(&self) -> Arc<DashboardState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardState>> {
        self.state.clone()
    }

    /// Ask for an immediate poll. Returns `false` once the dashboard has stopped.
    pub async fn refresh(&self) -> bool {
        self.commands.send(Command::Refresh).await.is_ok()
    }

    /// Stop the timer and the live channel. Loads already in flight are not cancelled.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

struct Controller {
    repo: Arc<dyn SnapshotRepository>,
    model: DashboardModel,
    options: DashboardOptions,
    commands_tx: mpsc::Sender<Command>,
    commands_rx: mpsc::Receiver<Command>,
    live: Option<LiveSubscription>,
    publish: watch::Sender<Arc<DashboardState>>,
}

/// Start the controller task. The first poll runs immediately.
pub fn spawn(
    repo: Arc<dyn SnapshotRepository>,
    live: Option<LiveSubscription>,
    options: DashboardOptions,
) -> (DashboardHandle, JoinHandle<()>) {
    let model = DashboardModel::new(options.capacity, Utc::now());
    let (publish, state) = watch::channel(Arc::new(model.state()));
    let (commands_tx, commands_rx) = mpsc::channel(64);

    let controller = Controller {
        repo,
        model,
        options,
        commands_tx: commands_tx.clone(),
        commands_rx,
        live,
        publish,
    };
    let task = tokio::spawn(controller.run());
    (DashboardHandle { commands: commands_tx, state }, task)
}

async fn next_live(live: &mut Option<LiveSubscription>) -> Option<LiquiditySnapshot> {
    match live {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

impl Controller {
    #[instrument(name = "dashboard", skip(self), fields(capacity = self.options.capacity))]
    async fn run(mut self) {
        let mut timer = tokio::time::interval(self.options.refresh_every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(refresh_secs = self.options.refresh_every.as_secs(), live = self.live.is_some(), "Dashboard started");

        loop {
            tokio::select! {
                _ = timer.tick() => self.start_load(),
                cmd = self.commands_rx.recv() => match cmd {
                    Some(Command::Refresh) => self.start_load(),
                    Some(Command::Loaded(outcome)) => {
                        self.model.apply_load(outcome, Utc::now());
                        self.publish();
                    }
                    Some(Command::Shutdown) | None => break,
                },
                row = next_live(&mut self.live) => match row {
                    Some(snapshot) => {
                        metrics::counter!("liquidity_monitor_live_inserts_total").increment(1);
                        debug!(id = snapshot.id, timestamp = %snapshot.timestamp, "Live insert");
                        self.model.apply_insert(snapshot, Utc::now());
                        self.publish();
                    }
                    None => {
                        warn!("Live channel stopped delivering");
                        self.live = None;
                    }
                },
            }
        }

        if let Some(live) = self.live.take() {
            live.close().await;
        }
        info!("Dashboard stopped");
    }

    fn start_load(&mut self) {
        metrics::counter!("liquidity_monitor_loads_total").increment(1);
        self.model.begin_load();
        self.publish();

        let repo = Arc::clone(&self.repo);
        let tx = self.commands_tx.clone();
        let limit = self.options.fetch_limit;
        tokio::spawn(async move {
            let (recent, latest) = tokio::join!(repo.query_recent(limit), repo.query_latest());
            // receiver is gone after shutdown; a late result is dropped here
            let _ = tx.send(Command::Loaded(LoadOutcome { recent, latest })).await;
        });
    }

    fn publish(&self) {
        metrics::gauge!("liquidity_monitor_window_len").set(self.model.window().len() as f64);
        self.publish.send_replace(Arc::new(self.model.state()));
    }
}
