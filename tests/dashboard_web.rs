use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use liquidity_monitor::config::Settings;
use liquidity_monitor::dashboard::{self, DashboardHandle, DashboardOptions, DashboardState};
use liquidity_monitor::repository::memory::MemorySnapshotRepository;
use liquidity_monitor::snapshot::LiquiditySnapshot;
use liquidity_monitor::web::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

fn row(id: i64, total_50bps: f64) -> LiquiditySnapshot {
    LiquiditySnapshot {
        id,
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + ChronoDuration::minutes(id),
        exchange: "binance".into(),
        pair: "NEAR/USDT".into(),
        mid_price: 5.1234,
        spread_bps: 4.567,
        bid_10bps: 1000.0,
        ask_10bps: 1000.0,
        total_10bps: 2000.0,
        bid_25bps: 2000.0,
        ask_25bps: 2000.0,
        total_25bps: 4000.0,
        bid_50bps: total_50bps / 2.0,
        ask_50bps: total_50bps / 2.0,
        total_50bps,
        bid_1pct: 7500.0,
        ask_1pct: 7500.0,
        total_1pct: 15000.0,
        bid_2pct: 4500.0,
        ask_2pct: 4500.0,
        total_2pct: 9000.0,
    }
}

struct Harness {
    addr: SocketAddr,
    dashboard: DashboardHandle,
    stop: Option<oneshot::Sender<()>>,
}

impl Harness {
    async fn start(repo: Arc<MemorySnapshotRepository>) -> Self {
        let (dashboard, _task) = dashboard::spawn(repo.clone(), None, DashboardOptions::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let state = AppState::new(dashboard.clone(), repo, Settings::default());
        tokio::spawn(web::serve(listener, state, async {
            let _ = stopped.await;
        }));
        Self { addr, dashboard, stop: Some(stop) }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn wait_for(&self, f: impl FnMut(&Arc<DashboardState>) -> bool) {
        let mut rx = self.dashboard.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
            .await
            .expect("state did not converge")
            .expect("dashboard stopped");
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

#[tokio::test]
async fn dashboard_page_renders_loaded_snapshots() {
    let repo = Arc::new(MemorySnapshotRepository::with_rows(vec![row(1, 12000.0), row(2, 15000.0), row(3, 9000.0)]));
    let h = Harness::start(repo).await;
    h.wait_for(|s| s.window.len() == 3 && !s.loading).await;

    let html = reqwest::get(h.url("/")).await.unwrap().text().await.unwrap();
    assert!(html.contains("NEAR Liquidity Monitor"));
    assert!(html.contains("$12k"));
    assert!(html.contains("$15k"));
    assert!(html.contains("$9k"));
    assert!(html.contains("4.57 bps"));
    assert!(html.contains("Recent Snapshots"));
    assert!(!html.contains("card skeleton"));
}

#[tokio::test]
async fn failed_latest_query_leaves_stats_skeleton() {
    let repo = Arc::new(MemorySnapshotRepository::with_rows(vec![row(1, 12000.0)]));
    repo.fail_latest(Some("simulated outage"));
    let h = Harness::start(repo).await;
    h.wait_for(|s| s.window.len() == 1 && !s.loading).await;

    let html = reqwest::get(h.url("/")).await.unwrap().text().await.unwrap();
    assert!(html.contains("card skeleton"));
    assert!(html.contains("Binance Liquidity Depth Over Time"));

    let state: serde_json::Value = reqwest::get(h.url("/api/state")).await.unwrap().json().await.unwrap();
    assert!(state["latest"].is_null());
    assert_eq!(state["window"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn post_refresh_reloads_and_redirects() {
    let repo = Arc::new(MemorySnapshotRepository::with_rows(vec![row(1, 12000.0)]));
    let h = Harness::start(repo.clone()).await;
    h.wait_for(|s| s.window.len() == 1 && !s.loading).await;

    repo.insert(row(2, 12000.0));
    let client = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build().unwrap();
    let resp = client.post(h.url("/refresh")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/");

    h.wait_for(|s| s.window.len() == 2 && !s.loading).await;
    let view: serde_json::Value = reqwest::get(h.url("/api/view")).await.unwrap().json().await.unwrap();
    assert_eq!(view["table"][0]["id"], 2);
    assert_eq!(view["stats"]["kind"], "cards");
}

#[tokio::test]
async fn diagnostics_and_health() {
    let repo = Arc::new(MemorySnapshotRepository::with_rows((1..=7).map(|i| row(i, 1000.0)).collect()));
    let h = Harness::start(repo).await;

    let report: serde_json::Value = reqwest::get(h.url("/api/diagnostics")).await.unwrap().json().await.unwrap();
    assert_eq!(report["query"]["success"], true);
    assert_eq!(report["query"]["dataCount"], 5);
    assert_eq!(report["query"]["totalCount"], 7);
    assert_eq!(report["envVars"]["url"], "❌ Missing");

    let page = reqwest::get(h.url("/test")).await.unwrap().text().await.unwrap();
    assert!(page.contains("Connection Successful!"));
    assert!(page.contains("Run Test Again"));

    let health = reqwest::get(h.url("/health")).await.unwrap();
    assert!(health.status().is_success());
}
