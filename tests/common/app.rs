use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast;

use drowsiness_backend::config::Config;
use drowsiness_backend::detector::{DisabledDetector, LandmarkDetector};
use drowsiness_backend::routes::build_router;
use drowsiness_backend::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
}

/// Built from defaults instead of `Config::from_env` so parallel tests do
/// not race on environment variables.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.rate_limit.max_requests = 1000;
    config.detection.tracker.consec_frames = 3;
    config.detector.timeout_secs = 2;
    config
}

pub fn spawn_with(config: Config, detector: Arc<dyn LandmarkDetector>) -> TestApp {
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::with_detector(&config, detector, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
    }
}

pub fn spawn_with_detector(detector: Arc<dyn LandmarkDetector>) -> TestApp {
    spawn_with(test_config(), detector)
}

pub fn spawn_test_app() -> TestApp {
    spawn_with_detector(Arc::new(DisabledDetector))
}

pub fn spawn_test_app_with_rate_limit(max_requests: u64) -> TestApp {
    let mut config = test_config();
    config.rate_limit.max_requests = max_requests;
    spawn_with(config, Arc::new(DisabledDetector))
}
