use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::engine::state::{AppState, UserAction};
use crate::manifest::Reconciler;
use crate::networking::NetworkClient;
use crate::process::ProcessLauncher;
use crate::storage::StorageManager;

pub mod models;
pub mod state;

/// Where the engine is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Reconciling,
    Ready,
}

/// Gates process launch: never before readiness, never twice.
fn can_launch(phase: Phase, launched: bool) -> bool {
    phase == Phase::Ready && !launched
}

pub struct LauncherEngine {
    phase: Phase,
    launched: bool,
    // Shared with the UI so re-entrant update requests can be dropped
    // without taking the engine lock.
    in_flight: Arc<AtomicBool>,
    reconciler: Reconciler,
    process: ProcessLauncher,
}

impl LauncherEngine {
    pub fn new(
        storage: StorageManager,
        networking: NetworkClient,
        process: ProcessLauncher,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            launched: false,
            in_flight: Arc::new(AtomicBool::new(false)),
            reconciler: Reconciler::new(networking, storage),
            process,
        }
    }

    /// Marker that is true for the duration of a reconciliation pass.
    pub fn in_flight_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.in_flight)
    }

    pub async fn handle_action(
        &mut self,
        action: UserAction,
        updates: &mpsc::UnboundedSender<AppState>,
    ) {
        match action {
            UserAction::CheckForUpdates => {
                info!("action: CheckForUpdates");
                self.reconcile(updates).await;
            }
            UserAction::LaunchGame => {
                info!("action: LaunchGame");
                self.launch(updates).await;
            }
        }
    }

    /// Run one reconciliation pass. A call while a pass is in flight is a
    /// no-op.
    pub async fn reconcile(&mut self, updates: &mpsc::UnboundedSender<AppState>) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("reconcile: pass already in flight, ignoring");
            return;
        }
        self.phase = Phase::Reconciling;
        let _ = updates.send(AppState::Reconciling);

        match self.reconciler.run(updates).await {
            Ok(manifest) => {
                self.phase = Phase::Ready;
                info!("reconcile: ready");
                let _ = updates.send(AppState::Ready { manifest });
            }
            Err(err) => {
                self.phase = Phase::Idle;
                error!("reconcile: pass failed: {err}");
                let _ = updates.send(AppState::Error(err));
            }
        }
        self.in_flight.store(false, Ordering::SeqCst);
    }

    /// Spawn the game once artifacts are ready. Calls before readiness, or
    /// after a successful launch, do nothing.
    pub async fn launch(&mut self, updates: &mpsc::UnboundedSender<AppState>) {
        if !can_launch(self.phase, self.launched) {
            debug!("launch: not ready or already launched, ignoring");
            return;
        }
        self.launched = true;

        match self.process.launch() {
            Ok(mut child) => {
                let _ = updates.send(AppState::Playing);
                let tx = updates.clone();
                // Keep the launcher alive until the game exits so a crashing
                // child is observable, then tell the UI to close.
                tokio::task::spawn_blocking(move || {
                    match child.wait() {
                        Ok(status) => info!("game exited with {status}"),
                        Err(err) => warn!("failed to wait for game process: {err}"),
                    }
                    let _ = tx.send(AppState::GameExited);
                });
            }
            Err(err) => {
                self.launched = false;
                error!("launch failed: {err}");
                let _ = updates.send(AppState::Error(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::test_support::{StubServer, http_ok};

    fn engine_with(base_url: &str, storage: StorageManager) -> LauncherEngine {
        LauncherEngine::new(
            storage,
            NetworkClient::with_base_url(base_url),
            ProcessLauncher::new(),
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AppState>) -> Vec<AppState> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn launch_is_refused_before_readiness() {
        assert!(!can_launch(Phase::Idle, false));
        assert!(!can_launch(Phase::Reconciling, false));
    }

    #[test]
    fn launch_is_permitted_exactly_once_after_readiness() {
        assert!(can_launch(Phase::Ready, false));
        assert!(!can_launch(Phase::Ready, true));
    }

    #[tokio::test]
    async fn reconcile_failure_surfaces_error_and_allows_retry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::with_base_dir(dir.path());
        let mut engine = engine_with("http://127.0.0.1:1", storage);

        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.reconcile(&tx).await;
        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(AppState::Reconciling)));
        assert!(matches!(events.last(), Some(AppState::Error(_))));

        // The failed pass must not leave the engine wedged.
        engine.reconcile(&tx).await;
        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(AppState::Reconciling)));
    }

    #[tokio::test]
    async fn reconcile_reaches_ready_when_nothing_changed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::with_base_dir(dir.path());
        let manifest = models::Manifest {
            runtime_version: Some("5".into()),
            game_version: Some("12".into()),
            runtime_path: Some("r5.zip".into()),
            game_path: Some("g12.zip".into()),
        };
        storage.write_manifest(&manifest).await.unwrap();

        let server = StubServer::serve(vec![
            ("/latest/runtime", http_ok(br#"{"version":"5"}"#)),
            ("/latest/game", http_ok(br#"{"version":"12"}"#)),
        ]);
        let mut engine = engine_with(server.base_url(), storage);

        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.reconcile(&tx).await;
        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(AppState::Ready { .. })));
        assert_eq!(engine.phase, Phase::Ready);
        assert!(can_launch(engine.phase, engine.launched));
    }

    #[tokio::test]
    async fn reconcile_is_a_no_op_while_a_pass_is_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::with_base_dir(dir.path());
        let mut engine = engine_with("http://127.0.0.1:1", storage);
        engine.in_flight_flag().store(true, Ordering::SeqCst);

        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.reconcile(&tx).await;
        assert!(drain(&mut rx).is_empty());
    }
}
