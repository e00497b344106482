use std::fs;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::archive;
use crate::engine::models::{ArtifactKind, Manifest, RemoteDescriptor};
use crate::engine::state::AppState;
use crate::networking::NetworkClient;
use crate::storage::StorageManager;
use crate::util::progress_fraction;

/// One artifact that a reconciliation pass must download and extract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub kind: ArtifactKind,
    pub descriptor: RemoteDescriptor,
}

/// The working manifest plus the artifacts whose version changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub manifest: Manifest,
    pub updates: Vec<PlannedUpdate>,
}

/// Whether a freshly fetched token requires an update for a kind whose local
/// token is `recorded`. An absent local token always counts as a change.
pub fn token_changed(recorded: Option<&str>, latest: &str) -> bool {
    recorded != Some(latest)
}

/// Merge freshly fetched descriptors into a working copy of the local
/// manifest. Kinds without a staged descriptor keep their recorded fields.
pub fn build_plan(local: &Manifest, staged: Vec<(ArtifactKind, RemoteDescriptor)>) -> ReconcilePlan {
    let mut manifest = local.clone();
    let mut updates = Vec::new();
    for (kind, descriptor) in staged {
        if !token_changed(local.version_of(kind), &descriptor.version) {
            continue;
        }
        manifest.record(kind, &descriptor);
        updates.push(PlannedUpdate { kind, descriptor });
    }
    ReconcilePlan { manifest, updates }
}

/// Brings local artifacts up to date with the latest remote versions, with
/// minimal re-download. One pass per call; concurrency is handled by the
/// engine's phase machine.
pub struct Reconciler {
    networking: NetworkClient,
    storage: StorageManager,
}

impl Reconciler {
    pub fn new(networking: NetworkClient, storage: StorageManager) -> Self {
        Self {
            networking,
            storage,
        }
    }

    /// Run one end-to-end reconciliation pass. Any failure aborts the pass;
    /// the on-disk manifest is only rewritten after every planned update has
    /// been installed.
    pub async fn run(
        &self,
        updates: &mpsc::UnboundedSender<AppState>,
    ) -> Result<Manifest, String> {
        let local = self.storage.read_manifest().await;
        debug!("reconcile: local state {local:?}");

        let mut staged = Vec::new();
        for kind in ArtifactKind::ALL {
            let latest = self.networking.latest_version(kind).await?;
            if token_changed(local.version_of(kind), &latest) {
                info!(
                    "reconcile: {} changed ({:?} -> {})",
                    kind.key(),
                    local.version_of(kind),
                    latest
                );
                let descriptor = self.networking.fetch_descriptor(kind).await?;
                staged.push((kind, descriptor));
            } else {
                debug!("reconcile: {} up to date at {latest}", kind.key());
            }
        }

        let plan = build_plan(&local, staged);
        let _ = updates.send(AppState::ManifestStaged {
            manifest: plan.manifest.clone(),
        });

        for update in &plan.updates {
            self.install_artifact(update, updates).await?;
        }

        // A recorded version always pairs with a recorded path.
        for kind in ArtifactKind::ALL {
            debug_assert_eq!(
                plan.manifest.version_of(kind).is_some(),
                plan.manifest.path_of(kind).is_some()
            );
        }
        self.storage.write_manifest(&plan.manifest).await?;
        info!(
            "reconcile: pass complete ({} artifact(s) updated)",
            plan.updates.len()
        );
        Ok(plan.manifest)
    }

    /// Download (unless the archive is already present) and extract one
    /// artifact, then delete the archive.
    async fn install_artifact(
        &self,
        update: &PlannedUpdate,
        updates: &mpsc::UnboundedSender<AppState>,
    ) -> Result<(), String> {
        let archive_path = self.storage.archive_path(&update.descriptor.path);

        if archive_path.exists() {
            info!(
                "reconcile: archive {} already present, skipping download",
                archive_path.display()
            );
        } else {
            let url = self.networking.archive_url(&update.descriptor.path);
            let file = update.descriptor.path.clone();
            let tx = updates.clone();
            let _ = tx.send(AppState::Downloading {
                file: file.clone(),
                progress: 0.0,
                speed: "starting".into(),
            });
            self.networking
                .download_to_path(&url, &archive_path, move |downloaded, total, speed| {
                    let _ = tx.send(AppState::Downloading {
                        file: file.clone(),
                        progress: progress_fraction(downloaded, total),
                        speed: speed.to_owned(),
                    });
                })
                .await?;
        }

        let _ = updates.send(AppState::Extracting {
            file: update.descriptor.path.clone(),
        });
        let install_dir = self.storage.install_dir();
        if let Err(err) = archive::extract_zip(&archive_path, &install_dir) {
            // A corrupt archive would be treated as a cache hit on the next
            // pass; discard it so a retry downloads a fresh copy.
            let _ = fs::remove_file(&archive_path);
            return Err(err);
        }
        let _ = fs::remove_file(&archive_path);

        if update.kind == ArtifactKind::Game {
            mark_game_executable(&self.storage)?;
        }
        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
fn mark_game_executable(storage: &StorageManager) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;

    let exe = storage.install_dir().join("quarantine");
    if exe.exists() {
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755))
            .map_err(|e| format!("failed to mark game executable: {e}"))?;
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn mark_game_executable(_storage: &StorageManager) -> Result<(), String> {
    Ok(())
}
