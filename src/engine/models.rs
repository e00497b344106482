use serde::{Deserialize, Serialize};

/// The two downloadable units tracked by the launcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Runtime,
    Game,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Runtime, ArtifactKind::Game];

    /// Key used by the remote descriptor service.
    pub fn key(self) -> &'static str {
        match self {
            ArtifactKind::Runtime => "runtime",
            ArtifactKind::Game => "game",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Runtime => "Runtime",
            ArtifactKind::Game => "Game data",
        }
    }
}

/// Last-known-good artifact versions and archive paths, persisted as
/// `manifest.json` in the app directory. Field names stay camelCase for
/// compatibility with manifests written by earlier launcher versions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    pub runtime_version: Option<String>,
    pub game_version: Option<String>,
    pub runtime_path: Option<String>,
    pub game_path: Option<String>,
}

impl Manifest {
    pub fn version_of(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Runtime => self.runtime_version.as_deref(),
            ArtifactKind::Game => self.game_version.as_deref(),
        }
    }

    pub fn path_of(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Runtime => self.runtime_path.as_deref(),
            ArtifactKind::Game => self.game_path.as_deref(),
        }
    }

    pub fn record(&mut self, kind: ArtifactKind, descriptor: &RemoteDescriptor) {
        match kind {
            ArtifactKind::Runtime => {
                self.runtime_version = Some(descriptor.version.clone());
                self.runtime_path = Some(descriptor.path.clone());
            }
            ArtifactKind::Game => {
                self.game_version = Some(descriptor.version.clone());
                self.game_path = Some(descriptor.path.clone());
            }
        }
    }
}

/// Latest version token plus archive path for one artifact kind, as served
/// by the manifest endpoint. Tokens are opaque and compared for equality only.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RemoteDescriptor {
    pub version: String,
    pub path: String,
}

/// Response of the lightweight latest-version query.
#[derive(Clone, Debug, Deserialize)]
pub struct LatestVersion {
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_serializes_with_camel_case_fields() {
        let manifest = Manifest {
            runtime_version: Some("5".into()),
            game_version: None,
            runtime_path: Some("r5.zip".into()),
            game_path: None,
        };
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"runtimeVersion\":\"5\""));
        assert!(json.contains("\"gamePath\":null"));
    }

    #[test]
    fn manifest_defaults_missing_fields_to_null() {
        let manifest: Manifest = serde_json::from_str("{\"gameVersion\":\"12\"}").unwrap();
        assert_eq!(manifest.game_version.as_deref(), Some("12"));
        assert!(manifest.runtime_version.is_none());
        assert!(manifest.runtime_path.is_none());
    }

    #[test]
    fn record_updates_the_matching_kind_only() {
        let mut manifest = Manifest::default();
        manifest.record(
            ArtifactKind::Game,
            &RemoteDescriptor {
                version: "12".into(),
                path: "g12.zip".into(),
            },
        );
        assert_eq!(manifest.version_of(ArtifactKind::Game), Some("12"));
        assert_eq!(manifest.path_of(ArtifactKind::Game), Some("g12.zip"));
        assert!(manifest.version_of(ArtifactKind::Runtime).is_none());
    }
}
