use std::cmp::Ordering;

use serde::Deserialize;

const RELEASES_API_URL: &str =
    "https://api.github.com/repos/jefvel/karanten-launcher/releases/latest";

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    UpdateAvailable { latest_version: String, url: String },
    CheckFailed(String),
}

/// Check whether a newer launcher build is published on GitHub releases.
///
/// # Errors
/// Returns an error string if the GitHub API request fails or the response is
/// invalid.
pub async fn check_for_updates(current_version: &str) -> Result<UpdateStatus, String> {
    let client = reqwest::Client::new();

    let response = client
        .get(RELEASES_API_URL)
        .header("User-Agent", "karanten-launcher")
        .send()
        .await
        .map_err(|err| format!("Failed to check for updates: {err}"))?;

    if !response.status().is_success() {
        return Err(format!("GitHub API returned status: {}", response.status()));
    }

    let release: ReleaseInfo = response
        .json()
        .await
        .map_err(|err| format!("Failed to parse release info: {err}"))?;

    if version_cmp(&release.tag_name, current_version) == Ordering::Greater {
        Ok(UpdateStatus::UpdateAvailable {
            latest_version: release.tag_name,
            url: release.html_url,
        })
    } else {
        Ok(UpdateStatus::UpToDate)
    }
}

/// Compare two dotted version strings numerically, ignoring a leading `v`.
/// Missing components count as zero, so "0.3" equals "0.3.0".
fn version_cmp(a: &str, b: &str) -> Ordering {
    let a = components(a);
    let b = components(b);
    for i in 0..a.len().max(b.len()) {
        let lhs = a.get(i).copied().unwrap_or(0);
        let rhs = b.get(i).copied().unwrap_or(0);
        match lhs.cmp(&rhs) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn components(version: &str) -> Vec<u32> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .filter_map(|part| part.parse::<u32>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_versions_into_numeric_components() {
        assert_eq!(components("v0.3.1"), vec![0, 3, 1]);
        assert_eq!(components("  0.3  "), vec![0, 3]);
        assert_eq!(components("latest"), Vec::<u32>::new());
    }

    #[test]
    fn orders_versions_numerically() {
        assert_eq!(version_cmp("0.3.1", "0.3.0"), Ordering::Greater);
        assert_eq!(version_cmp("v1.0.0", "0.9.9"), Ordering::Greater);
        assert_eq!(version_cmp("0.3", "0.3.0"), Ordering::Equal);
        assert_eq!(version_cmp("0.2.9", "0.3.0"), Ordering::Less);
        assert_eq!(version_cmp("v0.3.0", "0.3.0"), Ordering::Equal);
        assert_eq!(version_cmp("0.10.0", "0.9.0"), Ordering::Greater);
    }
}
