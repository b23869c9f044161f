use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tracking::regime::Regime;

/// One JSON file per session under `data/sessions/`, at most the 100
/// most recent retained by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub object_name: String,
    pub is_planet: bool,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    pub duration_secs: f64,
    pub total_corrections: u32,
    pub total_movement_deg: f64,
    pub mode_distribution_secs: std::collections::HashMap<Regime, f64>,
    pub final_regime: Regime,
    pub encoder_was_available: bool,
    pub corrections: Vec<CorrectionLogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionLogEntry {
    pub time: chrono::DateTime<chrono::Utc>,
    pub delta_deg: f64,
    pub logical_position_deg: f64,
    pub regime: Regime,
}

/// Keeps at most `limit` most-recent session record files in `dir`,
/// deleting the rest.
pub async fn prune_old_sessions(dir: &std::path::Path, limit: usize) -> std::io::Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
            let modified = entry.metadata().await?.modified()?;
            files.push((modified, entry.path()));
        }
    }
    files.sort_by_key(|(modified, _)| *modified);
    if files.len() > limit {
        for (_, path) in &files[..files.len() - limit] {
            tokio::fs::remove_file(path).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prune_keeps_only_the_newest_n() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            tokio::fs::write(dir.path().join(format!("s{i}.json")), b"{}")
                .await
                .unwrap();
        }
        prune_old_sessions(dir.path(), 3).await.unwrap();
        let mut remaining = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut count = 0;
        while remaining.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}
