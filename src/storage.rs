use crate::model::Student;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory for saved roster snapshots.
pub fn snapshots_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .context("could not determine a data directory")?;
    Ok(base.join("roster-cli").join("snapshots"))
}

/// Save a timestamped JSON snapshot to the default location.
pub fn save_snapshot(students: &[Student]) -> Result<PathBuf> {
    save_snapshot_in(&snapshots_dir()?, students)
}

pub fn save_snapshot_in(dir: &Path, students: &[Student]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let stamp = time::OffsetDateTime::now_utc()
        .format(time::macros::format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .unwrap_or_else(|_| "snapshot".into());
    let mut path = dir.join(format!("roster-{stamp}.json"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("roster-{stamp}-{n}.json"));
        n += 1;
    }
    export_json(&path, students)?;
    tracing::info!(path = %path.display(), count = students.len(), "snapshot saved");
    Ok(path)
}

pub fn export_json(path: &Path, students: &[Student]) -> Result<()> {
    let data = serde_json::to_vec_pretty(students).context("serialize roster")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Write a CSV file with a header row and one line per record.
pub fn export_csv(path: &Path, students: &[Student]) -> Result<()> {
    let mut w =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    if students.is_empty() {
        w.write_record(["id", "first_name", "last_name", "email", "ip_address"])?;
    }
    for s in students {
        w.serialize(s).context("write csv row")?;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}
