use crate::workflow::Record;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "o1,l1,s1";

/// Render records as CSV: fixed header, one row per record in insertion order,
/// rows joined by `\n` with no trailing newline.
pub fn serialize(records: &[Record]) -> String {
    let mut out = String::from(CSV_HEADER);
    for record in records {
        out.push('\n');
        push_field(&mut out, &record.primary_code);
        out.push(',');
        push_field(&mut out, &record.secondary_code);
        out.push(',');
        out.push_str(&record.sequence.to_string());
    }
    out
}

/// Quote only when the field contains a comma, quote, CR or LF.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// `scan_export_<YYYYMMDD_HHMMSS>.csv` for the given export time
pub fn export_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("scan_export_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// Give up after this many `_N` suffixes for one export name.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Write `csv` to `dir/file_name` and return the final path
///
/// The text goes to a temp file in the same directory first and is moved into
/// place without replacing anything: if `file_name` is taken (two exports in
/// the same second), `_2`, `_3`, ... is appended to the stem.
pub async fn write_export(dir: &Path, file_name: &str, csv: String) -> Result<PathBuf> {
    let dir = dir.to_path_buf();
    let file_name = file_name.to_string();

    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create export directory: {:?}", dir))?;

        let mut temp_file = tempfile::Builder::new()
            .prefix(".pairscan-")
            .suffix(".csv.tmp")
            .tempfile_in(&dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;

        temp_file
            .write_all(csv.as_bytes())
            .context("Failed to write CSV data")?;
        temp_file.flush().context("Failed to flush CSV data")?;

        let mut attempt = 1;
        loop {
            let target = dir.join(numbered_name(&file_name, attempt));
            match temp_file.persist_noclobber(&target) {
                Ok(_) => {
                    tracing::info!("Wrote {} bytes to {:?}", csv.len(), target);
                    return Ok(target);
                }
                Err(e)
                    if e.error.kind() == std::io::ErrorKind::AlreadyExists
                        && attempt < MAX_NAME_ATTEMPTS =>
                {
                    tracing::debug!("{:?} already exists, trying next name", target);
                    temp_file = e.file;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.error).with_context(|| {
                        format!("Failed to move export into place: {:?}", target)
                    });
                }
            }
        }
    })
    .await
    .context("spawn_blocking failed")?
}

/// `name.csv` for the first attempt, `name_<n>.csv` after that
fn numbered_name(file_name: &str, attempt: u32) -> String {
    if attempt <= 1 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}.{}", stem, attempt, ext),
        None => format!("{}_{}", file_name, attempt),
    }
}
