//! Export command handler.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rankchat_core::config::paths;
use rankchat_core::export::to_printable_html;

use super::latest_answer;

pub fn run(session_id: Option<&str>, out: Option<&Path>, open_after: bool) -> Result<()> {
    let body = latest_answer(session_id)?;
    let html = to_printable_html(&body);

    let path = match out {
        Some(path) => path.to_path_buf(),
        None => {
            let dir = paths::exports_dir();
            fs::create_dir_all(&dir)
                .with_context(|| format!("create {}", dir.display()))?;
            dir.join(default_file_name(chrono::Local::now()))
        }
    };
    fs::write(&path, html).with_context(|| format!("write {}", path.display()))?;
    println!("Exported report to {}", path.display());

    if open_after {
        open::that(&path).with_context(|| format!("open {}", path.display()))?;
    }
    Ok(())
}

fn default_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("seo-report-{}.html", now.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_is_timestamped() {
        let when = chrono::Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(default_file_name(when), "seo-report-20260314-092653.html");
    }
}
