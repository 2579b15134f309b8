//! List stored captures.

use pipewrench_capture_engine::CaptureStore;
use pipewrench_common::config::AppConfig;

pub fn run(limit: usize) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let store = CaptureStore::new(&config.captures_dir);
    let captures = store.list()?;

    if captures.is_empty() {
        println!("No captures in {}", store.dir().display());
        return Ok(());
    }

    println!("Recent captures in {}:", store.dir().display());
    for capture in captures.iter().take(limit) {
        let kind = capture.kind.map(|k| k.as_str()).unwrap_or("other");
        let stamp = capture
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {kind:<6}  {stamp:<19}  {}", capture.display_name());
    }
    if captures.len() > limit {
        println!("  ... and {} more", captures.len() - limit);
    }

    Ok(())
}
