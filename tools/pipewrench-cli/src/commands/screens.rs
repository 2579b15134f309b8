//! List detected screens.

use pipewrench_platform_x11::{detect_screens, DisplaySession};

pub fn run() -> anyhow::Result<()> {
    let session =
        DisplaySession::open().map_err(|e| anyhow::anyhow!("Cannot open display: {e}"))?;
    let screens = detect_screens(&session);

    println!("Detected screens ({}):", screens.len());
    for screen in &screens {
        println!(
            "  {:>3}  {:<14} {}x{} at ({}, {})",
            screen.index, screen.name, screen.width, screen.height, screen.x, screen.y
        );
    }

    Ok(())
}
