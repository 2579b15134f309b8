//! Check the capture environment.

use pipewrench_common::config::AppConfig;
use pipewrench_platform_x11::{detect_screens, list_windows, DisplaySession};

pub fn run() -> anyhow::Result<()> {
    println!("PipeWrench Environment Check");
    println!("{}", "=".repeat(50));

    let config = AppConfig::load();
    let mut degraded = false;

    // Display connection
    let session = match DisplaySession::open() {
        Ok(session) => {
            println!("[OK] X display reachable");
            session
        }
        Err(e) => {
            println!("[WARN] Cannot open X display: {e}");
            println!();
            println!("Set DISPLAY and make sure an X server is running.");
            return Ok(());
        }
    };

    // Extensions backing the capture techniques
    for (name, used_for) in [
        ("Composite", "composite-redirect capture"),
        ("RANDR", "monitor detection"),
    ] {
        if session.extension_present(name) {
            println!("[OK] {name} extension present");
        } else {
            println!("[WARN] {name} extension missing; {used_for} will fall back");
            degraded = true;
        }
    }

    // Screens
    let screens = detect_screens(&session);
    let outputs = screens.iter().filter(|s| !s.is_aggregate()).count();
    println!("[OK] Screens detected: {outputs}");
    for screen in screens.iter().filter(|s| !s.is_aggregate()) {
        println!(
            "     {} {}x{} at ({}, {})",
            screen.name, screen.width, screen.height, screen.x, screen.y
        );
    }

    // Windows
    let windows = list_windows(&session);
    if windows.is_empty() {
        println!("[WARN] No capturable windows found");
        degraded = true;
    } else {
        println!("[OK] Capturable windows: {}", windows.len());
    }

    // Captures directory
    match std::fs::create_dir_all(&config.captures_dir) {
        Ok(()) => println!(
            "[OK] Captures directory writable: {}",
            config.captures_dir.display()
        ),
        Err(e) => {
            println!(
                "[WARN] Captures directory {}: {e}",
                config.captures_dir.display()
            );
            degraded = true;
        }
    }

    println!();
    if degraded {
        println!("Some capture paths are degraded. See warnings above.");
    } else {
        println!("All capture paths are available. PipeWrench is ready.");
    }

    Ok(())
}
