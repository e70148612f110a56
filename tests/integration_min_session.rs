// Minimal integration test that drives the compiled binary through a PTY.
// This exercises the real event loop and crossterm input handling across
// the main boundaries without relying on internal modules.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_race_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    // Resolve path to compiled binary (debug build during tests)
    let bin = assert_cmd::cargo::cargo_bin("quote-race");
    let cmd = format!("{} --countdown 0 -p hi", bin.display());

    let mut p = spawn(cmd)?;

    // Give the app a moment to initialize the terminal/alternate screen
    std::thread::sleep(Duration::from_millis(200));

    // Enter starts the race; with no countdown the static quote is raced at once
    p.send("\r")?;
    std::thread::sleep(Duration::from_millis(200));
    p.send("hi")?;

    std::thread::sleep(Duration::from_millis(200));

    p.send("\x1b")?; // ESC

    p.expect(Eof)?;
    Ok(())
}
