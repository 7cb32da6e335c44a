//! Command-line front end for command logs.
//!
//! `gsp lint <log.json>` checks a log without executing it,
//! `gsp replay <log.json>` rebuilds the object graph and prints it,
//! `gsp demo` records a small client scene and writes its log to
//! stdout.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use gsp_core::{Replayer, Session, lint, object};
use gsp_protocol::{CommandLog, wire};
use gsp_scene::{Buffer, Canvas, Transform, Viewport};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        usage();
        std::process::exit(1);
    };

    match command.as_str() {
        "lint" => lint_command(&args[2..]),
        "replay" => replay_command(&args[2..]),
        "demo" => demo_command(),
        "--help" | "-h" | "help" => {
            usage();
            Ok(())
        }
        other => {
            eprintln!("unknown command: {other}");
            usage();
            std::process::exit(1);
        }
    }
}

fn usage() {
    eprintln!("Usage: gsp <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  lint <log.json>              check a command log without executing it");
    eprintln!("  replay [--lenient] <log.json>");
    eprintln!("                               rebuild the object graph and print it");
    eprintln!("  demo                         record a sample scene and print its log");
}

fn read_log(path: &PathBuf) -> Result<CommandLog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let log = wire::from_json(&text).with_context(|| format!("parsing {}", path.display()))?;
    log::debug!("read {} commands from {}", log.len(), path.display());
    Ok(log)
}

fn lint_command(args: &[String]) -> Result<()> {
    let Some(path) = args.first() else {
        bail!("lint: missing log file");
    };
    let log = read_log(&PathBuf::from(path))?;
    let schemas = gsp_scene::schema_registry();

    let issues = lint::lint_log(&schemas, &log);
    let mut out = std::io::stdout().lock();
    for issue in &issues {
        writeln!(out, "{issue}")?;
    }
    if issues.is_empty() {
        writeln!(out, "{} commands, no issues", log.len())?;
        Ok(())
    } else {
        bail!("{} issue(s) in {} commands", issues.len(), log.len());
    }
}

fn replay_command(args: &[String]) -> Result<()> {
    let mut lenient = false;
    let mut path = None;
    for arg in args {
        match arg.as_str() {
            "--lenient" => lenient = true,
            other if path.is_none() => path = Some(PathBuf::from(other)),
            other => bail!("replay: unexpected argument {other}"),
        }
    }
    let Some(path) = path else {
        bail!("replay: missing log file");
    };

    let log = read_log(&path)?;
    let schemas = gsp_scene::schema_registry();
    let mut session = Session::server();
    let applied = Replayer::new(&schemas)
        .halt_on_error(!lenient)
        .replay(&mut session, &log)?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "applied {applied} of {} commands", log.len())?;
    for (oid, handle) in session.registry().iter() {
        let guard = object::lock(handle);
        writeln!(out, "{oid} {guard:?}")?;
    }
    Ok(())
}

/// Record the scene from the protocol documentation: a canvas with a
/// viewport, a pixel buffer, and a transform, then a resize pass.
fn demo_command() -> Result<()> {
    let schemas = gsp_scene::schema_registry();
    let mut session = Session::client();

    let canvas = Canvas::create(&mut session, &schemas, 800.0, 600.0, 96.0, 1.0)?;
    let viewport = Viewport::create(&mut session, &schemas, &canvas, 0.0, 0.0, 800.0, 600.0)?;
    let buffer = Buffer::create(&mut session, &schemas, &[600, 800, 4], "u8")?;
    let transform = Transform::create(&mut session, &schemas, &[0u8; 64])?;

    Canvas::set_size(&mut session, &schemas, &canvas, 1024.0, 768.0)?;
    Viewport::set_size(&mut session, &schemas, &viewport, 1024.0, 768.0)?;
    Buffer::set_data(&mut session, &schemas, &buffer, 0, &[255, 0, 0, 255])?;
    Transform::set_data(&mut session, &schemas, &transform, &[1u8; 64])?;

    let text = wire::to_json(session.log())?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}")?;
    Ok(())
}
