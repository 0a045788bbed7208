//! Reelbox CLI - render, inspect and resume sandbox programs headlessly.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use reelbox::{
    Confirm, Frame, Sandbox, SandboxConfig, Seed,
    metadata::{self, AlwaysAccept},
    surface::LatestFrame,
};

/// Asks on stderr and reads a y/N answer from stdin.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt);
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let (positional, options) = split_args(&args[2..]);
    match args[1].as_str() {
        "--example" => print_example_config(),
        "render" => render(&positional, &options),
        "inspect" => inspect(&positional),
        "resume" => resume(&positional, &options),
        "verify" => verify(&positional, &options),
        "play" => play(&positional, &options),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [arguments]", program);
    eprintln!();
    eprintln!("Run live-coding sandbox programs without a browser.");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  render <program.rhai> <t> <out.png>  Render the frame at time t and export it");
    eprintln!("  inspect <file.png>                   Print the metadata embedded in an export");
    eprintln!("  resume <in.png> <out.png>            Replay an export to its time and re-export");
    eprintln!("  verify <file.png>                    Replay an export and compare the pixels");
    eprintln!("  play <program.rhai> <seconds>        Play in real time at the configured frame rate");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --seed <seed>      Seed for render/play (default: random)");
    eprintln!("  --config <file>    Sandbox configuration JSON");
    eprintln!("  --out <file.png>   Export the last frame of play");
    eprintln!("  --yes              Accept version prompts without asking (verify)");
    eprintln!();
    eprintln!("Example configuration is generated with --example flag.");
}

/// Options that take no value.
const FLAGS: &[&str] = &["yes"];

/// Options are `--name value` pairs or bare flags; everything else is positional.
fn split_args(args: &[String]) -> (Vec<&str>, Vec<(&str, &str)>) {
    let mut positional = Vec::new();
    let mut options = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.strip_prefix("--") {
            Some(name) if FLAGS.contains(&name) => options.push((name, "")),
            Some(name) => match iter.next() {
                Some(value) => options.push((name, value.as_str())),
                None => fail(format!("Missing value for --{}", name)),
            },
            None => positional.push(arg.as_str()),
        }
    }
    (positional, options)
}

fn option<'a>(options: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
    options.iter().rev().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn positional<'a>(args: &[&'a str], index: usize, name: &str) -> &'a str {
    args.get(index)
        .copied()
        .unwrap_or_else(|| fail(format!("Missing argument <{}>", name)))
}

fn load_config(options: &[(&str, &str)]) -> SandboxConfig {
    let Some(path) = option(options, "config") else {
        return SandboxConfig::default();
    };
    let config_str = fs::read_to_string(path).unwrap_or_else(|e| fail(format!("reading config file: {}", e)));
    serde_json::from_str(&config_str).unwrap_or_else(|e| fail(format!("parsing config: {}", e)))
}

fn read_bytes(path: &str) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| fail(format!("reading {}: {}", path, e)))
}

fn write_bytes(path: &str, bytes: &[u8]) {
    fs::write(path, bytes).unwrap_or_else(|e| fail(format!("writing {}: {}", path, e)));
}

fn scripted(config: SandboxConfig, options: &[(&str, &str)]) -> Sandbox<reelbox::Canvas> {
    let result = match option(options, "seed") {
        Some(seed) => Sandbox::scripted_with_seed(config, Seed::parse_lossy(seed)),
        None => Sandbox::scripted(config),
    };
    result.unwrap_or_else(|e| fail(e))
}

/// Config sized to the frame stored in an export.
fn config_for_export(png: &[u8], options: &[(&str, &str)]) -> (SandboxConfig, Frame) {
    let frame = Frame::from_png(png).unwrap_or_else(|e| fail(e));
    let mut config = load_config(options);
    config.width = frame.width() as usize;
    config.height = frame.height() as usize;
    (config, frame)
}

fn render(args: &[&str], options: &[(&str, &str)]) {
    let program = positional(args, 0, "program");
    let time: f64 = positional(args, 1, "t")
        .parse()
        .unwrap_or_else(|e| fail(format!("invalid time: {}", e)));
    let out = positional(args, 2, "out.png");

    let source = fs::read_to_string(program).unwrap_or_else(|e| fail(format!("reading {}: {}", program, e)));
    let mut sandbox = scripted(load_config(options), options);

    let start = Instant::now();
    sandbox.load(source).unwrap_or_else(|e| fail(e));
    sandbox.seek_to(time).unwrap_or_else(|e| fail(e));
    let png = sandbox.export_png().unwrap_or_else(|e| fail(e));
    write_bytes(out, &png);

    println!("Rendered {} at t={} (seed {})", program, sandbox.time(), sandbox.seed());
    println!(
        "  {} checkpoints, {:.2}s",
        sandbox.engine().checkpoints().len(),
        start.elapsed().as_secs_f32()
    );
    println!("  Wrote {} ({} bytes)", out, png.len());
}

fn inspect(args: &[&str]) {
    let path = positional(args, 0, "file.png");
    let png = read_bytes(path);
    let entries = metadata::text_entries(&png).unwrap_or_else(|e| fail(e));

    println!("{}", path);
    if entries.is_empty() {
        println!("  (no text metadata)");
    }
    for (key, value) in entries {
        if key == metadata::keys::PROGRAM_SOURCE {
            println!("  {}: {} lines", key, value.lines().count());
        } else {
            println!("  {}: {}", key, value);
        }
    }
    if let Ok(found) = metadata::read_entries(&png).map(|e| e.get(metadata::keys::API_VERSION).cloned()) {
        match found.as_deref().map(metadata::check_version) {
            Some(Ok((_, verdict))) => println!("  Compatibility: {:?}", verdict),
            Some(Err(e)) => println!("  Compatibility: {}", e),
            None => {}
        }
    }
}

fn resume(args: &[&str], options: &[(&str, &str)]) {
    let input = positional(args, 0, "in.png");
    let out = positional(args, 1, "out.png");
    let png = read_bytes(input);
    let (config, _) = config_for_export(&png, options);

    let mut sandbox = scripted(config, options);
    let imported = sandbox
        .import_png(&png, &mut StdinConfirm)
        .unwrap_or_else(|e| fail(e));
    sandbox.seek_to(imported.time()).unwrap_or_else(|e| fail(e));
    let exported = sandbox.export_png().unwrap_or_else(|e| fail(e));
    write_bytes(out, &exported);

    println!("Resumed {} at t={} (seed {})", input, sandbox.time(), sandbox.seed());
    if let Some(author) = &imported.author {
        println!("  Author: {}", author);
    }
    println!("  Wrote {} ({} bytes)", out, exported.len());
}

fn verify(args: &[&str], options: &[(&str, &str)]) {
    let path = positional(args, 0, "file.png");
    let png = read_bytes(path);
    let (config, stored) = config_for_export(&png, options);

    let mut sandbox = scripted(config, options);
    let result = if option(options, "yes").is_some() {
        sandbox.import_png(&png, &mut AlwaysAccept)
    } else {
        sandbox.import_png(&png, &mut StdinConfirm)
    };
    let imported = result.unwrap_or_else(|e| fail(e));
    sandbox.seek_to(imported.time()).unwrap_or_else(|e| fail(e));

    let replayed = sandbox.frame();
    let differing = stored
        .pixels()
        .chunks_exact(4)
        .zip(replayed.pixels().chunks_exact(4))
        .filter(|(a, b)| a != b)
        .count();

    if differing == 0 {
        println!("{}: replay matches at t={}", Path::new(path).display(), imported.time());
    } else {
        println!(
            "{}: {} of {} pixels differ at t={}",
            Path::new(path).display(),
            differing,
            stored.width() as usize * stored.height() as usize,
            imported.time()
        );
        std::process::exit(2);
    }
}

fn play(args: &[&str], options: &[(&str, &str)]) {
    let program = positional(args, 0, "program");
    let seconds: f64 = positional(args, 1, "seconds")
        .parse()
        .unwrap_or_else(|e| fail(format!("invalid duration: {}", e)));

    let source = fs::read_to_string(program).unwrap_or_else(|e| fail(format!("reading {}: {}", program, e)));
    let config = load_config(options);
    let interval = config.frame_interval();
    let mut sandbox = scripted(config, options);
    sandbox.load(source).unwrap_or_else(|e| fail(e));

    println!("Playing {} for {}s (seed {})", program, seconds, sandbox.seed());
    let mut display = LatestFrame::new();
    let start = Instant::now();
    let duration = Duration::from_secs_f64(seconds.max(0.0));
    let mut next = start;
    while start.elapsed() < duration {
        sandbox.animation_frame(&mut display).unwrap_or_else(|e| fail(e));
        next += interval;
        if let Some(wait) = next.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }

    let elapsed = start.elapsed().as_secs_f32();
    println!(
        "  Reached t={} in {} frames ({:.1} frames/s)",
        sandbox.time(),
        display.presented(),
        display.presented() as f32 / elapsed
    );
    println!("  {} checkpoints", sandbox.engine().checkpoints().len());

    if let Some(out) = option(options, "out") {
        let png = sandbox.export_png().unwrap_or_else(|e| fail(e));
        write_bytes(out, &png);
        println!("  Wrote {} ({} bytes)", out, png.len());
    }
}

fn print_example_config() {
    let config = SandboxConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}
