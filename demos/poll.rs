//! Print device lifecycle events as JSON and every axis change as it happens.
//!
//! `cargo run --example poll -- [options.toml]`

use minput::{Context, LogLevel, Options};
use std::time::Duration;

fn main() {
    let mut options = match std::env::args().nth(1) {
        Some(path) => Options::from_toml_file(&path).expect("read options"),
        None => {
            let mut options = Options::new();
            options.set_log_level(LogLevel::Info).set_stderr_log_sink();
            options
        }
    };
    options.set_device_callback(|event, id, info| {
        let json = serde_json::json!({ "event": event, "id": id, "device": info });
        println!("{json}");
    });

    let mut ctx = Context::new(options);
    println!("sources: {:?}", ctx.source_names());

    let mut devices = ctx.devices();
    while let Some(device) = devices.next(&ctx) {
        println!("- {} #{} ({} axes)", device.name(), device.id(), device.axis_count());
    }

    loop {
        if let Err(err) = ctx.drain_events() {
            ctx.log_error(&err);
        }
        for device in ctx.registry().iter() {
            for code in device.axis_codes() {
                let Some(axis) = device.axis(code) else {
                    continue;
                };
                if axis.get() != axis.get_previous() {
                    println!("{} #{}: {} = {:.3}", device.name(), device.id(), code, axis.get());
                }
            }
        }
        // ~60 ticks per second
        std::thread::sleep(Duration::from_millis(16));
    }
}
