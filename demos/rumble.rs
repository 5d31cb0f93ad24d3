//! Rumble every gamepad that can vibrate, then report which face button is held.

use minput::{Context, InputCode, LogLevel, Options};
use std::time::{Duration, Instant};

fn main() {
    let mut options = Options::new();
    options.set_log_level(LogLevel::Debug).set_stderr_log_sink();
    let mut ctx = Context::new(options);

    let pads: Vec<_> = ctx
        .registry()
        .iter()
        .filter(|device| device.can_vibrate())
        .map(|device| device.id())
        .collect();
    if pads.is_empty() {
        println!("no device can vibrate");
        return;
    }

    for &id in &pads {
        match ctx.device_mut(id).and_then(|device| device.vibrate(500, 0.25, 1.0)) {
            Ok(true) => println!("rumbling device {id}"),
            Ok(false) => println!("device {id} refused to rumble"),
            Err(err) => ctx.log_error(&err),
        }
    }

    let face = [InputCode::PadA, InputCode::PadB, InputCode::PadX, InputCode::PadY];
    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(10) {
        if let Err(err) = ctx.drain_events() {
            ctx.log_error(&err);
        }
        let pressed = ctx.find_first(|_, _, current, previous, _| current > 0.5 && previous <= 0.5, Some(&face));
        if let Some((id, code)) = pressed {
            println!("device {id} pressed {code}");
        }
        std::thread::sleep(Duration::from_millis(16));
    }
}
