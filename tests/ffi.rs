use minput::backends::virtual_input::{VirtualController, VirtualDeviceSpec};
use minput::ffi::*;
use minput::{Context, DeviceId, InputCode, Options};
use std::ffi::{c_char, c_void, CStr};
use std::ptr;

fn handle_with(specs: Vec<VirtualDeviceSpec>) -> (*mut ApiContext, VirtualController, Vec<DeviceId>) {
    let script = VirtualController::new();
    let slots: Vec<_> = specs.into_iter().map(|spec| script.plug(spec)).collect();
    let mut ctx = Context::empty(Options::new());
    ctx.add_source(script.source());
    let ids = slots.iter().map(|&slot| script.device_id(slot).unwrap()).collect();
    (into_handle(ctx), script, ids)
}

#[test]
fn null_handles_are_rejected() {
    unsafe {
        assert_eq!(rb_minput_drain_events(ptr::null_mut()), 0);
        assert_eq!(rb_minput_reset(ptr::null_mut()), 0);
        assert_eq!(rb_minput_destroy(ptr::null_mut()), 0);
        assert!(rb_minput_get_devices(ptr::null_mut()).is_null());
        assert_eq!(rb_minput_get_value(ptr::null_mut(), 1, InputCode::KeyA.raw()), 0.0);
        assert_eq!(rb_minput_get_axis_count(ptr::null_mut(), 1), 0);
        assert_eq!(rb_minput_set_log_level(ptr::null_mut(), 2), 0);
        assert_eq!(rb_minput_destroy_options(ptr::null_mut()), 0);
    }
}

#[test]
fn device_info_is_filled() {
    let (ctx, _script, ids) = handle_with(vec![VirtualDeviceSpec::gamepad("Pad One")]);
    unsafe {
        let mut info = ApiDevice::default();
        assert_eq!(rb_minput_get_device(ctx, ids[0], &mut info), 1);
        assert_eq!(info.id, ids[0]);
        assert_eq!(CStr::from_ptr(info.name).to_str().unwrap(), "Pad One");
        assert_eq!(CStr::from_ptr(info.location_id).to_str().unwrap(), "virtual");
        assert_eq!(info.is_usable, 1);
        assert_eq!(info.can_vibrate, 1);
        assert_eq!(info.axis_count, rb_minput_get_axis_count(ctx, ids[0]));

        assert_eq!(rb_minput_get_device(ctx, 999, &mut info), 0);
        assert_eq!(rb_minput_get_device(ctx, ids[0], ptr::null_mut()), 0);
        rb_minput_destroy(ctx);
    }
}

#[test]
fn enumeration_walks_every_device() {
    let (ctx, _script, ids) = handle_with(vec![VirtualDeviceSpec::keyboard("a"), VirtualDeviceSpec::mouse("b")]);
    unsafe {
        let devices = rb_minput_get_devices(ctx);
        assert!(!devices.is_null());
        let mut seen = Vec::new();
        let mut info = ApiDevice::default();
        while rb_minput_next_device(ctx, devices, &mut info) != 0 {
            seen.push(info.id);
        }
        seen.sort_unstable();
        assert_eq!(seen, ids);
        assert_eq!(rb_minput_destroy_enumeration(ctx, devices), 1);
        assert_eq!(rb_minput_destroy_enumeration(ctx, ptr::null_mut()), 0);
        rb_minput_destroy(ctx);
    }
}

#[test]
fn vibrate_validates_its_arguments() {
    let (ctx, _script, ids) = handle_with(vec![VirtualDeviceSpec::gamepad("pad"), VirtualDeviceSpec::keyboard("kbd")]);
    let (pad, kbd) = (ids[0], ids[1]);
    unsafe {
        assert_eq!(rb_minput_can_vibrate(ctx, pad), 1);
        assert_eq!(rb_minput_can_vibrate(ctx, kbd), 0);

        assert_eq!(rb_minput_vibrate(ctx, pad, 100, 0.5, 0.5), 1);
        assert_eq!(rb_minput_vibrate(ctx, pad, 32767, 1.0, 0.0), 1);
        assert_eq!(rb_minput_vibrate(ctx, pad, -1, 0.5, 0.5), 0);
        assert_eq!(rb_minput_vibrate(ctx, pad, 32768, 0.5, 0.5), 0);
        assert_eq!(rb_minput_vibrate(ctx, pad, 100, 1.5, 0.5), 0);
        assert_eq!(rb_minput_vibrate(ctx, pad, 100, 0.5, -0.1), 0);
        assert_eq!(rb_minput_vibrate(ctx, pad, 100, f32::NAN, 0.5), 0);
        assert_eq!(rb_minput_vibrate(ctx, kbd, 100, 0.5, 0.5), 0);
        assert_eq!(rb_minput_vibrate(ctx, 999, 100, 0.5, 0.5), 0);
        rb_minput_destroy(ctx);
    }
}

#[test]
fn axis_values_round_trip_through_a_tick() {
    let (ctx, _script, ids) = handle_with(vec![VirtualDeviceSpec::keyboard("kbd")]);
    let id = ids[0];
    let code = InputCode::KeyEnter.raw();
    unsafe {
        assert_eq!(rb_minput_has_axis(ctx, id, code), 1);
        assert_eq!(rb_minput_has_axis(ctx, id, InputCode::PadA.raw()), 0);
        assert_eq!(rb_minput_has_axis(ctx, id, 12345), 0);

        assert_eq!(rb_minput_set_value(ctx, id, code, 1.0), 1);
        assert_eq!(rb_minput_get_next(ctx, id, code), 1.0);
        assert_eq!(rb_minput_get_value(ctx, id, code), 0.0);

        assert_eq!(rb_minput_drain_events(ctx), 1);
        let (mut current, mut previous, mut next) = (-1.0, -1.0, -1.0);
        assert_eq!(rb_minput_get_values(ctx, id, code, &mut current, &mut previous, &mut next), 1);
        assert_eq!((current, previous, next), (1.0, 0.0, 1.0));
        assert_eq!(rb_minput_get_values(ctx, id, code, ptr::null_mut(), ptr::null_mut(), ptr::null_mut()), 1);

        assert_eq!(rb_minput_add_value(ctx, id, code, 0.5), 1);
        assert_eq!(rb_minput_commit_value(ctx, id, code), 1);
        assert_eq!(rb_minput_get_value(ctx, id, code), 1.5);
        assert_eq!(rb_minput_get_previous(ctx, id, code), 1.0);

        assert_eq!(rb_minput_set_value(ctx, id, InputCode::PadA.raw(), 1.0), 0);
        assert_eq!(rb_minput_reset_device(ctx, id), 1);
        assert_eq!(rb_minput_get_value(ctx, id, code), 0.0);

        rb_minput_destroy(ctx);
    }
}

#[test]
fn get_axes_truncates_to_the_buffer() {
    let (ctx, _script, ids) = handle_with(vec![VirtualDeviceSpec::new(
        "two",
        &[InputCode::KeyA, InputCode::KeyB],
    )]);
    unsafe {
        let mut all = [0i32; 4];
        assert_eq!(rb_minput_get_axes(ctx, ids[0], all.as_mut_ptr(), all.len()), 1);
        let mut got = all[..2].to_vec();
        got.sort_unstable();
        assert_eq!(got, vec![InputCode::KeyA.raw(), InputCode::KeyB.raw()]);
        assert_eq!(&all[2..], &[0, 0]);

        let mut one = [0i32; 1];
        assert_eq!(rb_minput_get_axes(ctx, ids[0], one.as_mut_ptr(), 1), 1);
        assert!(one[0] == InputCode::KeyA.raw() || one[0] == InputCode::KeyB.raw());

        assert_eq!(rb_minput_get_axes(ctx, ids[0], ptr::null_mut(), 4), 0);
        assert_eq!(rb_minput_get_axes(ctx, ids[0], all.as_mut_ptr(), 0), 0);
        rb_minput_destroy(ctx);
    }
}

unsafe extern "C" fn pressed(_: *mut c_void, _: DeviceId, _: i32, current: f32, _: f32, _: f32) -> i32 {
    (current > 0.5).into()
}

#[test]
fn find_first_reports_through_out_params() {
    let (ctx, script, ids) = handle_with(vec![VirtualDeviceSpec::gamepad("pad")]);
    unsafe {
        let slot = script.plug(VirtualDeviceSpec::keyboard("late"));
        script.press(slot, InputCode::KeyEscape);
        assert_eq!(rb_minput_drain_events(ctx), 1);
        let late = script.device_id(slot).unwrap();
        assert!(late > ids[0]);

        let (mut id, mut code) = (0, 0);
        assert_eq!(rb_minput_find_first(ctx, Some(pressed), ptr::null_mut(), ptr::null(), 0, &mut id, &mut code), 1);
        assert_eq!((id, code), (late, InputCode::KeyEscape.raw()));

        let only_pad = [InputCode::PadA.raw()];
        assert_eq!(
            rb_minput_find_first(ctx, Some(pressed), ptr::null_mut(), only_pad.as_ptr(), 1, &mut id, &mut code),
            0
        );
        let unknown = [7];
        assert_eq!(
            rb_minput_find_first(ctx, Some(pressed), ptr::null_mut(), unknown.as_ptr(), 1, &mut id, &mut code),
            0
        );
        assert_eq!(rb_minput_find_first(ctx, None, ptr::null_mut(), ptr::null(), 0, &mut id, &mut code), 0);
        rb_minput_destroy(ctx);
    }
}

unsafe extern "C" fn collect_log(data: *mut c_void, level: i32, message: *const c_char) {
    let lines = &mut *(data as *mut Vec<(i32, String)>);
    lines.push((level, CStr::from_ptr(message).to_string_lossy().into_owned()));
}

#[test]
fn errors_reach_the_custom_log_sink() {
    let mut lines: Vec<(i32, String)> = Vec::new();
    let (ctx, _script, ids) = handle_with(vec![VirtualDeviceSpec::gamepad("pad")]);
    unsafe {
        let opts = rb_minput_create_options();
        assert_eq!(rb_minput_set_custom_log_sink(opts, Some(collect_log), &mut lines as *mut _ as *mut c_void), 1);
        assert_eq!(rb_minput_set_options(ctx, opts), 1);
        assert_eq!(rb_minput_destroy_options(opts), 1);

        assert_eq!(rb_minput_vibrate(ctx, ids[0], 100, 2.0, 0.0), 0);
        rb_minput_destroy(ctx);
    }
    assert!(lines.iter().any(|(_, line)| line.contains("left motor strength")));
}

#[test]
fn rejected_vibration_names_the_offending_value() {
    let mut lines: Vec<(i32, String)> = Vec::new();
    let (ctx, _script, ids) = handle_with(vec![VirtualDeviceSpec::gamepad("pad")]);
    unsafe {
        let opts = rb_minput_create_options();
        assert_eq!(rb_minput_set_custom_log_sink(opts, Some(collect_log), &mut lines as *mut _ as *mut c_void), 1);
        assert_eq!(rb_minput_set_options(ctx, opts), 1);
        assert_eq!(rb_minput_destroy_options(opts), 1);

        assert_eq!(rb_minput_vibrate(ctx, ids[0], 40000, 0.5, 0.5), 0);
        assert_eq!(rb_minput_vibrate(ctx, ids[0], 100, 1.5, 0.0), 0);
        rb_minput_destroy(ctx);
    }
    let messages: Vec<&str> = lines
        .iter()
        .filter(|&&(level, _)| level == 4)
        .map(|(_, line)| line.as_str())
        .collect();
    assert_eq!(
        messages,
        [
            "vibrate: duration must be an integer value between 0 and 32767 (got 40000)",
            "vibrate: left motor strength must be a float value between 0 and 1 (got 1.5)",
        ]
    );
}
