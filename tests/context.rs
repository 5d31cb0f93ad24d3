use minput::backends::virtual_input::{VirtualController, VirtualDeviceSpec};
use minput::{Context, DeviceEvent, DeviceId, DeviceRegistry, Error, InputCode, Options, Result, Source};
use std::cell::RefCell;
use std::rc::Rc;

type Seen = Rc<RefCell<Vec<(DeviceEvent, DeviceId, Option<String>)>>>;

fn recording_context() -> (Context, Seen) {
    let seen: Seen = Rc::default();
    let sink = seen.clone();
    let mut options = Options::new();
    options.set_device_callback(move |event, id, info| {
        sink.borrow_mut().push((event, id, info.map(|info| info.meta.name.clone())));
    });
    (Context::empty(options), seen)
}

#[test]
fn hotplug_is_reported_in_order() {
    let (mut ctx, seen) = recording_context();
    let script = VirtualController::new();
    ctx.add_source(script.source());

    let pad = script.plug(VirtualDeviceSpec::gamepad("pad"));
    ctx.drain_events().unwrap();
    let id = script.device_id(pad).unwrap();

    script.set_usable(pad, false);
    script.set_usable(pad, false);
    script.set_usable(pad, true);
    script.unplug(pad);
    ctx.drain_events().unwrap();

    let pad_name = Some("pad".to_string());
    assert_eq!(
        *seen.borrow(),
        vec![
            (DeviceEvent::Created, id, pad_name.clone()),
            (DeviceEvent::Unusable, id, pad_name.clone()),
            (DeviceEvent::Usable, id, pad_name),
            (DeviceEvent::Removed, id, None),
        ]
    );
    assert!(ctx.get_device(id).is_none());
}

#[test]
fn ids_are_never_reused() {
    let (mut ctx, _) = recording_context();
    let script = VirtualController::new();
    ctx.add_source(script.source());

    let first = script.plug(VirtualDeviceSpec::keyboard("kbd"));
    ctx.drain_events().unwrap();
    let first_id = script.device_id(first).unwrap();
    script.unplug(first);
    ctx.drain_events().unwrap();

    let second = script.plug(VirtualDeviceSpec::keyboard("kbd"));
    ctx.drain_events().unwrap();
    let second_id = script.device_id(second).unwrap();

    assert!(first_id >= 1);
    assert!(second_id > first_id);
    assert_eq!(ctx.registry().len(), 1);
}

#[test]
fn staged_values_show_after_the_tick() {
    let (mut ctx, _) = recording_context();
    let script = VirtualController::new();
    let kbd = script.plug(VirtualDeviceSpec::keyboard("kbd"));
    ctx.add_source(script.source());
    let id = script.device_id(kbd).unwrap();

    ctx.get_device_mut(id).unwrap().core_mut().set(InputCode::KeySpace, 1.0);
    let axis = ctx.get_device(id).unwrap().axis(InputCode::KeySpace).unwrap();
    assert_eq!((axis.get(), axis.get_next()), (0.0, 1.0));

    ctx.drain_events().unwrap();
    let axis = ctx.get_device(id).unwrap().axis(InputCode::KeySpace).unwrap();
    assert_eq!((axis.get_previous(), axis.get(), axis.get_next()), (0.0, 1.0, 1.0));

    // Absolute axes hold their value across ticks.
    ctx.drain_events().unwrap();
    let axis = ctx.get_device(id).unwrap().axis(InputCode::KeySpace).unwrap();
    assert_eq!((axis.get_previous(), axis.get()), (1.0, 1.0));
}

#[test]
fn reset_zeroes_every_axis() {
    let (mut ctx, _) = recording_context();
    let script = VirtualController::new();
    let kbd = script.plug(VirtualDeviceSpec::keyboard("kbd"));
    ctx.add_source(script.source());

    script.press(kbd, InputCode::KeyA);
    ctx.drain_events().unwrap();
    ctx.reset();

    let id = script.device_id(kbd).unwrap();
    let axis = ctx.get_device(id).unwrap().axis(InputCode::KeyA).unwrap();
    assert_eq!((axis.get_previous(), axis.get(), axis.get_next()), (0.0, 0.0, 0.0));
}

struct FailingSource;

impl Source for FailingSource {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn enumerate(&mut self, _: &mut DeviceRegistry) -> Result<()> {
        Ok(())
    }

    fn drain_events(&mut self, _: &mut DeviceRegistry) -> Result<()> {
        Err(Error::Backend {
            backend: "failing",
            message: "device gone".into(),
        })
    }
}

#[test]
fn source_error_skips_the_commit() {
    let (mut ctx, _) = recording_context();
    let script = VirtualController::new();
    let kbd = script.plug(VirtualDeviceSpec::keyboard("kbd"));
    ctx.add_source(script.source());
    ctx.add_source(Box::new(FailingSource));
    assert_eq!(ctx.source_names(), vec!["virtual", "failing"]);

    script.press(kbd, InputCode::KeyA);
    assert!(matches!(ctx.drain_events(), Err(Error::Backend { .. })));

    let id = script.device_id(kbd).unwrap();
    let axis = ctx.get_device(id).unwrap().axis(InputCode::KeyA).unwrap();
    assert_eq!((axis.get(), axis.get_next()), (0.0, 1.0));
}

struct BrokenSource;

impl Source for BrokenSource {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn enumerate(&mut self, _: &mut DeviceRegistry) -> Result<()> {
        Err(Error::InvalidArgument("no devices".into()))
    }

    fn drain_events(&mut self, _: &mut DeviceRegistry) -> Result<()> {
        Ok(())
    }
}

#[test]
fn sources_failing_to_enumerate_are_dropped() {
    let (mut ctx, _) = recording_context();
    assert!(!ctx.add_source(Box::new(BrokenSource)));
    assert!(ctx.source_names().is_empty());
    ctx.drain_events().unwrap();
}

#[test]
fn find_first_skips_unusable_devices_and_honours_the_filter() {
    let (mut ctx, _) = recording_context();
    let script = VirtualController::new();
    let first = script.plug(VirtualDeviceSpec::gamepad("first"));
    let second = script.plug(VirtualDeviceSpec::gamepad("second"));
    ctx.add_source(script.source());

    script.press(first, InputCode::PadA);
    script.press(second, InputCode::PadA);
    script.press(second, InputCode::PadB);
    script.set_usable(first, false);
    ctx.drain_events().unwrap();

    let held = |_: DeviceId, _: InputCode, current: f32, _: f32, _: f32| current > 0.5;
    let second_id = script.device_id(second).unwrap();

    assert_eq!(ctx.find_first(held, Some(&[InputCode::PadB])), Some((second_id, InputCode::PadB)));
    assert_eq!(ctx.find_first(held, Some(&[InputCode::KeyA, InputCode::PadA])), Some((second_id, InputCode::PadA)));
    assert_eq!(ctx.find_first(held, Some(&[InputCode::PadX])), None);

    let found = ctx.find_first(held, None).unwrap();
    assert_eq!(found.0, second_id);
    assert!(matches!(found.1, InputCode::PadA | InputCode::PadB));
}

#[test]
fn find_first_ignores_values_staged_since_the_last_tick() {
    let (mut ctx, _) = recording_context();
    let script = VirtualController::new();
    let a = script.plug(VirtualDeviceSpec::gamepad("a"));
    let b = script.plug(VirtualDeviceSpec::gamepad("b"));
    ctx.add_source(script.source());
    ctx.drain_events().unwrap();

    let b_id = script.device_id(b).unwrap();
    assert!(ctx.get_device_mut(b_id).unwrap().core_mut().set(InputCode::PadA, 1.0));

    let nonzero = |_: DeviceId, _: InputCode, current: f32, _: f32, _: f32| current != 0.0;
    assert_eq!(ctx.find_first(nonzero, Some(&[InputCode::PadA])), None);
    let a_id = script.device_id(a).unwrap();
    assert_eq!(ctx.get_device(a_id).unwrap().axis(InputCode::PadA).unwrap().get(), 0.0);
}

#[test]
fn enumeration_is_a_snapshot() {
    let (mut ctx, _) = recording_context();
    let script = VirtualController::new();
    let a = script.plug(VirtualDeviceSpec::keyboard("a"));
    script.plug(VirtualDeviceSpec::mouse("b"));
    ctx.add_source(script.source());

    let mut devices = ctx.devices();
    assert_eq!(devices.len(), 2);

    script.unplug(a);
    script.plug(VirtualDeviceSpec::gamepad("c"));
    ctx.drain_events().unwrap();

    let mut names = Vec::new();
    while let Some(device) = devices.next(&ctx) {
        names.push(device.name().to_string());
    }
    assert_eq!(names, vec!["b"]);

    devices.reset();
    assert_eq!(devices.next(&ctx).map(|device| device.name().to_string()), Some("b".to_string()));
    assert_eq!(ctx.devices().len(), 2);
}

#[test]
fn missing_devices_surface_as_errors() {
    let (mut ctx, _) = recording_context();
    assert!(matches!(ctx.device_mut(42), Err(Error::DeviceNotFound(42))));
    assert!(!ctx.remove_device(42));
}
