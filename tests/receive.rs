mod common;

use canopen_canmodule::frame::CAN_RTR_FLAG;
use canopen_canmodule::{CanModule, Config};
use common::{FakePeripheral, Recorder};

#[test]
fn software_scan_dispatches_to_matching_filter() {
    let tpdo1 = Recorder::default();
    let tpdo2 = Recorder::default();

    let mut module: CanModule<'_, FakePeripheral, 4, 1> = CanModule::new(FakePeripheral::default());
    module.init(Config::default()).unwrap();
    module.register_filter(0, 0x181, 0x7FF, false, &tpdo1).unwrap();
    module.register_filter(1, 0x281, 0x7FF, false, &tpdo2).unwrap();
    module.set_normal_mode().unwrap();

    module.peripheral(|p| p.push_rx(0x181, &[1, 2, 3], None));
    module.on_rx();
    assert_eq!(tpdo1.count(), 1);
    assert_eq!(tpdo2.count(), 0);
    assert_eq!(tpdo1.frames()[0].payload(), &[1, 2, 3]);

    module.peripheral(|p| p.push_rx(0x381, &[4], None));
    module.on_rx();
    assert_eq!(tpdo1.count(), 1);
    assert_eq!(tpdo2.count(), 0);
}

#[test]
fn overlapping_filters_resolve_to_lowest_index() {
    let nmt = Recorder::default();
    let broad = Recorder::default();

    let mut module: CanModule<'_, FakePeripheral, 3, 1> = CanModule::new(FakePeripheral::default());
    module.init(Config::default()).unwrap();
    module.register_filter(2, 0x000, 0x7FF, false, &nmt).unwrap();
    module.register_filter(1, 0x000, 0x000, false, &broad).unwrap();
    module.set_normal_mode().unwrap();

    module.peripheral(|p| p.push_rx(0x000, &[1, 0], None));
    module.on_rx();

    assert_eq!(broad.count(), 1);
    assert_eq!(nmt.count(), 0);
}

#[test]
fn remote_frames_only_reach_rtr_filters() {
    let guard = Recorder::default();

    let mut module: CanModule<'_, FakePeripheral, 1, 1> = CanModule::new(FakePeripheral::default());
    module.init(Config::default()).unwrap();
    module.register_filter(0, 0x705, 0x7FF, true, &guard).unwrap();
    module.set_normal_mode().unwrap();

    module.peripheral(|p| p.push_rx(0x705, &[], None));
    module.on_rx();
    assert_eq!(guard.count(), 0);

    module.peripheral(|p| p.push_rx(0x705 | CAN_RTR_FLAG, &[], None));
    module.on_rx();
    assert_eq!(guard.count(), 1);
    assert!(guard.frames()[0].is_rtr());
}

#[test]
fn hardware_filter_hit_is_double_checked() {
    let sdo = Recorder::default();
    let rpdo = Recorder::default();

    let mut module: CanModule<'_, FakePeripheral, 2, 1> = CanModule::new(FakePeripheral::default());
    module
        .init(Config {
            hw_filters: true,
            ..Config::default()
        })
        .unwrap();
    module.register_filter(0, 0x605, 0x7FF, false, &sdo).unwrap();
    module.register_filter(1, 0x205, 0x7FF, false, &rpdo).unwrap();
    module.set_normal_mode().unwrap();

    module.peripheral(|p| p.push_rx(0x205, &[9], Some(1)));
    module.on_rx();
    assert_eq!(rpdo.count(), 1);

    // table and hardware disagree
    module.peripheral(|p| p.push_rx(0x205, &[9], Some(0)));
    module.on_rx();
    module.peripheral(|p| p.push_rx(0x605, &[9], None));
    module.on_rx();

    assert_eq!(sdo.count(), 0);
    assert_eq!(rpdo.count(), 1);
}

#[test]
fn every_receive_rearms_the_request() {
    let mut module: CanModule<'_, FakePeripheral, 1, 1> = CanModule::new(FakePeripheral::default());
    module.init(Config::default()).unwrap();
    module.set_normal_mode().unwrap();
    assert_eq!(module.peripheral(|p| p.rx_requests), 1);

    module.peripheral(|p| p.push_rx(0x123, &[], None));
    module.on_rx();
    module.on_rx();
    module.on_rx_overrun();

    assert_eq!(module.peripheral(|p| p.rx_requests), 4);
}
