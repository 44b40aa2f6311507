//! 模拟设备上的端到端测试

use dreamfocuser_driver::{DreamFocuser, FocuserBuilder, Limits, SimulatedTransport};
use dreamfocuser_protocol::Direction;

#[test]
fn test_sync_then_read_position() {
    let mut focuser = DreamFocuser::new(SimulatedTransport::new(false));
    focuser.read_status().unwrap();
    assert!(!focuser.state().is_absolute);

    focuser.sync(12_800).unwrap();
    assert_eq!(focuser.read_position().unwrap(), 12_800);

    // 同步后设备进入绝对模式
    assert!(focuser.read_mode().unwrap());
}

#[test]
fn test_consecutive_reads_without_motion_agree() {
    let mut focuser = DreamFocuser::new(SimulatedTransport::default());
    let first = focuser.read_position().unwrap();
    let second = focuser.read_position().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_relative_moves_track_position() {
    let mut focuser = FocuserBuilder::new()
        .simulation(true)
        .limits(Limits::new(10_000, 1_000).unwrap())
        .build()
        .unwrap();

    focuser.read_position().unwrap();
    assert_eq!(focuser.move_relative(Direction::Outward, 160).unwrap(), 2160);

    focuser.read_position().unwrap();
    assert_eq!(focuser.move_relative(Direction::Inward, 320).unwrap(), 1840);
    assert_eq!(focuser.read_position().unwrap(), 1840);
}

#[test]
fn test_stale_cache_is_tolerated() {
    let mut focuser = DreamFocuser::new(SimulatedTransport::default());
    focuser.read_position().unwrap();

    // 绕过缓存移动设备
    focuser.set_absolute(4000).unwrap();
    // 目标基于缓存的 2000 计算
    assert_eq!(focuser.move_relative(Direction::Outward, 32).unwrap(), 2032);
}

#[test]
fn test_park_and_abort() {
    let mut focuser = DreamFocuser::new(SimulatedTransport::default());
    focuser.park().unwrap();
    assert_eq!(focuser.read_position().unwrap(), 0);
    focuser.abort().unwrap();

    focuser.disconnect();
    assert!(focuser.read_position().is_err());
}
