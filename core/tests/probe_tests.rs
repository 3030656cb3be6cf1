//! Single-probe behaviour against simulated devices

mod common;

use common::{Op, SimDevice, MIB};
use disksize_core::config::DIAGNOSTIC_LIMIT;
use disksize_core::probe::{run_probe, test_pattern, ProbeRequest};
use disksize_core::{Error, FailureKind};

fn request(address: u64, modulus: u64, sequence: u64) -> ProbeRequest {
    ProbeRequest {
        address,
        modulus,
        sequence,
    }
}

#[test]
fn clean_probe_restores_everything() {
    let mut device = SimDevice::perfect(4 * MIB);
    let target = 2 * MIB - 512;
    let shadow = MIB - 512;
    let target_before = device.peek(target, 512);
    let shadow_before = device.peek(shadow, 512);

    let outcome = run_probe(&mut device, 512, request(2 * MIB, MIB, 5)).expect("probe");

    assert!(outcome.is_clean());
    assert_eq!(outcome.address, target);
    assert_eq!(outcome.shadow, shadow);
    assert_eq!(device.peek(target, 512), target_before);
    assert_eq!(device.peek(shadow, 512), shadow_before);
}

#[test]
fn transaction_order() {
    let mut device = SimDevice::perfect(4 * MIB);
    let target = 2 * MIB - 512;
    let shadow = MIB - 512;

    run_probe(&mut device, 512, request(2 * MIB, MIB, 0)).expect("probe");

    assert_eq!(
        device.ops,
        vec![
            Op::Read(shadow),
            Op::Read(target),
            Op::Write(target),
            Op::Read(target),
            Op::Read(shadow),
            Op::Write(target),
            Op::Read(shadow),
        ]
    );
}

#[test]
fn dropped_writes_are_mismatches() {
    let mut device = SimDevice::perfect(4 * MIB).dropping_writes_from(2 * MIB);
    let target = 3 * MIB - 512;
    let original = device.peek(target, 512);
    let pattern = test_pattern(1, 512);
    let expected = original
        .iter()
        .zip(&pattern)
        .filter(|(o, p)| o != p)
        .count();

    let outcome = run_probe(&mut device, 512, request(3 * MIB, MIB, 1)).expect("probe");

    assert_eq!(outcome.mismatches, expected);
    assert!(outcome.mismatches > DIAGNOSTIC_LIMIT);
    assert_eq!(outcome.corruptions, 0);
    assert_eq!(outcome.mismatch_samples.len(), DIAGNOSTIC_LIMIT);

    let first = outcome.mismatch_samples[0];
    assert_eq!(first.read, first.original);
    assert!(outcome.to_string().contains("\n...\n"));
}

#[test]
fn aliased_write_is_corruption() {
    // Only 1 MiB of real storage; 2 MiB - 512 lands on 1 MiB - 512
    let mut device = SimDevice::aliased(4 * MIB, MIB);
    let shadow = MIB - 512;
    let shadow_before = device.peek(shadow, 512);

    let outcome = run_probe(&mut device, 512, request(2 * MIB, MIB, 3)).expect("probe");

    assert_eq!(outcome.mismatches, 0);
    assert!(outcome.corruptions > 0);
    let sample = outcome.corruption_samples[0];
    assert_eq!(sample.corrupted, shadow + (sample.written_at - outcome.address));
    assert_eq!(device.peek(shadow, 512), shadow_before);
}

#[test]
fn corruption_triggers_shadow_restore() {
    let mut device = SimDevice::aliased(4 * MIB, MIB);
    run_probe(&mut device, 512, request(2 * MIB, MIB, 3)).expect("probe");

    assert_eq!(device.ops.len(), 8);
    assert_eq!(device.ops[7], Op::Write(MIB - 512));
}

#[test]
fn failed_readback_still_restores_target() {
    // op 3 is the read-back of the pattern
    let mut device = SimDevice::perfect(4 * MIB).failing_op(3);
    let target = 2 * MIB - 512;
    let original = device.peek(target, 512);

    let err = run_probe(&mut device, 512, request(2 * MIB, MIB, 9)).unwrap_err();

    assert_eq!(err.failure_kind(), Some(FailureKind::Io));
    assert_eq!(device.ops.last(), Some(&Op::Write(target)));
    assert_eq!(device.peek(target, 512), original);
}

#[test]
fn short_write_stops_the_probe() {
    let mut device = SimDevice::perfect(4 * MIB).short_writes_from(0);

    let err = run_probe(&mut device, 512, request(2 * MIB, MIB, 0)).unwrap_err();

    assert_eq!(err.failure_kind(), Some(FailureKind::ShortTransfer));
    // snapshot reads, the failed write, the best-effort restore
    assert_eq!(device.ops.len(), 4);
}

#[test]
fn invalid_request_touches_nothing() {
    let mut device = SimDevice::perfect(4 * MIB);

    let err = run_probe(&mut device, 512, request(MIB + 100, MIB / 2, 0)).unwrap_err();

    assert!(matches!(err, Error::InvalidProbe { .. }));
    assert!(device.ops.is_empty());
}

#[test]
fn repeated_probes_use_distinct_patterns() {
    let mut device = SimDevice::perfect(4 * MIB).dropping_writes_from(2 * MIB);
    let a = run_probe(&mut device, 512, request(3 * MIB, MIB, 0)).expect("probe");
    let b = run_probe(&mut device, 512, request(3 * MIB, MIB, 1)).expect("probe");

    assert_ne!(a.mismatch_samples[0].written, b.mismatch_samples[0].written);
}
