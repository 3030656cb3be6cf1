//! Test data written at each probe address

/// Bytes `sequence, sequence + 1, ...` wrapping at 256.
///
/// Each probe uses a new sequence number, so two probes that hit the same
/// physical cell leave distinguishable data behind.
pub fn test_pattern(sequence: u64, len: usize) -> Vec<u8> {
    (0..len)
        .map(|n| (sequence.wrapping_add(n as u64) % 256) as u8)
        .collect()
}
