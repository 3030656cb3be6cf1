//! Human-friendly sizes

const UNITS: [&str; 8] = [
    "bytes", "Kibytes", "Mibytes", "Gibytes", "Tibytes", "Pibytes", "Eibytes", "Zibytes",
];

/// Suffix like `", 14.9 Gibytes"` for printing after an exact byte count.
///
/// Empty for sizes up to 9999, which read fine as they are.
pub fn human_size(size: u64) -> String {
    if size <= 9999 {
        return String::new();
    }

    let mut scaled = size as f64;
    let mut unit = 0;
    while unit < UNITS.len() - 1 && scaled > 9999.0 {
        scaled /= 1024.0;
        unit += 1;
    }

    if scaled > 99.9 {
        format!(", {:.0} {}", scaled, UNITS[unit])
    } else {
        format!(", {:.1} {}", scaled, UNITS[unit])
    }
}
