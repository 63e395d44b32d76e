//! Packet scheduler time base.
//!
//! The kernel's traffic control subsystem expresses latency and jitter in its own time units
//! ("ticks"). Configuration in this crate is in microseconds; the helpers below convert
//! between the two when encoding or decoding [`NetemQopt`](crate::netem::qopt::NetemQopt).

use std::{
    io::{self, Read as _},
    sync::LazyLock,
};

/// Path to the kernel's packet scheduler timing information.
pub const PSCHED_PATH: &str = "/proc/net/psched";

/// Ticks per microsecond on current kernels (`t2us = 0x3e8`, `us2t = 0x40`).
pub const DEFAULT_TICK_IN_USEC: f64 = 1000.0 / 64.0;

/// Read the packet scheduler time base from `/proc/net/psched`.
///
/// The file format is `t2us us2t clock resolution`, all hexadecimal. The ratio
/// `t2us / us2t` is the number of ticks in a microsecond.
///
/// Adapted from `iproute2/tc/tc_core.c`.
pub fn tc_core_init() -> io::Result<f64> {
    let mut file = std::fs::File::open(PSCHED_PATH)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    parse_psched(&contents)
}

/// Parse the contents of `/proc/net/psched` into ticks per microsecond.
pub fn parse_psched(contents: &str) -> io::Result<f64> {
    let mut iter = contents.split_whitespace();
    let mut next_hex = |field: &str| -> io::Result<u32> {
        let raw = iter.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{PSCHED_PATH}: missing {field}"))
        })?;
        u32::from_str_radix(raw, 16).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{PSCHED_PATH}: {field}: {e}"))
        })
    };

    let t2us = next_hex("t2us")?;
    let us2t = next_hex("us2t")?;
    if us2t == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "us2t is zero"));
    }

    // Number of ticks within a microsecond.
    let tick_in_usec = t2us as f64 / us2t as f64;

    tracing::debug!(t2us, us2t, tick_in_usec, "parsed {PSCHED_PATH}");

    Ok(tick_in_usec)
}

/// Cached ticks per microsecond, read once on first use.
///
/// Falls back to [`DEFAULT_TICK_IN_USEC`] where `/proc/net/psched` is unavailable.
pub static TICK_IN_USEC: LazyLock<f64> = LazyLock::new(|| match tc_core_init() {
    Ok(tick_in_usec) => tick_in_usec,
    Err(e) => {
        tracing::debug!(?e, fallback = DEFAULT_TICK_IN_USEC, "using default scheduler time base");
        DEFAULT_TICK_IN_USEC
    }
});

/// Convert microseconds to packet scheduler ticks with the given time base.
pub fn usec_to_ticks_with(delay_usec: u32, tick_in_usec: f64) -> u32 {
    (delay_usec as f64 * tick_in_usec).round() as u32
}

/// Convert packet scheduler ticks to microseconds with the given time base.
pub fn ticks_to_usec_with(ticks: u32, tick_in_usec: f64) -> u32 {
    (ticks as f64 / tick_in_usec).round() as u32
}

/// Convert microseconds to packet scheduler ticks using the system time base.
pub fn usec_to_ticks(delay_usec: u32) -> u32 {
    usec_to_ticks_with(delay_usec, *TICK_IN_USEC)
}

/// Convert packet scheduler ticks to microseconds using the system time base.
pub fn ticks_to_usec(ticks: u32) -> u32 {
    ticks_to_usec_with(ticks, *TICK_IN_USEC)
}
