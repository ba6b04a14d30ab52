//! Host/device result comparison.
//!
//! Both paths are compared as per-group positive counts. The device's
//! Partial-Count Buffer must match the host's per-group counts slot for
//! slot, and its total must equal the length of the host's filtered
//! subsequence. A mismatch is reported to the caller, never raised as a
//! benchmark failure.

/// Why the device output disagrees with the host reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    #[error("device returned {device} group counts, host expected {host}")]
    Length { host: usize, device: usize },
    #[error(
        "{mismatched} group counts differ; first at group {index}: host {host}, device {device}"
    )]
    Groups {
        mismatched: usize,
        index: usize,
        host: i32,
        device: i32,
    },
    #[error("device total {device} does not match {filtered} filtered elements")]
    Total { filtered: usize, device: i64 },
}

/// Compare per-group counts slot for slot.
pub fn verify_counts(host: &[i32], device: &[i32]) -> Result<(), Mismatch> {
    if host.len() != device.len() {
        return Err(Mismatch::Length {
            host: host.len(),
            device: device.len(),
        });
    }
    let mut first = None;
    let mut mismatched = 0;
    for (index, (&h, &d)) in host.iter().zip(device).enumerate() {
        if h != d {
            mismatched += 1;
            first.get_or_insert((index, h, d));
        }
    }
    match first {
        None => Ok(()),
        Some((index, host, device)) => Err(Mismatch::Groups {
            mismatched,
            index,
            host,
            device,
        }),
    }
}

/// Check that the device counts add up to the host filter's output length.
pub fn verify_total(filtered_len: usize, device: &[i32]) -> Result<(), Mismatch> {
    let total: i64 = device.iter().map(|&c| i64::from(c)).sum();
    if total != filtered_len as i64 {
        return Err(Mismatch::Total {
            filtered: filtered_len,
            device: total,
        });
    }
    Ok(())
}

/// Run every check, logging a warning on the first failure.
///
/// Returns `true` when the device output is equivalent to the host's.
pub fn verify(host_counts: &[i32], filtered_len: usize, device: &[i32]) -> bool {
    let result = verify_counts(host_counts, device).and_then(|()| verify_total(filtered_len, device));
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("verification failed: {e}");
            false
        }
    }
}
