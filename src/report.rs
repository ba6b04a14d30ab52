//! Console timing tables.
//!
//! Layout: a 19-wide right-aligned name column followed by five 20-wide
//! right-aligned interval columns, one row per benchmarked operation.

use std::io::{self, Write};
use std::time::Duration;

use crate::pipeline::{bandwidth, BenchRow};
use crate::{BenchError, CL_ERROR_CODES_URL};

const NAME_WIDTH: usize = 19;
const CELL_WIDTH: usize = 20;

/// Column headers for a device backend labelled `device`.
pub fn column_names(device: &str) -> [String; 6] {
    [
        "function".to_string(),
        "host parallel".to_string(),
        format!("{device} total"),
        format!("{device} copy-in"),
        format!("{device} kernel"),
        format!("{device} copy-out"),
    ]
}

/// Format a duration as whole microseconds with a `us` suffix.
pub fn format_micros(d: Duration) -> String {
    format!("{}us", d.as_micros())
}

fn write_row<W: Write>(out: &mut W, name: &str, cells: &[String]) -> io::Result<()> {
    write!(out, "{name:>NAME_WIDTH$}")?;
    for cell in cells {
        write!(out, "{cell:>CELL_WIDTH$}")?;
    }
    writeln!(out)
}

/// Write the header row.
pub fn write_header<W: Write>(out: &mut W, device: &str) -> io::Result<()> {
    let [name, rest @ ..] = column_names(device);
    write_row(out, &name, &rest)
}

/// Write one timing row.
pub fn write_timings<W: Write>(out: &mut W, row: &BenchRow) -> io::Result<()> {
    let cells: Vec<String> = row.timings.as_array().into_iter().map(format_micros).collect();
    write_row(out, &row.name, &cells)
}

/// Write one bandwidth row (GB/s per interval).
pub fn write_bandwidth<W: Write>(out: &mut W, row: &BenchRow) -> io::Result<()> {
    let cells: Vec<String> = row
        .timings
        .as_array()
        .into_iter()
        .map(|d| format!("{:.2}GB/s", bandwidth(row.elements, d)))
        .collect();
    write_row(out, &row.name, &cells)
}

/// Render the full timing table, optionally followed by a bandwidth table.
pub fn render<W: Write>(
    out: &mut W,
    device: &str,
    rows: &[BenchRow],
    with_bandwidth: bool,
) -> io::Result<()> {
    write_header(out, device)?;
    for row in rows {
        write_timings(out, row)?;
    }
    if with_bandwidth {
        writeln!(out)?;
        write_header(out, device)?;
        for row in rows {
            write_bandwidth(out, row)?;
        }
    }
    Ok(())
}

/// Write the top-level diagnostic for a failed benchmark.
///
/// OpenCL runtime errors name the failing call and its code, followed by
/// where the codes are documented.
pub fn write_error<W: Write>(out: &mut W, err: &BenchError) -> io::Result<()> {
    writeln!(out, "filterbench: {err}")?;
    if let BenchError::OpenCl { code, .. } = err {
        writeln!(
            out,
            "Search cl.h file for error code ({code}) to understand what it means:"
        )?;
        writeln!(out, "{CL_ERROR_CODES_URL}")?;
    }
    Ok(())
}
