//! Staged-timing profiling pipeline.
//!
//! One benchmark call takes five timestamps:
//!
//! ```text
//!  t0 ── host filter ── t1 ── copy-in ── t2 ── kernel ── t3 ── copy-out ── t4
//!                          └────────────── device total ──────────────────┘
//! ```
//!
//! `t2` is taken after the sample upload has been synchronized and the
//! kernel arguments are bound; `t3` right after the dispatch is flushed;
//! `t4` once the Partial-Count Buffer is back on the host. Verification
//! runs after `t4` and is not part of any interval.
//!
//! Setup stays outside the timestamps: the host thread pool is built and
//! the kernel is prepared (see [`Accelerator::prepare`]) before `t0`, once
//! per benchmark rather than once per run.

use std::time::{Duration, Instant};

use crate::device::Accelerator;
use crate::host;
use crate::kernel::{CountVariant, GroupConfig, DEFAULT_LOCAL_SIZE};
use crate::verify;
use crate::workload::{Sample, DEFAULT_SEED};
use crate::{BenchError, BenchResult};

/// Default number of sample elements (1M).
pub const DEFAULT_SIZE: usize = 1024 * 1024;

/// Name of the benchmarked operation as it appears in the report.
pub const FILTER_ROW: &str = "filter";

/// Per-call durations for the five timed intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Host-parallel filter (`t1 - t0`).
    pub host: Duration,
    /// Full device round trip (`t4 - t1`).
    pub device_total: Duration,
    /// Allocation, upload and argument binding (`t2 - t1`).
    pub copy_in: Duration,
    /// Kernel dispatch up to the post-dispatch flush (`t3 - t2`).
    pub kernel: Duration,
    /// Blocking read of the Partial-Count Buffer (`t4 - t3`).
    pub copy_out: Duration,
}

impl StageTimings {
    /// Derive the intervals from timestamps `[t0, t1, t2, t3, t4]`.
    pub fn from_timestamps(t: [Instant; 5]) -> Self {
        StageTimings {
            host: t[1] - t[0],
            device_total: t[4] - t[1],
            copy_in: t[2] - t[1],
            kernel: t[3] - t[2],
            copy_out: t[4] - t[3],
        }
    }

    /// Intervals in report column order.
    pub fn as_array(&self) -> [Duration; 5] {
        [
            self.host,
            self.device_total,
            self.copy_in,
            self.kernel,
            self.copy_out,
        ]
    }

    /// Per-interval median across repeated runs. `None` for no runs.
    pub fn median(runs: &[StageTimings]) -> Option<StageTimings> {
        if runs.is_empty() {
            return None;
        }
        let pick = |field: fn(&StageTimings) -> Duration| {
            let mut values: Vec<Duration> = runs.iter().map(field).collect();
            values.sort_unstable();
            values[values.len() / 2]
        };
        Some(StageTimings {
            host: pick(|t| t.host),
            device_total: pick(|t| t.device_total),
            copy_in: pick(|t| t.copy_in),
            kernel: pick(|t| t.kernel),
            copy_out: pick(|t| t.copy_out),
        })
    }
}

/// Effective bandwidth in GB/s for moving `n` `f32` values three times in
/// `elapsed`.
///
/// Elapsed time is counted in whole microseconds; an interval shorter than
/// one microsecond reports `0.0`.
pub fn bandwidth(n: usize, elapsed: Duration) -> f64 {
    let dt_us = elapsed.as_micros();
    if dt_us == 0 {
        return 0.0;
    }
    let bytes = (3 * n * std::mem::size_of::<f32>()) as f64;
    (bytes * 1e-9) / (dt_us as f64 * 1e-6)
}

/// Result of one timed benchmark call.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub timings: StageTimings,
    /// The device's Partial-Count Buffer.
    pub counts: Vec<i32>,
    /// Length of the host-filtered subsequence.
    pub filtered_len: usize,
    /// Whether the device output matched the host reference.
    pub verified: bool,
}

/// Run one host filter plus one full device round trip over `sample`.
///
/// `prepared` must come from `device.prepare(config)`. The host filter
/// runs on `pool`, or on the global rayon pool when `None`. Device errors
/// abort the call and propagate; verification failures do not.
pub fn profile_filter<A: Accelerator>(
    sample: &Sample,
    config: &GroupConfig,
    device: &A,
    prepared: &A::Prepared,
    pool: Option<&rayon::ThreadPool>,
) -> BenchResult<FilterOutcome> {
    if config.len() != sample.len() {
        return Err(BenchError::Config(format!(
            "group configuration covers {} elements, sample has {}",
            config.len(),
            sample.len()
        )));
    }
    config.check_device_limit(device.max_work_group_size())?;

    let input = sample.as_slice();

    let t0 = Instant::now();
    let filtered = host::install(pool, || host::filter_positive(input));
    let t1 = Instant::now();
    let mut staged = device.copy_in(prepared, input, config)?;
    let t2 = Instant::now();
    device.launch(prepared, &mut staged)?;
    let t3 = Instant::now();
    let counts = device.copy_out(staged)?;
    let t4 = Instant::now();

    let timings = StageTimings::from_timestamps([t0, t1, t2, t3, t4]);
    log::debug!(
        "{}: n={} local={} groups={} {:?}",
        device.label(),
        config.len(),
        config.local_size(),
        config.groups(),
        timings
    );

    let host_counts = host::count_positive_per_group(input, config.local_size());
    let verified = verify::verify(&host_counts, filtered.len(), &counts);

    Ok(FilterOutcome {
        timings,
        counts,
        filtered_len: filtered.len(),
        verified,
    })
}

/// Options controlling a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchOptions {
    /// Number of sample elements.
    pub size: usize,
    /// Work-items per local group; must divide `size`.
    pub local_size: usize,
    /// Seed for the generated sample.
    pub seed: u64,
    /// Per-group reduction strategy.
    pub variant: CountVariant,
    /// Host threads. 0 = auto (use all available cores).
    pub threads: usize,
    /// Timed repetitions; the report shows the per-interval median.
    pub runs: usize,
}

impl Default for BenchOptions {
    fn default() -> Self {
        BenchOptions {
            size: DEFAULT_SIZE,
            local_size: DEFAULT_LOCAL_SIZE,
            seed: DEFAULT_SEED,
            variant: CountVariant::Single,
            threads: 0,
            runs: 1,
        }
    }
}

/// One report row: a benchmarked operation and its timings.
#[derive(Debug, Clone)]
pub struct BenchRow {
    pub name: String,
    /// Sample length, used for bandwidth figures.
    pub elements: usize,
    pub timings: StageTimings,
    pub verified: bool,
}

/// Generate the workload and benchmark the filter operation on `device`.
///
/// The configuration is validated before the sample is generated, so an
/// invalid local size never reaches the device.
pub fn run_filter_benchmark<A: Accelerator>(
    options: &BenchOptions,
    device: &A,
) -> BenchResult<BenchRow> {
    let config = GroupConfig::new(options.size, options.local_size, options.variant)?;
    config.check_device_limit(device.max_work_group_size())?;
    if options.runs == 0 {
        return Err(BenchError::Config("runs must be at least 1".into()));
    }

    let sample = Sample::random(options.size, options.seed);
    log::info!(
        "profiling {FILTER_ROW} on {} ({}): {} elements, local size {}",
        device.label(),
        device.device_name(),
        sample.len(),
        config.local_size()
    );

    let pool = host::thread_pool(options.threads);
    let prepared = device.prepare(&config)?;

    let mut runs = Vec::with_capacity(options.runs);
    let mut verified = true;
    for _ in 0..options.runs {
        let outcome = profile_filter(&sample, &config, device, &prepared, pool.as_ref())?;
        verified &= outcome.verified;
        runs.push(outcome.timings);
    }
    let timings = StageTimings::median(&runs).unwrap_or_default();

    Ok(BenchRow {
        name: FILTER_ROW.to_string(),
        elements: sample.len(),
        timings,
        verified,
    })
}
