/// filterbench – host-parallel filter vs accelerator round-trip timing.
///
///   filterbench                    → 1M elements, local size 256, best backend
///   filterbench -n 4096 -l 64      → smaller sample and groups
///   filterbench -b opencl --profile → OpenCL with queue profiling (-vv to see it)
///   filterbench --bandwidth        → append a GB/s table
///   filterbench --list-devices     → show compute devices and exit
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use filterbench::device::{Accelerator, Backend};
use filterbench::emulator::Emulator;
use filterbench::kernel::{CountVariant, DEFAULT_LOCAL_SIZE};
use filterbench::pipeline::{self, BenchOptions, BenchRow, DEFAULT_SIZE};
use filterbench::report;
use filterbench::workload::DEFAULT_SEED;
use filterbench::BenchResult;

/// Time a host-parallel "filter positive" pass against a device kernel
/// that counts positive elements per work-group.
#[derive(Parser, Debug)]
#[command(name = "filterbench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of sample elements
    #[arg(short = 'n', long, default_value_t = DEFAULT_SIZE)]
    size: usize,

    /// Work-items per local group (must divide --size, at most 1024)
    #[arg(short, long, default_value_t = DEFAULT_LOCAL_SIZE)]
    local_size: usize,

    /// Seed for the generated sample
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Accelerator backend: emulated, opencl or webgpu (default: best compiled in)
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Per-group reduction: single or tree
    #[arg(long, default_value = "single")]
    variant: CountVariant,

    /// Host threads (0=auto)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Timed repetitions; the report shows per-interval medians
    #[arg(short, long, default_value_t = 1)]
    runs: usize,

    /// Also print a bandwidth table (GB/s)
    #[arg(long)]
    bandwidth: bool,

    /// Record device-side command times (OpenCL, logged at debug level)
    #[arg(long)]
    profile: bool,

    /// Take the first usable device instead of preferring GPUs
    #[arg(long)]
    any_device: bool,

    /// List available compute devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress warnings
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn options(&self) -> BenchOptions {
        BenchOptions {
            size: self.size,
            local_size: self.local_size,
            seed: self.seed,
            variant: self.variant,
            threads: self.threads,
            runs: self.runs,
        }
    }

    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

fn list_devices() {
    println!("Compute devices:");
    println!();
    println!("  emulated    host simulation of the work-group kernel");

    #[cfg(feature = "opencl")]
    {
        let devices = filterbench::opencl::probe_devices();
        if devices.is_empty() {
            println!("  opencl      (no platforms found)");
        }
        for d in devices {
            println!(
                "  opencl      {} [{}] {}, max local size {}, {} MB",
                d.name,
                d.platform,
                if d.is_gpu { "GPU" } else { "CPU" },
                d.max_work_group_size,
                d.global_mem_size / (1024 * 1024)
            );
        }
    }

    #[cfg(feature = "webgpu")]
    {
        let devices = filterbench::webgpu::probe_devices();
        if devices.is_empty() {
            println!("  webgpu      (no adapters found)");
        }
        for d in devices {
            println!(
                "  webgpu      {} ({}) {}, max local size {}",
                d.name,
                d.vendor,
                if d.is_gpu { "GPU" } else { "CPU" },
                d.max_work_group_size
            );
        }
    }
}

/// Benchmark on an already-created session. Nothing is printed until
/// every benchmark call has succeeded.
fn bench_on<A: Accelerator>(
    device: &A,
    options: &BenchOptions,
) -> BenchResult<(String, Vec<BenchRow>)> {
    let rows = vec![pipeline::run_filter_benchmark(options, device)?];
    Ok((device.label().to_string(), rows))
}

fn run(cli: &Cli) -> BenchResult<(String, Vec<BenchRow>)> {
    let options = cli.options();
    match cli.backend.unwrap_or_else(Backend::preferred) {
        Backend::Emulated => bench_on(&Emulator::new(), &options),
        #[cfg(feature = "opencl")]
        Backend::OpenCl => {
            let session =
                filterbench::opencl::OpenClSession::with_options(!cli.any_device, cli.profile)?;
            bench_on(&session, &options)
        }
        #[cfg(feature = "webgpu")]
        Backend::WebGpu => {
            if cli.profile {
                log::warn!("--profile has no effect on the webgpu backend");
            }
            let session =
                filterbench::webgpu::WebGpuSession::with_device_preference(!cli.any_device)?;
            bench_on(&session, &options)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    if cli.list_devices {
        list_devices();
        return ExitCode::SUCCESS;
    }

    let (label, rows) = match run(&cli) {
        Ok(result) => result,
        Err(e) => {
            let _ = report::write_error(&mut io::stderr().lock(), &e);
            return ExitCode::FAILURE;
        }
    };

    for row in rows.iter().filter(|r| !r.verified) {
        log::warn!("{}: device counts did not match the host reference", row.name);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = report::render(&mut out, &label, &rows, cli.bandwidth).and_then(|_| out.flush())
    {
        eprintln!("filterbench: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
