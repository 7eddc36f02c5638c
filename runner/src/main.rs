use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use libloading::{Library, Symbol};
use thiserror::Error;
use tracing::{debug, info};

/// C signature of the sample entry point: `int delaunay_sample(float radius, int density)`
type SampleFn = unsafe extern "C" fn(f32, i32) -> i32;

#[derive(Parser, Debug)]
#[command(name = "moodysim-runner")]
#[command(about = "Loads the simulation library and runs its Delaunay sample")]
#[command(version)]
struct Cli {
    /// Path of the simulation shared library
    #[arg(short, long, default_value = "./build/libsimulation.so")]
    library: PathBuf,

    /// Radius of the sampled disc
    #[arg(short, long, default_value = "1.0")]
    radius: f32,

    /// Number of sampling rings
    #[arg(short, long, default_value = "5", allow_negative_numbers = true)]
    density: i32,

    /// Exported symbol to call
    #[arg(short, long, default_value = "delaunay_sample")]
    symbol: String,
}

#[derive(Error, Debug)]
enum RunnerError {
    #[error("failed to load library {path:?}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("symbol `{symbol}` not found")]
    SymbolNotFound {
        symbol: String,
        #[source]
        source: libloading::Error,
    },
    #[error("call returned status {status}")]
    CallFailed { status: i32 },
}

fn load_library(path: &Path) -> Result<Library, RunnerError> {
    // SAFETY: loading runs the library initializers, the library is trusted to be the simulation.
    unsafe { Library::new(path) }.map_err(|source| RunnerError::LibraryLoad {
        path: path.to_path_buf(),
        source,
    })
}

fn call_sample(
    library: &Library,
    symbol: &str,
    radius: f32,
    density: i32,
) -> Result<i32, RunnerError> {
    // SAFETY: the symbol is assumed to have the `SampleFn` signature. A mismatch is undefined behavior
    // that the loader cannot detect.
    let sample: Symbol<SampleFn> = unsafe { library.get(symbol.as_bytes()) }.map_err(|source| {
        RunnerError::SymbolNotFound {
            symbol: symbol.to_string(),
            source,
        }
    })?;

    debug!("Calling {}({}, {})", symbol, radius, density);
    // SAFETY: see above, `library` outlives the call.
    let status = unsafe { sample(radius, density) };
    match status {
        0 => Ok(status),
        _ => Err(RunnerError::CallFailed { status }),
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let library = load_library(&cli.library)
        .with_context(|| format!("Is the simulation built and copied to {:?}?", cli.library))?;
    info!("Loaded {:?}", cli.library);

    call_sample(&library, &cli.symbol, cli.radius, cli.density)
        .with_context(|| format!("Running `{}`", cli.symbol))?;
    info!("{} done", cli.symbol);

    Ok(())
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
