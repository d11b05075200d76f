//! Maritime Overwatch CLI
//!
//! Precompute satellite ground tracks from an indexed TLE archive and
//! intersect them with AIS vessel pings.
//!
//! Usage:
//!   overwatch ingest-tles --input tle2015.txt --output tles.stle
//!   overwatch build-track --tle-archive tles.stle --norad-id 25544 --archive index/
//!   overwatch list-ids --archive index/
//!   overwatch interpolate --input ais_2015.csv
//!   overwatch hits --archive index/ --norad-id 25544 --ais ais_2015.csv \
//!                  --start 2015-01-01 --end 2015-02-01 --output hits.csv
//!
//! Exit codes: 0 on success, 2 on invalid paths or schema, 1 on
//! unexpected failures.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use overwatch_cli::ais;
use overwatch_cli::{parse_time, UsageError};
use tle_archive::{ingest, TleStore};
use track_archive::TrackArchive;
use track_builder::{BuildOutcome, Sgp4Propagator, TrackBuilder};
use visibility_kernel::{compute_hits, interpolate_tracks, KernelConfig, VesselFrame};

#[derive(Parser, Debug)]
#[command(
    name = "overwatch",
    about = "Satellite visibility of AIS vessel tracks for the SX9 Maritime mission"
)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest raw two-line element text into an indexed archive
    IngestTles {
        /// Raw TLE text file(s)
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output archive path
        #[arg(long)]
        output: PathBuf,
    },

    /// Precompute one satellite's ground track into the track archive
    BuildTrack {
        /// Indexed TLE archive
        #[arg(long)]
        tle_archive: PathBuf,

        /// Satellite NORAD id
        #[arg(long)]
        norad_id: u32,

        /// Track archive directory
        #[arg(long)]
        archive: PathBuf,

        /// Rebuild even if the entry already exists
        #[arg(long)]
        force: bool,
    },

    /// Print the NORAD ids present in a track archive
    ListIds {
        /// Track archive directory
        #[arg(long)]
        archive: PathBuf,
    },

    /// Gap-fill an AIS file with synthetic pings
    Interpolate {
        /// Input AIS CSV, sorted by (mmsi_id, date_time)
        #[arg(long)]
        input: PathBuf,

        /// Approximate gap between interpolated points, seconds
        #[arg(short = 'i', long, default_value_t = visibility_kernel::DEFAULT_MAX_DT_S)]
        interval: i64,

        /// Maximum range between successive points to interpolate, km
        #[arg(short = 'd', long, default_value_t = visibility_kernel::DEFAULT_MAX_DIST_KM)]
        distance: f64,

        /// Output path; defaults to INPUT.interp.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find AIS pings inside a satellite's field of view
    Hits {
        /// Track archive directory
        #[arg(long)]
        archive: PathBuf,

        /// Satellite NORAD id
        #[arg(long)]
        norad_id: u32,

        /// AIS CSV file(s); an .interp.csv sibling is preferred
        #[arg(long, required = true, num_args = 1..)]
        ais: Vec<PathBuf>,

        /// Starting time (epoch seconds or 2015-01-07T09:32:12)
        #[arg(long)]
        start: Option<String>,

        /// Ending time, same formats
        #[arg(long)]
        end: Option<String>,

        /// Assume every satellite sees a full half-earth
        #[arg(long)]
        half_earth: bool,

        /// Worker chunk count; chosen automatically when omitted
        #[arg(short, long)]
        workers: Option<usize>,

        /// Ignore interpolated siblings and use the raw files
        #[arg(long)]
        no_interp: bool,

        /// Write hits to CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging already initialised");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            if e.chain().any(|cause| cause.is::<UsageError>()) {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::IngestTles { input, output } => cmd_ingest_tles(&input, &output),
        Command::BuildTrack {
            tle_archive,
            norad_id,
            archive,
            force,
        } => cmd_build_track(&tle_archive, norad_id, &archive, force),
        Command::ListIds { archive } => cmd_list_ids(&archive),
        Command::Interpolate {
            input,
            interval,
            distance,
            output,
        } => cmd_interpolate(&input, interval, distance, output),
        Command::Hits {
            archive,
            norad_id,
            ais,
            start,
            end,
            half_earth,
            workers,
            no_interp,
            output,
        } => cmd_hits(
            &archive, norad_id, &ais, start, end, half_earth, workers, no_interp, output,
        ),
    }
}

fn cmd_ingest_tles(inputs: &[PathBuf], output: &PathBuf) -> Result<()> {
    let mut readers = Vec::with_capacity(inputs.len());
    for path in inputs {
        let file = File::open(path)
            .map_err(|e| UsageError(format!("cannot open {}: {}", path.display(), e)))?;
        readers.push(BufReader::new(file));
    }

    let store = ingest::store_from_text(readers)
        .map_err(|e| UsageError(format!("TLE ingest failed: {}", e)))?;
    store
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Ingested {} TLE records for {} satellites into {}",
        store.len(),
        store.norad_ids().len(),
        output.display()
    );
    Ok(())
}

fn cmd_build_track(
    tle_archive: &PathBuf,
    norad_id: u32,
    archive_dir: &PathBuf,
    force: bool,
) -> Result<()> {
    let store = TleStore::open(tle_archive)
        .map_err(|e| UsageError(format!("cannot load TLE archive: {}", e)))?;
    let archive = TrackArchive::create(archive_dir)
        .map_err(|e| UsageError(format!("cannot open track archive: {}", e)))?;

    if archive.contains(norad_id) && !force {
        println!("{} is already in the index; skipping (use --force to rebuild)", norad_id);
        return Ok(());
    }

    let builder = TrackBuilder::new(&store, &archive, Sgp4Propagator);
    match builder.build(norad_id).context("building track")? {
        BuildOutcome::Written { windows, samples } => {
            println!(
                "Completed compute for norad id {}: {} samples over {} windows",
                norad_id, samples, windows
            );
        }
        BuildOutcome::NoData => println!("No data for norad id {}", norad_id),
    }
    Ok(())
}

fn cmd_list_ids(archive_dir: &PathBuf) -> Result<()> {
    let archive = TrackArchive::open(archive_dir)
        .map_err(|e| UsageError(format!("cannot open track archive: {}", e)))?;
    for id in archive.list_ids().context("walking track archive")? {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_interpolate(
    input: &PathBuf,
    interval: i64,
    distance: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    let frame = ais::read_ais_csv(input)?;
    let filled = interpolate_tracks(&frame, interval, distance);
    let out_path = output.unwrap_or_else(|| ais::interp_sibling(input));
    ais::write_ais_csv(&out_path, &filled)?;
    println!(
        "Interpolated {} pings into {} ({} synthetic) -> {}",
        frame.len(),
        filled.len(),
        filled.len() - frame.len(),
        out_path.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_hits(
    archive_dir: &PathBuf,
    norad_id: u32,
    ais_files: &[PathBuf],
    start: Option<String>,
    end: Option<String>,
    half_earth: bool,
    workers: Option<usize>,
    no_interp: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let archive = TrackArchive::open(archive_dir)
        .map_err(|e| UsageError(format!("cannot open track archive: {}", e)))?;

    let start_s = start.as_deref().map(parse_time).transpose()?;
    let end_s = end.as_deref().map(parse_time).transpose()?;

    // Slice the satellite track to the query range; unbounded ends fall
    // back to the entry's own span.
    let (first_s, last_s) = archive
        .timespan(norad_id)
        .with_context(|| format!("no usable track for norad id {}", norad_id))?;
    let sat = archive
        .get_range(
            norad_id,
            start_s.unwrap_or(first_s.floor() as i64),
            end_s.map(|e| e + 1).unwrap_or(last_s.ceil() as i64 + 1),
        )
        .context("reading track range")?;
    info!(norad_id, samples = sat.len(), "loaded satellite track");

    let mut merged = VesselFrame::default();
    for path in ais_files {
        let frame = if no_interp {
            ais::read_ais_csv(path)?
        } else {
            ais::read_preferring_interp(path)?.0
        };
        for i in 0..frame.len() {
            merged.push(
                frame.mmsi_id[i],
                frame.time_s[i],
                frame.lat_deg[i],
                frame.lon_deg[i],
            );
        }
    }
    // AIS files are (mmsi, time)-sorted; the sweep needs time order.
    let vessels = merged.sorted_by_time();

    let cfg = KernelConfig {
        start_time_s: start_s,
        end_time_s: end_s,
        workers,
        half_earth,
        min_horizon_elevation_rad: 0.0,
    };
    let hits = compute_hits(&sat, &vessels, &cfg).context("computing hits")?;

    println!(
        "Found {} hits among {} pings for norad id {}",
        hits.len(),
        vessels.len(),
        norad_id
    );
    if let Some(out_path) = output {
        ais::write_ais_csv(&out_path, &hits)?;
        println!("Wrote hits to {}", out_path.display());
    }
    Ok(())
}
