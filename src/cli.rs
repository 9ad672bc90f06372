// src/cli.rs
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tokio_util::sync::CancellationToken;

use crate::config::consts::CONFIG_FILE;
use crate::config::options::{AppOptions, ExportFormat};
use crate::data::{AggregateResult, Roster};
use crate::file;
use crate::progress::Progress;
use crate::scrape::{self, MultiDayAggregator, Orchestrator, times};
use crate::store::LocationTimeCache;
use crate::surface::{BridgeSurface, MemorySurface, Surface};

#[derive(Parser)]
#[command(
    name = "shift_scrape",
    version = env!("CARGO_PKG_VERSION"),
    about = "Roster, itinerary and train-crew scraper for the shift planning app",
    long_about = None
)]
pub struct Cli {
    /// Bridge of the live app session (host:port)
    #[arg(global = true, long, conflicts_with = "replay")]
    pub bridge: Option<String>,

    /// Replay a recorded scene (JSON) instead of the live app
    #[arg(global = true, long)]
    pub replay: Option<PathBuf>,

    /// Config file (defaults are used when it does not exist)
    #[arg(global = true, long, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Default log level (RUST_LOG overrides)
    #[arg(global = true, long, default_value = "info")]
    pub log_level: String,

    /// Print JSON instead of tables
    #[arg(global = true, long)]
    pub json: bool,

    /// Also write the result as CSV/TSV into this directory
    #[arg(global = true, long)]
    pub export: Option<PathBuf>,

    /// Export as TSV instead of CSV
    #[arg(global = true, long)]
    pub tsv: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read the visible roster (sweeps for locations first if needed)
    Roster {
        /// Open day panels to fill in unknown shift times
        #[arg(long)]
        resolve_times: bool,
    },

    /// Multi-day itinerary with train crews for one person
    Itinerary {
        /// Exact name as shown on the roster
        #[arg(long)]
        name: String,

        /// Number of days, starting with the visible one
        #[arg(long)]
        days: Option<usize>,

        /// Date of the visible day, overriding the app's label (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Reuse a train's crew on later days instead of scraping it again
        #[arg(long)]
        reuse_crews: bool,
    },

    /// Inspect or clear the location/time cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    Show,
    Reset,
}

/// Status lines on stderr.
struct ConsoleProgress {
    total: usize,
}

impl Progress for ConsoleProgress {
    fn begin(&mut self, total: usize) { self.total = total; }
    fn log(&mut self, msg: &str) { eprintln!("{msg}"); }
    fn item_failed(&mut self, idx: usize, why: &str) {
        eprintln!("  [{}/{}] {why}", idx + 1, self.total);
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut opts = AppOptions::load(&cli.config)?;
    crate::log::init(&cli.log_level, &opts.store_dir.0);

    if let Some(dir) = &cli.export {
        opts.export.out_dir = dir.clone();
    }
    if cli.tsv {
        opts.export.format = ExportFormat::Tsv;
    }
    if let Commands::Itinerary { days, reuse_crews, .. } = &cli.command {
        if let Some(n) = days {
            opts.aggregate.window = *n;
        }
        opts.aggregate.reuse_crew_across_days |= *reuse_crews;
    }

    let store = opts.store_dir.0.clone();
    let mut cache = LocationTimeCache::load(&store)?;

    if let Commands::Cache { action } = &cli.command {
        match action {
            CacheAction::Show => print_cache(&cache),
            CacheAction::Reset => {
                cache.reset();
                cache.save(&store)?;
                println!("Cache cleared.");
            }
        }
        return Ok(());
    }

    let surface = open_surface(&cli, &opts)?;
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let cancel = CancellationToken::new();

    let outcome = rt.block_on(async {
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                logf!("Ctrl-C: cancelling");
                on_signal.cancel();
            }
        });
        execute(&cli, surface.as_ref(), &opts, &mut cache, cancel.clone()).await
    });

    // Whatever happened, keep what was learned.
    if let Err(e) = cache.save(&store) {
        loge!("cache not saved: {e}");
    }
    outcome
}

fn open_surface(cli: &Cli, opts: &AppOptions) -> Result<Box<dyn Surface>> {
    match (&cli.bridge, &cli.replay) {
        (Some(addr), _) => Ok(Box::new(BridgeSurface::from_addr(addr, opts.selectors.clone())?)),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)?;
            Ok(Box::new(MemorySurface::from_json(&text)?))
        }
        (None, None) => Err(eyre!("no app to talk to: pass --bridge host:port or --replay scene.json")),
    }
}

async fn execute(
    cli: &Cli,
    surface: &dyn Surface,
    opts: &AppOptions,
    cache: &mut LocationTimeCache,
    cancel: CancellationToken,
) -> Result<()> {
    let mut orch = Orchestrator::new(surface, &opts.timing, &opts.vocab, cancel);
    let mut progress = ConsoleProgress { total: 0 };

    match &cli.command {
        Commands::Roster { resolve_times } => {
            let mut roster = scrape::collect_roster(&mut orch, opts, cache, &mut progress).await?;
            if *resolve_times {
                roster = times::resolve_times(&mut orch, opts, cache, &roster, &mut progress).await?;
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&roster)?);
            } else {
                print_roster(&roster);
            }
            if cli.export.is_some() {
                let path = file::export_roster(&roster, &opts.export)?;
                println!("Wrote {}", path.display());
            }
        }
        Commands::Itinerary { name, start, .. } => {
            if !cache.is_built() {
                scrape::bootstrap::sweep(&mut orch, opts, cache, &mut progress).await?;
            }
            let mut agg = MultiDayAggregator::new(&mut orch, opts, cache, &mut progress);
            let result = agg.run(name, *start).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_itinerary(&result);
            }
            if cli.export.is_some() {
                match file::export_itinerary(&result, &opts.export) {
                    Ok(path) => println!("Wrote {}", path.display()),
                    // the itinerary above is still complete; only the file is missing
                    Err(e) => eprintln!("Export failed: {e}"),
                }
            }
        }
        Commands::Cache { .. } => {}
    }
    Ok(())
}

/* ---------------- Printing ---------------- */

fn print_roster(r: &Roster) {
    println!("{}", r.date_label);
    for p in &r.people {
        let loc = if p.loc_from_cache { join!(&p.loc_name, "*") } else { p.loc_name.clone() };
        let shift = format!("{}-{}", p.shift_start, p.shift_end);
        println!("  {shift:<17} {:<24} {:<4} {:<14} {loc}", p.name, p.badge, p.turn_code);
    }
    let st = r.stats();
    println!(
        "{} people, {} reserve, {} changed, {} overnight, {} without time",
        st.total, st.reserves, st.changed, st.overnight, st.unknown_time
    );
    for (badge, n) in &st.by_badge {
        println!("  {badge:<4} {n}");
    }
}

fn print_itinerary(a: &AggregateResult) {
    println!("{} (captured {})", a.person_name, a.captured_at.format("%Y-%m-%d %H:%M"));
    for d in &a.days {
        if d.not_found {
            println!("{}  not found", d.date);
            continue;
        }
        println!("{}  {}  {}-{}", d.date, d.turn_code, d.shift_start, d.shift_end);
        for seg in &d.segments {
            let to = seg.to.as_deref().unwrap_or("");
            match seg.train_nr() {
                Some(nr) => {
                    println!("    {}-{}  {} → {}  train {nr}", seg.start, seg.end, seg.from, to);
                    match d.crews.get(nr) {
                        Some(crew) => {
                            for g in crew.segments() {
                                let names: Vec<&str> = g.members.iter().map(|m| m.name.as_str()).collect();
                                println!("        {} {}-{} {}: {}", g.from, g.start, g.end, g.to, names.join(", "));
                            }
                        }
                        None => println!("        (no crew)"),
                    }
                }
                None => {
                    let label = match &seg.kind {
                        crate::data::SegmentKind::Activity { label } => label.as_str(),
                        _ => "",
                    };
                    println!("    {}-{}  {} {}  {label}", seg.start, seg.end, seg.from, to);
                }
            }
        }
    }
}

fn print_cache(c: &LocationTimeCache) {
    println!(
        "built: {}, {} location(s), {} time(s)",
        if c.is_built() { "yes" } else { "no" },
        c.location_count(),
        c.time_count()
    );
    for (name, l) in c.locations() {
        println!("  {name:<28} {} {}", l.loc, l.loc_name);
    }
    for ((name, date), t) in c.times() {
        println!("  {name:<28} {date} {}-{}", t.start, t.end);
    }
}
