// tests/export_e2e.rs
use std::fs;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use shift_scrape::config::options::{AppOptions, ExportFormat};
use shift_scrape::csv::parse_rows;
use shift_scrape::file::{self, ExportError};
use shift_scrape::progress::NullProgress;
use shift_scrape::scrape::{self, MultiDayAggregator, Orchestrator};
use shift_scrape::store::LocationTimeCache;
use shift_scrape::surface::MemorySurface;

fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("shift_scrape_e2e_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

fn surface() -> MemorySurface {
    MemorySurface::from_json(include_str!("../demos/scene.json")).unwrap()
}

#[tokio::test(start_paused = true)]
async fn itinerary_csv_has_a_row_per_crew_member() {
    let s = surface();
    let mut opts = AppOptions::default();
    opts.export.out_dir = tmp_dir("itinerary");
    let mut cache = LocationTimeCache::new();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());
    let result = MultiDayAggregator::new(&mut orch, &opts, &mut cache, &mut NullProgress)
        .run("Anna Svensson", None)
        .await
        .unwrap();

    let path = file::export_itinerary(&result, &opts.export).unwrap();
    let fname = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(fname.starts_with("itinerary_"));
    assert!(fname.ends_with("_2025-03-10.csv"));

    let rows = parse_rows(&fs::read_to_string(&path).unwrap(), ',');
    assert_eq!(rows[0][0], "Date");
    // 1045 ×3 crew, Rast, 1052 ×2 crew, the missing day, 1045 ×2 crew
    assert_eq!(rows.len(), 1 + 9);

    let missing: Vec<&Vec<String>> = rows.iter().filter(|r| r.get(3).map(String::as_str) == Some("not found")).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0][0], "2025-03-11");

    let crew: Vec<&str> = rows.iter().skip(1).filter_map(|r| r.get(9)).map(String::as_str).collect();
    assert!(crew.contains(&"Sara Holm"));
    assert!(crew.contains(&"Olle Nord"));
    assert!(rows.iter().any(|r| r.get(7).map(String::as_str) == Some("Rast")));
}

#[tokio::test(start_paused = true)]
async fn roster_tsv_without_headers() {
    let s = surface();
    let mut opts = AppOptions::default();
    opts.export.out_dir = tmp_dir("roster");
    opts.export.format = ExportFormat::Tsv;
    opts.export.include_headers = false;
    let mut cache = LocationTimeCache::new();
    cache.mark_built();
    let mut orch = Orchestrator::new(&s, &opts.timing, &opts.vocab, CancellationToken::new());
    let roster = scrape::collect_roster(&mut orch, &opts, &mut cache, &mut NullProgress).await.unwrap();

    let path = file::export_roster(&roster, &opts.export).unwrap();
    assert!(path.to_string_lossy().ends_with("roster_2025-03-10.tsv"));

    let rows = parse_rows(&fs::read_to_string(&path).unwrap(), '\t');
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "Anna Svensson");
    assert_eq!(rows[0][3], "51284A");
    assert_eq!(rows[0][12], "1045");
    assert_eq!(rows[1][0], "Erik Berg");
    assert_eq!(rows[1][9], "unknown");
}

#[test]
fn out_dir_that_is_a_file_is_refused() {
    let dir = tmp_dir("not_a_dir");
    let blocker = dir.join("out");
    fs::write(&blocker, "x").unwrap();

    let mut opts = AppOptions::default();
    opts.export.out_dir = blocker.clone();
    let roster = shift_scrape::data::Roster::default();
    match file::export_roster(&roster, &opts.export) {
        Err(ExportError::NotADirectory(p)) => assert_eq!(p, blocker),
        other => panic!("expected NotADirectory, got {other:?}"),
    }
}
