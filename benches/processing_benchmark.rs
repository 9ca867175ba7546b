use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::NaiveDate;
use station_summarizer::analyzers::{SimilarityRanker, SpatialIndex};
use station_summarizer::models::{
    DailyObservation, EnrichedStation, PercentileLevels, StationCatalogEntry,
};
use station_summarizer::processors::{quantiles, PercentileSummarizer};
use station_summarizer::readers::RecordParser;

// Create test data for benchmarking
fn create_observations(days: usize) -> Vec<DailyObservation> {
    let base_date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    (0..days)
        .map(|day| {
            let date = base_date + chrono::Duration::days(day as i64);
            let seasonal = ((day % 365) as f64 / 365.0 * std::f64::consts::TAU).sin();
            let base = (150.0 + 120.0 * seasonal) as i32;
            let tmin = if day % 17 == 0 { None } else { Some(base - 60) };
            let tmax = if day % 23 == 0 { None } else { Some(base + 60) };
            DailyObservation::new(date, tmin, tmax)
        })
        .collect()
}

fn create_csv(days: usize) -> String {
    let mut csv = String::from("STATION,DATE,LATITUDE,LONGITUDE,TMAX,TMIN\n");
    for obs in create_observations(days) {
        csv.push_str(&format!(
            "USW00000001,{},40.0,-100.0,{},{}\n",
            obs.date,
            obs.max_temperature_tenths_c.map(|v| v.to_string()).unwrap_or_default(),
            obs.min_temperature_tenths_c.map(|v| v.to_string()).unwrap_or_default(),
        ));
    }
    csv
}

fn create_stations(count: usize) -> Vec<EnrichedStation> {
    let summarizer = PercentileSummarizer::new(PercentileLevels::default(), 3);
    let now = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    let observations = create_observations(3 * 365);
    let summary = summarizer.summarize(&observations, now);

    (0..count)
        .map(|i| {
            let lat = -60.0 + (i * 7919 % 12000) as f64 / 100.0;
            let lon = -180.0 + (i * 104_729 % 36000) as f64 / 100.0;
            let mut summary = summary.clone();
            for v in summary.low_values_c.iter_mut().flatten() {
                *v += (i % 13) as f64 * 0.3;
            }
            EnrichedStation::new(
                StationCatalogEntry::new(format!("S{:06}", i), lat, lon, 0.0, ""),
                summary,
            )
        })
        .collect()
}

fn benchmark_record_parser(c: &mut Criterion) {
    let csv = create_csv(10 * 365);
    let parser = RecordParser::new();

    c.bench_function("record_parser_10y", |b| {
        b.iter(|| {
            let rows = parser.parse("USW00000001", black_box(csv.as_bytes()));
            black_box(rows.map(|r| r.len()).unwrap_or(0))
        })
    });
}

fn benchmark_summarizer(c: &mut Criterion) {
    let observations = create_observations(30 * 365);
    let summarizer = PercentileSummarizer::new(PercentileLevels::default(), 3);
    let now = NaiveDate::from_ymd_opt(2050, 12, 31).unwrap();

    c.bench_function("summarize_30y_history", |b| {
        b.iter(|| black_box(summarizer.summarize(black_box(&observations), now)))
    });
}

fn benchmark_quantiles(c: &mut Criterion) {
    let mut values: Vec<i32> = (0..100_000).map(|i| (i * 7919 % 1201) - 600).collect();
    values.sort_unstable();
    let levels = PercentileLevels::default();

    c.bench_function("quantiles_100k", |b| {
        b.iter(|| black_box(quantiles(black_box(&values), levels.as_slice())))
    });
}

fn benchmark_spatial_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_by_size");

    for &size in &[1_000, 10_000, 50_000] {
        let index = SpatialIndex::new(create_stations(size));
        group.bench_with_input(BenchmarkId::new("stations", size), &size, |b, _| {
            b.iter(|| black_box(index.nearest(black_box(37.8), black_box(-122.4), 10).len()))
        });
    }
    group.finish();
}

fn benchmark_similarity(c: &mut Criterion) {
    let stations = create_stations(10_000);
    let ranker = SimilarityRanker::new(&PercentileLevels::default()).unwrap();

    c.bench_function("similarity_rank_10k", |b| {
        b.iter(|| black_box(ranker.rank(&stations[0], &stations).len()))
    });
}

criterion_group!(
    benches,
    benchmark_record_parser,
    benchmark_summarizer,
    benchmark_quantiles,
    benchmark_spatial_index,
    benchmark_similarity
);
criterion_main!(benches);
