use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

use showreel_recommender::engine::{browse, BrowseSelection, Recommender};
use showreel_recommender::{normalize, CatalogSnapshot, Query, RuleSettings, Tag, TaxonomyKind, Video, VideoRecord};

const TYPES: [&str; 5] = ["Publicité", "Portrait", "Spot", "Tutoriel", "Aftermovie"];
const KEYWORDS: [&str; 8] = ["café", "restaurant", "drone", "interview", "usine", "sport", "mode", "luxe"];

/// Synthetic catalog with a spread of tags, budgets and durations
fn catalog(size: usize) -> CatalogSnapshot {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let videos = (0..size)
        .map(|i| {
            let record = VideoRecord {
                id: format!("v{}", i),
                title: format!("Video {}", i),
                playback_id: if i % 17 == 0 { format!("pending:{}", i) } else { format!("mux-{}", i) },
                duration: Some(10 + (i as u64 * 13) % 400),
                budget_min: Some((i as u64 * 1_500) % 40_000),
                budget_max: None,
                featured: i % 11 == 0,
                thumbnail_time: None,
                created_at: base + Duration::hours(i as i64),
            };
            let tags = vec![
                Tag::new(format!("type-{}", i % 5), TaxonomyKind::Type, TYPES[i % 5]),
                Tag::new(format!("kw-{}", i % 8), TaxonomyKind::Keyword, KEYWORDS[i % 8]),
                Tag::new(format!("kw-{}", (i + 3) % 8), TaxonomyKind::Keyword, KEYWORDS[(i + 3) % 8]),
                Tag::new("obj-promo", TaxonomyKind::Objectif, "Promouvoir"),
            ];
            Video::new(record, tags)
        })
        .collect();
    CatalogSnapshot::from_videos(videos)
}

/// Benchmark a full recommendation on the fallback keyword path
fn bench_recommend(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let recommender = Recommender::default();
    let settings = RuleSettings::default();
    let snapshot = catalog(2_000);
    let query = Query::new()
        .with_objectives(["promotion"])
        .with_budget("5000-10000")
        .with_durations(["short", "standard"])
        .with_description("un spot pour un restaurant filmé au drone");

    c.bench_function("recommend_2000", |b| {
        b.iter(|| rt.block_on(recommender.recommend(black_box(&snapshot), black_box(&query), &settings)))
    });
}

/// Benchmark one facet toggle in the browsing view
fn bench_browse(c: &mut Criterion) {
    let snapshot = catalog(2_000);
    let selection = BrowseSelection::new()
        .with_tag(TaxonomyKind::Keyword, "drone")
        .with_tag(TaxonomyKind::Type, "Spot")
        .with_budget("10000-20000");

    c.bench_function("browse_2000", |b| b.iter(|| browse(black_box(&snapshot), black_box(&selection))));
}

/// Benchmark text normalization
fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize", |b| {
        b.iter(|| normalize(black_box("  Vidéo PROMO pour un Café-Restaurant à Saint-Étienne ! ")))
    });
}

criterion_group!(benches, bench_recommend, bench_browse, bench_normalize);
criterion_main!(benches);
