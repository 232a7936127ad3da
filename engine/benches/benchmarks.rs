//! Performance benchmarks for fieldsync-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fieldsync_engine::{
    FieldKey, FieldSynchronizer, Patch, SaveOutcome, SaveRequest, SaveResponse, SyncConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Card {
    Title,
    Description,
    Due,
    Cover,
    Archived,
    Position,
    Labels,
    Members,
}

impl FieldKey for Card {
    const ALL: &'static [Self] = &[
        Card::Title,
        Card::Description,
        Card::Due,
        Card::Cover,
        Card::Archived,
        Card::Position,
        Card::Labels,
        Card::Members,
    ];

    fn name(self) -> &'static str {
        match self {
            Card::Title => "title",
            Card::Description => "description",
            Card::Due => "due",
            Card::Cover => "cover",
            Card::Archived => "archived",
            Card::Position => "position",
            Card::Labels => "labels",
            Card::Members => "members",
        }
    }
}

fn create_synchronizer() -> FieldSynchronizer<Card> {
    let snapshot: Patch<Card> = Card::ALL.iter().map(|k| (*k, json!(null))).collect();
    FieldSynchronizer::new("card-1", snapshot, SyncConfig::default())
        .expect("snapshot covers every field")
}

fn bench_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("edits");

    group.bench_function("apply_edit", |b| {
        let mut sync = create_synchronizer();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            sync.apply_edit(black_box(Card::Title), json!(n), black_box(n))
        })
    });

    group.bench_function("status_line", |b| {
        let mut sync = create_synchronizer();
        for (i, key) in Card::ALL.iter().enumerate() {
            sync.apply_edit(*key, json!(i), 0);
        }
        b.iter(|| black_box(sync.status_line()))
    });

    group.finish();
}

fn bench_flush_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush_cycle");

    for size in [1usize, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::new("edit_flush_settle", size), size, |b, &size| {
            let mut sync = create_synchronizer();
            let mut now = 0u64;
            b.iter(|| {
                now += 1;
                for key in &Card::ALL[..size] {
                    sync.apply_edit(*key, json!(now), now);
                }
                if let Some(request) = sync.flush_now(now) {
                    let outcome = SaveOutcome::Saved(request.patch.clone());
                    let settlement = sync.complete_flush(request.ticket, outcome, now);
                    black_box(settlement).ok();
                }
            })
        });
    }

    group.bench_function("superseded_settle", |b| {
        let mut sync = create_synchronizer();
        let mut now = 0u64;
        b.iter(|| {
            now += 1;
            sync.apply_edit(Card::Title, json!(now), now);
            let first = sync.flush_now(now);
            sync.apply_edit(Card::Title, json!(now + 1), now);
            if let Some(request) = first {
                let outcome = SaveOutcome::Saved(request.patch.clone());
                if let Ok(settlement) = sync.complete_flush(request.ticket, outcome, now) {
                    if let Some(next) = settlement.next {
                        let outcome = SaveOutcome::Saved(next.patch.clone());
                        black_box(sync.complete_flush(next.ticket, outcome, now)).ok();
                    }
                }
            }
        })
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let patch: Patch<Card> = Card::ALL
        .iter()
        .map(|k| (*k, json!({"value": k.name(), "tags": [1, 2, 3]})))
        .collect();

    group.bench_function("save_request_to_json", |b| {
        let request = SaveRequest {
            patch: patch.clone(),
        };
        b.iter(|| serde_json::to_string(black_box(&request)))
    });

    group.bench_function("save_response_from_json", |b| {
        let json = serde_json::to_string(&SaveResponse::saved(patch.clone()))
            .expect("serializable response");
        b.iter(|| serde_json::from_str::<SaveResponse<Card>>(black_box(&json)))
    });

    group.bench_function("view_to_json", |b| {
        let mut sync = create_synchronizer();
        sync.apply_edit(Card::Labels, json!(["bug"]), 0);
        b.iter(|| serde_json::to_string(black_box(&sync.view())))
    });

    group.finish();
}

criterion_group!(benches, bench_edits, bench_flush_cycle, bench_serialization);
criterion_main!(benches);
