//! Scoring benchmarks for vigil-core

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;
use vigil_core::event::{EventType, FileEvent};
use vigil_core::score::score;

fn event(event_type: EventType, path: &str, external: bool) -> FileEvent {
    let path = PathBuf::from(path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    FileEvent {
        event_type,
        path,
        name,
        extension,
        is_external_drive: external,
        risk_score: 0,
        actor: "bench".to_string(),
        created_at: Utc::now(),
    }
}

fn bench_score(c: &mut Criterion) {
    let plain = event(EventType::Modify, "/home/bench/notes.md", false);
    let worst_case = event(
        EventType::Delete,
        "/media/usb0/tmp/confidential_bank_password_backup.exe",
        true,
    );

    c.bench_function("score_plain_event", |b| {
        b.iter(|| score(black_box(&plain)));
    });

    c.bench_function("score_every_rule_firing", |b| {
        b.iter(|| score(black_box(&worst_case)));
    });
}

fn bench_score_batch(c: &mut Criterion) {
    let events: Vec<FileEvent> = (0..1000)
        .map(|i| {
            event(
                EventType::Create,
                &format!("/home/bench/project/file_{i}.txt"),
                i % 7 == 0,
            )
        })
        .collect();

    c.bench_function("score_1k_events", |b| {
        b.iter(|| {
            let total: u32 = events.iter().map(|e| u32::from(score(e))).sum();
            black_box(total)
        });
    });
}

criterion_group!(benches, bench_score, bench_score_batch);
criterion_main!(benches);
