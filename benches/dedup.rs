//! Duplicate detection benchmarks.
//!
//! Run with: `cargo bench --bench dedup`
//!
//! Detection is pairwise over one owner's library, so cost grows with n².

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use content_access_kernel::dedup::title_similarity;
use content_access_kernel::{
    Content, ContentId, ContentStore, ContentType, DuplicateField, DuplicateQuery,
    InMemoryContentStore, SimilarityMatcher, UserId, Visibility,
};
use uuid::Uuid;

const TOPICS: [&str; 8] = [
    "Lambda", "DynamoDB", "S3", "EKS", "CloudFormation", "Bedrock", "IAM", "Step Functions",
];

/// Create an owner's library of `n` items with overlapping titles and tags.
fn build_library(n: usize) -> (Arc<InMemoryContentStore>, UserId) {
    let owner = UserId::new(Uuid::from_u128(1));
    let store = InMemoryContentStore::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    runtime.block_on(async {
        for i in 0..n {
            let topic = TOPICS[i % TOPICS.len()];
            let content = Content::new(
                owner,
                format!("Getting started with {topic} part {}", i / TOPICS.len()),
                ContentType::Blog,
                Visibility::Public,
            )
            .with_id(ContentId::new(Uuid::from_u128(i as u128 + 100)))
            .with_tags([topic.to_lowercase(), "aws".to_string()])
            .with_url(format!("https://example.com/{i}"));
            store.insert(content).await.unwrap();
        }
    });

    (Arc::new(store), owner)
}

fn bench_title_similarity(c: &mut Criterion) {
    c.bench_function("title_similarity", |b| {
        b.iter(|| {
            title_similarity(
                black_box("AWS Lambda Deep Dive"),
                black_box("AWS Lambda deep dive tutorial"),
            )
        })
    });
}

fn bench_find_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_duplicates");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    for size in [10usize, 50, 200] {
        let (store, owner) = build_library(size);
        let matcher = SimilarityMatcher::new(store);
        let query = DuplicateQuery::new(owner)
            .with_threshold(0.6)
            .with_fields([DuplicateField::Title, DuplicateField::Tags, DuplicateField::Urls]);

        group.throughput(Throughput::Elements((size * (size - 1) / 2) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &query, |b, query| {
            b.iter(|| runtime.block_on(matcher.find_duplicates(black_box(query))).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_title_similarity, bench_find_duplicates);
criterion_main!(benches);
