//! Crawl orchestrator tests: idempotent re-crawls, per-source failure
//! isolation, racing inserts, deadline and repository-failure behavior.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{candidate, test_config, FailingSource, MemoryRepository, StaticSource};
use crawler_core::{
    ContentHash, Crawler, InsertOutcome, ListingRepository, NewJobRecord, RunReporter, RunResults,
    SourceRegistry,
};

#[tokio::test]
async fn idempotent_recrawl_creates_no_duplicates() {
    let repo = Arc::new(MemoryRepository::new());
    let registry = Arc::new(SourceRegistry::new(vec![Arc::new(StaticSource::new(
        "greenhouse:example",
        vec![
            candidate("Grade 5 Teacher", "Example School", "https://x/1"),
            candidate("School Nurse", "Example School", "https://x/2"),
        ],
    ))]));
    let crawler = Crawler::new(Arc::clone(&repo), registry, &test_config());

    let first = crawler.run(None).await.unwrap();
    assert_eq!(first[0].jobs_found, 2);
    assert_eq!(first[0].jobs_new, 2);
    assert_eq!(first[0].jobs_skipped, 0);

    let second = crawler.run(None).await.unwrap();
    assert_eq!(second[0].jobs_new, 0);
    assert_eq!(second[0].jobs_skipped, 2);

    // Same two records, no duplicates, one audit document per run.
    assert_eq!(repo.job_count(), 2);
    let runs = repo.runs();
    assert_eq!(runs.len(), 2);
    let json = serde_json::to_value(&runs[0].results).unwrap();
    assert_eq!(json["type"], "crawl");
}

#[tokio::test]
async fn failing_source_does_not_abort_the_run() {
    let repo = Arc::new(MemoryRepository::new());
    let registry = Arc::new(SourceRegistry::new(vec![
        Arc::new(FailingSource::new("greenhouse:down")),
        Arc::new(StaticSource::new(
            "lever:up",
            vec![
                candidate("Math Teacher", "Up School", "https://up/1"),
                candidate("Art Teacher", "Up School", "https://up/2"),
                candidate("Librarian", "Up School", "https://up/3"),
            ],
        )),
    ]));
    let crawler = Crawler::new(Arc::clone(&repo), registry, &test_config());

    let results = crawler.run(None).await.unwrap();

    // Results come back in registry order: the failed source reports zeros.
    assert_eq!(results[0].source, "greenhouse:down");
    assert_eq!(results[0].jobs_new, 0);
    assert_eq!(results[1].source, "lever:up");
    assert_eq!(results[1].jobs_new, 3);

    let runs = repo.runs();
    assert_eq!(runs.len(), 1);
    match &runs[0].results {
        RunResults::Crawl {
            jobs_new,
            crawl_errors,
            ..
        } => {
            assert_eq!(*jobs_new, 3);
            assert_eq!(crawl_errors.len(), 1);
            assert!(crawl_errors[0].starts_with("greenhouse:down:"));
        }
        other => panic!("expected crawl results, got {other:?}"),
    }
}

#[tokio::test]
async fn racing_identical_inserts_store_one_record() {
    let repo = Arc::new(MemoryRepository::new());
    let hash = ContentHash::of_listing("Grade 5 Teacher", "Example School", "https://x/1");

    let mut handles = Vec::new();
    for _ in 0..2 {
        let repo = Arc::clone(&repo);
        let record = NewJobRecord::auto_crawled(
            candidate("Grade 5 Teacher", "Example School", "https://x/1"),
            hash.clone(),
            "greenhouse:example",
        );
        handles.push(tokio::spawn(async move {
            repo.insert_if_absent(record).await.unwrap()
        }));
    }

    let mut inserted = 0;
    let mut duplicate = 0;
    for handle in handles {
        match handle.await.unwrap() {
            InsertOutcome::Inserted(_) => inserted += 1,
            InsertOutcome::Duplicate(_) => duplicate += 1,
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(duplicate, 1);
    assert_eq!(repo.job_count(), 1);
}

#[tokio::test]
async fn exhausted_deadline_still_persists_a_truthful_summary() {
    let repo = Arc::new(MemoryRepository::new());
    let registry = Arc::new(SourceRegistry::new(vec![Arc::new(StaticSource::new(
        "lever:slow",
        vec![candidate("Math Teacher", "Slow School", "https://slow/1")],
    ))]));

    let mut config = test_config();
    config.run_deadline = Duration::ZERO;
    let crawler = Crawler::new(Arc::clone(&repo), registry, &config);

    let results = crawler.run(None).await.unwrap();
    assert_eq!(results[0].jobs_found, 0);
    assert_eq!(repo.job_count(), 0);

    let runs = repo.runs();
    assert_eq!(runs.len(), 1);
    match &runs[0].results {
        RunResults::Crawl { crawl_errors, .. } => {
            assert_eq!(crawl_errors.len(), 1);
            assert!(crawl_errors[0].contains("deadline"));
        }
        other => panic!("expected crawl results, got {other:?}"),
    }
}

#[tokio::test]
async fn repository_failure_is_fatal_but_leaves_a_partial_record() {
    let repo = Arc::new(MemoryRepository::new());
    repo.fail_job_writes.store(true, Ordering::SeqCst);

    let registry = Arc::new(SourceRegistry::new(vec![Arc::new(StaticSource::new(
        "greenhouse:example",
        vec![candidate("Grade 5 Teacher", "Example School", "https://x/1")],
    ))]));
    let crawler = Crawler::new(Arc::clone(&repo), registry, &test_config());

    let err = crawler.run(None).await.unwrap_err();
    assert!(err.to_string().contains("repository failure"));

    // Best-effort partial audit record was still written.
    assert_eq!(repo.runs().len(), 1);
}

#[tokio::test]
async fn run_history_is_reverse_chronological_and_bounded() {
    let repo = Arc::new(MemoryRepository::new());
    let registry = Arc::new(SourceRegistry::new(vec![Arc::new(StaticSource::new(
        "greenhouse:example",
        vec![candidate("Grade 5 Teacher", "Example School", "https://x/1")],
    ))]));
    let crawler = Crawler::new(Arc::clone(&repo), registry, &test_config());

    crawler.run(None).await.unwrap();
    crawler.run(None).await.unwrap();
    crawler.run(None).await.unwrap();

    let reporter = RunReporter::new(Arc::clone(&repo));
    let history = reporter.recent(2).await.unwrap();

    // Newest first, capped at the requested limit.
    assert_eq!(history.len(), 2);
    assert!(history[0].started_at >= history[1].started_at);

    let all = reporter.recent(10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, history[0].id);
}

#[tokio::test]
async fn max_pages_caps_listings_per_source() {
    let repo = Arc::new(MemoryRepository::new());
    let registry = Arc::new(SourceRegistry::new(vec![Arc::new(StaticSource::new(
        "lever:big",
        vec![
            candidate("Teacher A", "Big School", "https://big/1"),
            candidate("Teacher B", "Big School", "https://big/2"),
            candidate("Teacher C", "Big School", "https://big/3"),
        ],
    ))]));
    let crawler = Crawler::new(Arc::clone(&repo), registry, &test_config());

    let results = crawler.run(Some(2)).await.unwrap();
    assert_eq!(results[0].jobs_found, 2);
    assert_eq!(results[0].jobs_new, 2);
    assert_eq!(repo.job_count(), 2);
}
