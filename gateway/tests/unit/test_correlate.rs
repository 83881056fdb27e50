//! Instance correlation tests

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use flowgate::correlate::poller::{await_instance, capture_baseline};
use flowgate::correlate::Target;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::fake_scheduler::{fast_correlator, FakeScheduler};

const TARGET: Target<'static> = Target {
    project: "etl",
    workflow_code: 5,
    workflow_name: "daily",
};

fn instance(id: i64, code: i64) -> Value {
    json!({
        "id": id,
        "processDefinitionCode": code,
        "name": format!("daily-{}", id),
        "state": "RUNNING_EXECUTION",
        "startTime": "2024-05-01 10:00:00"
    })
}

#[tokio::test]
async fn test_baseline_ignores_other_workflows() {
    let scheduler = FakeScheduler::new();
    scheduler.push_page(vec![instance(90, 5), instance(400, 6), instance(88, 5)]);

    let deadline = Instant::now() + Duration::from_secs(1);
    let baseline = capture_baseline(&scheduler, &fast_correlator(), &TARGET, deadline).await;

    assert_eq!(baseline, Some(90));
}

#[tokio::test]
async fn test_baseline_of_empty_listing_is_none() {
    let scheduler = FakeScheduler::new();

    let deadline = Instant::now() + Duration::from_secs(1);
    let baseline = capture_baseline(&scheduler, &fast_correlator(), &TARGET, deadline).await;

    assert_eq!(baseline, None);
}

#[tokio::test]
async fn test_newest_instance_wins_regardless_of_listing_order() {
    for page in [
        vec![instance(100, 5), instance(101, 5), instance(102, 5)],
        vec![instance(102, 5), instance(100, 5), instance(101, 5)],
        vec![instance(101, 5), instance(102, 5), instance(100, 5)],
    ] {
        let scheduler = FakeScheduler::new();
        scheduler.push_page(page);

        let deadline = Instant::now() + Duration::from_secs(1);
        let found = await_instance(
            &scheduler,
            &fast_correlator(),
            &TARGET,
            Some(100),
            deadline,
            tokio::time::sleep,
        )
        .await;

        assert_eq!(found.and_then(|r| r.id), Some(102));
    }
}

#[tokio::test]
async fn test_polls_until_new_instance_appears() {
    let scheduler = FakeScheduler::new();
    scheduler.push_page(vec![instance(100, 5)]);
    scheduler.push_page(vec![instance(100, 5)]);
    scheduler.push_page(vec![instance(100, 5), instance(101, 5)]);

    let deadline = Instant::now() + Duration::from_secs(1);
    let found = await_instance(
        &scheduler,
        &fast_correlator(),
        &TARGET,
        Some(100),
        deadline,
        tokio::time::sleep,
    )
    .await;

    assert_eq!(found.and_then(|r| r.id), Some(101));
    assert_eq!(scheduler.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gives_up_after_attempts() {
    let scheduler = FakeScheduler::new();
    scheduler.push_page(vec![instance(100, 5)]);
    let options = fast_correlator();

    let sleeps = Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorded = sleeps.clone();
    let deadline = Instant::now() + Duration::from_secs(5);
    let found = await_instance(&scheduler, &options, &TARGET, Some(100), deadline, |wait| {
        recorded.lock().unwrap().push(wait);
        async {}
    })
    .await;

    assert!(found.is_none());
    assert_eq!(
        scheduler.list_calls.load(Ordering::SeqCst),
        options.attempts as usize
    );
    assert_eq!(sleeps.lock().unwrap().len(), options.attempts as usize - 1);
}

#[tokio::test]
async fn test_deadline_bounds_slow_listings() {
    let scheduler = FakeScheduler::new();
    scheduler.push_page(vec![instance(101, 5)]);
    *scheduler.list_delay.lock().unwrap() = Some(Duration::from_millis(500));

    let started = Instant::now();
    let deadline = started + Duration::from_millis(50);
    let found = await_instance(
        &scheduler,
        &fast_correlator(),
        &TARGET,
        Some(100),
        deadline,
        tokio::time::sleep,
    )
    .await;

    assert!(found.is_none());
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn test_name_match_when_code_is_missing() {
    let scheduler = FakeScheduler::new();
    scheduler.push_page(vec![
        json!({"id": 103, "name": "daily-3-20240501"}),
        json!({"id": 104, "name": "dailyreport-1-20240501"}),
    ]);

    let deadline = Instant::now() + Duration::from_secs(1);
    let found = await_instance(
        &scheduler,
        &fast_correlator(),
        &TARGET,
        Some(100),
        deadline,
        tokio::time::sleep,
    )
    .await;

    assert_eq!(found.and_then(|r| r.id), Some(103));
}
