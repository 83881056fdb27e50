//! Synchronization and release tests

use std::sync::Arc;
use std::time::Duration;

use flowgate::errors::GatewayError;
use flowgate::models::workflow::{ReleaseState, TaskKind};
use gateway_api::{ReleaseWorkflowRequest, TaskRelationPayload};
use tokio::time::Instant;

use crate::fake_scheduler::{gateway_with, FakeScheduler};
use crate::sync_request;

fn release(state: &str) -> ReleaseWorkflowRequest {
    ReleaseWorkflowRequest {
        project_name: None,
        workflow_name: None,
        release_state: state.to_string(),
    }
}

#[tokio::test]
async fn test_sync_creates_workflow_and_caches_definition() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let response = gateway.synchronize(0, sync_request("daily")).await.unwrap();

    assert_eq!(response.workflow_code, 1000);
    assert_eq!(response.task_count, 2);
    assert_eq!(response.dropped_relations, 0);
    assert!(gateway.definition_cache().get(1000).is_some());

    let submitted = scheduler.last_submitted();
    assert_eq!(submitted.code, None);
    assert_eq!(submitted.project, "etl");
    assert_eq!(submitted.release_state, ReleaseState::Offline);
    assert_eq!(submitted.edges(), vec![(0, 1), (1, 2)]);
    match &submitted.task(2).unwrap().kind {
        TaskKind::Sql {
            datasource_name, ..
        } => assert_eq!(datasource_name, "warehouse"),
        other => panic!("expected a SQL task, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sync_with_existing_code_updates_in_place() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let response = gateway.synchronize(4242, sync_request("daily")).await.unwrap();

    assert_eq!(response.workflow_code, 4242);
    assert_eq!(scheduler.last_submitted().code, Some(4242));
    assert!(gateway.definition_cache().get(4242).is_some());
}

#[tokio::test]
async fn test_sync_drops_relations_with_unknown_tasks() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let mut request = sync_request("daily");
    request.relations.push(TaskRelationPayload {
        pre_task_code: 2,
        post_task_code: 99,
    });

    let response = gateway.synchronize(0, request).await.unwrap();

    assert_eq!(response.task_count, 2);
    assert_eq!(response.dropped_relations, 1);
    assert_eq!(scheduler.last_submitted().edges(), vec![(0, 1), (1, 2)]);
}

#[tokio::test]
async fn test_sync_rejects_duplicate_task_codes() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let mut request = sync_request("daily");
    request.tasks[1].code = 1;

    let result = gateway.synchronize(0, request).await;

    assert!(matches!(result, Err(GatewayError::ValidationError(_))));
    assert!(scheduler.submitted.lock().unwrap().is_empty());
    assert!(gateway.definition_cache().is_empty());
}

#[tokio::test]
async fn test_release_resubmits_cached_definition() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let code = gateway
        .synchronize(0, sync_request("daily"))
        .await
        .unwrap()
        .workflow_code;
    let original = scheduler.last_submitted();

    let response = gateway.release(code, release("online")).await.unwrap();
    assert_eq!(response.workflow_code, code);

    let online = scheduler.last_submitted();
    assert_eq!(online.code, Some(code));
    assert_eq!(online.release_state, ReleaseState::Online);
    assert_eq!(online.task_count(), original.task_count());
    assert_eq!(online.edges(), original.edges());
    assert_eq!(online.locations, original.locations);

    gateway.release(code, release("OFFLINE")).await.unwrap();
    let offline = scheduler.last_submitted();
    assert_eq!(offline.release_state, ReleaseState::Offline);
    assert_eq!(offline.edges(), original.edges());

    let cached = gateway.definition_cache().get(code).unwrap();
    assert_eq!(cached.request.release_state.as_deref(), Some("OFFLINE"));
}

#[tokio::test]
async fn test_release_of_unknown_workflow_is_not_found() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let result = gateway.release(31337, release("ONLINE")).await;

    assert!(matches!(result, Err(GatewayError::NotFound(_))));
    assert!(scheduler.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_release_rejects_unknown_state() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);
    let code = gateway
        .synchronize(0, sync_request("daily"))
        .await
        .unwrap()
        .workflow_code;

    let result = gateway.release(code, release("PAUSED")).await;

    assert!(matches!(result, Err(GatewayError::ValidationError(_))));
    assert_eq!(scheduler.submitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_creates_do_not_wait_on_each_other() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.delay_creates([Duration::from_millis(200); 4]);
    let gateway = gateway_with(scheduler.clone(), 16);

    let started = Instant::now();
    let (a, b, c, d) = tokio::join!(
        gateway.synchronize(0, sync_request("a")),
        gateway.synchronize(0, sync_request("b")),
        gateway.synchronize(0, sync_request("c")),
        gateway.synchronize(0, sync_request("d")),
    );

    assert!(started.elapsed() < Duration::from_millis(600));
    let mut codes: Vec<i64> = [a, b, c, d]
        .into_iter()
        .map(|r| r.unwrap().workflow_code)
        .collect();
    codes.sort();
    assert_eq!(codes, vec![1000, 1001, 1002, 1003]);
    assert_eq!(gateway.definition_cache().len(), 4);
}

#[tokio::test]
async fn test_updates_of_one_workflow_apply_in_arrival_order() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.delay_creates([Duration::from_millis(200)]);
    let gateway = gateway_with(scheduler.clone(), 16);

    let first = gateway.synchronize(4242, sync_request("first"));
    let second = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        gateway.synchronize(4242, sync_request("second")).await
    };
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    let names: Vec<String> = scheduler
        .submitted
        .lock()
        .unwrap()
        .iter()
        .map(|wf| wf.name.clone())
        .collect();
    assert_eq!(names, vec!["first", "second"]);

    let cached = gateway.definition_cache().get(4242).unwrap();
    assert_eq!(cached.request.workflow_name, "second");
}
