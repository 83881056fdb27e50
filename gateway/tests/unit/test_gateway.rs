//! Gateway facade tests

use std::sync::atomic::Ordering;
use std::sync::Arc;

use dolphin_api::{DatasourceRecord, TaskInstanceRecord};
use flowgate::errors::GatewayError;
use flowgate::scheduler::DatasourceFilter;
use flowgate::services::gateway::{DEGRADED_START_MESSAGE, START_MESSAGE};
use gateway_api::{
    DeleteWorkflowRequest, EnsureWorkflowRequest, GetInstanceLogRequest, GetInstanceRequest,
    ListInstancesRequest, QueryProjectRequest, StartWorkflowRequest,
};
use serde_json::{json, Value};

use crate::fake_scheduler::{gateway_with, FakeScheduler, PROJECT_CODE};
use crate::sync_request;

fn instance(id: i64, code: i64) -> Value {
    json!({
        "id": id,
        "processDefinitionCode": code,
        "processDefinitionName": "daily",
        "state": "SUCCESS",
        "startTime": "2024-05-01 10:00:00",
        "endTime": "2024-05-01 10:01:05",
        "runTimes": 1,
        "host": "worker-1:1234",
        "commandType": "START_PROCESS"
    })
}

fn start_request(name: &str) -> StartWorkflowRequest {
    StartWorkflowRequest {
        project_name: Some("etl".to_string()),
        workflow_name: Some(name.to_string()),
        ..Default::default()
    }
}

// ================================== START ======================================= //

#[tokio::test]
async fn test_start_returns_correlated_instance() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.resolve_to(1000);
    scheduler.push_page(vec![instance(100, 1000)]);
    scheduler.push_page(vec![instance(100, 1000)]);
    scheduler.push_page(vec![instance(101, 1000), instance(100, 1000)]);
    let gateway = gateway_with(scheduler.clone(), 16);

    let response = gateway.start(1000, start_request("daily")).await.unwrap();

    assert_eq!(response.instance_id.as_deref(), Some("101"));
    assert_eq!(response.message, START_MESSAGE);

    let starts = scheduler.starts.lock().unwrap();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].workflow_code, 1000);
    assert_eq!(starts[0].project, "etl");
    assert_eq!(starts[0].tenant, "default");
}

#[tokio::test]
async fn test_start_without_visible_instance_degrades() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.resolve_to(1000);
    scheduler.push_page(vec![instance(100, 1000)]);
    let gateway = gateway_with(scheduler.clone(), 16);

    let response = gateway.start(1000, start_request("daily")).await.unwrap();

    assert_eq!(response.instance_id, None);
    assert_eq!(response.message, DEGRADED_START_MESSAGE);
    assert_eq!(scheduler.starts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_start_proceeds_when_name_resolves_to_other_code() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.resolve_to(999);
    scheduler.push_page(vec![]);
    scheduler.push_page(vec![instance(7, 1000)]);
    let gateway = gateway_with(scheduler.clone(), 16);

    let response = gateway.start(1000, start_request("daily")).await.unwrap();

    assert_eq!(response.instance_id.as_deref(), Some("7"));
    assert_eq!(scheduler.starts.lock().unwrap()[0].workflow_code, 1000);
}

#[tokio::test]
async fn test_start_of_unknown_workflow_is_not_found() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let result = gateway.start(1000, start_request("daily")).await;

    assert!(matches!(result, Err(GatewayError::NotFound(_))));
    assert!(scheduler.starts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_in_unknown_project_is_not_found() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.resolve_to(1000);
    let gateway = gateway_with(scheduler.clone(), 16);

    let mut request = start_request("daily");
    request.project_name = Some("missing".to_string());
    let result = gateway.start(1000, request).await;

    assert!(matches!(result, Err(GatewayError::NotFound(_))));
    assert!(scheduler.starts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_uses_cached_name_and_tenant() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let mut request = sync_request("daily");
    request.tenant_code = Some("analytics".to_string());
    let code = gateway.synchronize(0, request).await.unwrap().workflow_code;
    scheduler.resolve_to(code);

    let response = gateway
        .start(
            code,
            StartWorkflowRequest {
                project_name: Some("etl".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(response.message, DEGRADED_START_MESSAGE);
    assert_eq!(scheduler.starts.lock().unwrap()[0].tenant, "analytics");
}

#[tokio::test]
async fn test_start_requires_a_workflow_name() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let result = gateway.start(1000, StartWorkflowRequest::default()).await;

    assert!(matches!(result, Err(GatewayError::ValidationError(_))));
}

#[tokio::test]
async fn test_start_failure_is_reported() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.resolve_to(1000);
    scheduler.fail_start.store(true, Ordering::SeqCst);
    let gateway = gateway_with(scheduler.clone(), 16);

    let result = gateway.start(1000, start_request("daily")).await;

    assert!(matches!(result, Err(GatewayError::UpstreamError(_))));
}

// ================================ INSTANCES ===================================== //

#[tokio::test]
async fn test_get_instance_by_id() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler
        .instances
        .lock()
        .unwrap()
        .insert(55, instance(55, 1000));
    let gateway = gateway_with(scheduler.clone(), 16);

    let found = gateway
        .get_instance(
            1000,
            GetInstanceRequest {
                instance_id: Some(55),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(found.instance_id, 55);
    assert_eq!(found.workflow_name, "daily");
    assert_eq!(found.state, "SUCCESS");
    assert_eq!(found.start_time.as_deref(), Some("2024-05-01T10:00:00"));
    assert_eq!(found.duration, Some(65));
}

#[tokio::test]
async fn test_get_instance_without_id_returns_newest() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.push_page(vec![
        instance(10, 1000),
        instance(12, 1000),
        instance(30, 2000),
        instance(11, 1000),
    ]);
    let gateway = gateway_with(scheduler.clone(), 16);

    let found = gateway
        .get_instance(1000, GetInstanceRequest::default())
        .await
        .unwrap();

    assert_eq!(found.instance_id, 12);
}

#[tokio::test]
async fn test_get_instance_without_any_run_is_not_found() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let result = gateway
        .get_instance(1000, GetInstanceRequest::default())
        .await;

    assert!(matches!(result, Err(GatewayError::NotFound(_))));
}

#[tokio::test]
async fn test_list_instances_skips_records_without_id() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.push_page(vec![
        instance(10, 1000),
        json!({"name": "daily-orphan", "state": "FAILURE"}),
        instance(11, 1000),
    ]);
    let gateway = gateway_with(scheduler.clone(), 16);

    let response = gateway
        .list_instances(1000, ListInstancesRequest::default())
        .await
        .unwrap();

    assert_eq!(response.total, 3);
    assert_eq!(response.page_num, 1);
    let ids: Vec<i64> = response.instances.iter().map(|i| i.instance_id).collect();
    assert_eq!(ids, vec![10, 11]);
}

#[tokio::test]
async fn test_instance_log_of_named_and_latest_task() {
    let scheduler = Arc::new(FakeScheduler::new());
    *scheduler.task_instances.lock().unwrap() = vec![
        TaskInstanceRecord {
            id: 501,
            name: "extract".to_string(),
            state: Some("SUCCESS".to_string()),
            start_time: None,
        },
        TaskInstanceRecord {
            id: 502,
            name: "load".to_string(),
            state: Some("FAILURE".to_string()),
            start_time: None,
        },
    ];
    {
        let mut logs = scheduler.logs.lock().unwrap();
        logs.insert(501, "extracted 10 rows".to_string());
        logs.insert(502, "load failed".to_string());
    }
    let gateway = gateway_with(scheduler.clone(), 16);

    let named = gateway
        .get_instance_log(
            1000,
            serde_json::from_value::<GetInstanceLogRequest>(
                json!({"instanceId": 9, "taskName": "extract"}),
            )
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(named.log_content, "extracted 10 rows");
    assert_eq!(named.task_instance_id, Some(501));

    let latest = gateway
        .get_instance_log(
            1000,
            serde_json::from_value::<GetInstanceLogRequest>(json!({"instanceId": 9})).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(latest.log_content, "load failed");

    let missing = gateway
        .get_instance_log(
            1000,
            serde_json::from_value::<GetInstanceLogRequest>(
                json!({"instanceId": 9, "taskName": "publish"}),
            )
            .unwrap(),
        )
        .await;
    assert!(matches!(missing, Err(GatewayError::NotFound(_))));
}

// ============================ PROJECTS / DATASOURCES ============================ //

#[tokio::test]
async fn test_query_project() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let found = gateway
        .query_project(QueryProjectRequest {
            project_name: "etl".to_string(),
            user: None,
        })
        .await
        .unwrap();
    assert_eq!(found.project_code, PROJECT_CODE);
    assert_eq!(found.project_name, "etl");

    let missing = gateway
        .query_project(QueryProjectRequest {
            project_name: "missing".to_string(),
            user: None,
        })
        .await;
    assert!(matches!(missing, Err(GatewayError::NotFound(_))));

    let blank = gateway
        .query_project(QueryProjectRequest {
            project_name: "  ".to_string(),
            user: None,
        })
        .await;
    assert!(matches!(blank, Err(GatewayError::ValidationError(_))));
}

#[tokio::test]
async fn test_list_datasources_maps_fields() {
    let scheduler = Arc::new(FakeScheduler::new());
    *scheduler.datasources.lock().unwrap() = vec![
        DatasourceRecord {
            id: Some(1),
            name: "warehouse".to_string(),
            datasource_type: Some("MYSQL".to_string()),
            database: Some("dw".to_string()),
            note: Some("main".to_string()),
        },
        DatasourceRecord {
            id: Some(2),
            name: "staging".to_string(),
            datasource_type: Some("POSTGRESQL".to_string()),
            database: None,
            note: None,
        },
    ];
    let gateway = gateway_with(scheduler.clone(), 16);

    let response = gateway
        .list_datasources(DatasourceFilter {
            datasource_type: None,
            keyword: Some("ware".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(response.datasources.len(), 1);
    let item = &response.datasources[0];
    assert_eq!(item.name, "warehouse");
    assert_eq!(item.db_name.as_deref(), Some("dw"));
    assert_eq!(item.description.as_deref(), Some("main"));
}

// ================================= LIFECYCLE ==================================== //

#[tokio::test]
async fn test_delete_purges_cache() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);
    let code = gateway
        .synchronize(0, sync_request("daily"))
        .await
        .unwrap()
        .workflow_code;

    let response = gateway
        .delete_workflow(code, DeleteWorkflowRequest::default())
        .await
        .unwrap();

    assert!(response.deleted);
    assert_eq!(response.workflow_code, code);
    assert_eq!(*scheduler.deleted.lock().unwrap(), vec![code]);
    assert!(gateway.definition_cache().get(code).is_none());
}

#[tokio::test]
async fn test_delete_purges_cache_when_scheduler_fails() {
    let scheduler = Arc::new(FakeScheduler::new());
    scheduler.fail_delete.store(true, Ordering::SeqCst);
    let gateway = gateway_with(scheduler.clone(), 16);
    let code = gateway
        .synchronize(0, sync_request("daily"))
        .await
        .unwrap()
        .workflow_code;

    let response = gateway
        .delete_workflow(code, DeleteWorkflowRequest::default())
        .await
        .unwrap();

    assert!(!response.deleted);
    assert!(gateway.definition_cache().get(code).is_none());
}

#[tokio::test]
async fn test_ensure_is_a_no_op() {
    let scheduler = Arc::new(FakeScheduler::new());
    let gateway = gateway_with(scheduler.clone(), 16);

    let response = gateway
        .ensure_workflow(
            serde_json::from_value::<EnsureWorkflowRequest>(json!({"workflowName": "daily"}))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.workflow_code, 0);
    assert!(!response.created);
    assert!(scheduler.submitted.lock().unwrap().is_empty());
}
