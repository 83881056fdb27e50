//! Unit tests

mod test_cache;
mod test_correlate;
mod test_gateway;
mod test_server;
mod test_sync;

use gateway_api::SyncWorkflowRequest;
use serde_json::json;

/// Two-task definition: a shell extract feeding a SQL load
pub fn sync_request(name: &str) -> SyncWorkflowRequest {
    serde_json::from_value(json!({
        "workflowName": name,
        "projectName": "etl",
        "tasks": [
            {
                "code": 1,
                "name": "extract",
                "taskType": "SHELL",
                "taskParams": {"rawScript": "echo extract"}
            },
            {
                "code": 2,
                "name": "load",
                "taskType": "SQL",
                "taskParams": "{\"datasourceName\": \"warehouse\", \"sql\": \"INSERT INTO t SELECT 1\", \"sqlType\": 1}"
            }
        ],
        "relations": [
            {"preTaskCode": 0, "postTaskCode": 1},
            {"preTaskCode": 1, "postTaskCode": 2}
        ],
        "locations": [
            {"taskCode": 1, "x": 0, "y": 0},
            {"taskCode": 2, "x": 200, "y": 0}
        ]
    }))
    .unwrap()
}
