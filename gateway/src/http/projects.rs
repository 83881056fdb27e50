//! Project API client

use dolphin_api::{extract_records, ProjectRecord};

use crate::authn::credential::Credential;
use crate::errors::GatewayError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Find a project by exact name
    pub async fn find_project(
        &self,
        name: &str,
        credential: &Credential,
    ) -> Result<Option<ProjectRecord>, GatewayError> {
        let params = [
            ("searchVal", name.to_string()),
            ("pageNo", "1".to_string()),
            ("pageSize", "100".to_string()),
        ];
        let data = self.get("/projects", &params, credential).await?;

        let project = extract_records(&data)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|record| serde_json::from_value::<ProjectRecord>(record).ok())
            .find(|project| project.name == name);
        Ok(project)
    }
}
