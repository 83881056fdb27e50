//! Datasource API client

use dolphin_api::{extract_records, DatasourceRecord};
use tracing::warn;

use crate::authn::credential::Credential;
use crate::errors::GatewayError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// List datasources, optionally filtered by name keyword and type
    pub async fn list_datasources(
        &self,
        keyword: Option<&str>,
        datasource_type: Option<&str>,
        page_size: u32,
        credential: &Credential,
    ) -> Result<Vec<DatasourceRecord>, GatewayError> {
        let mut params = vec![
            ("pageNo", "1".to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(keyword) = keyword.filter(|k| !k.trim().is_empty()) {
            params.push(("searchVal", keyword.to_string()));
        }
        if let Some(datasource_type) = datasource_type.filter(|t| !t.trim().is_empty()) {
            params.push(("type", datasource_type.to_uppercase()));
        }

        let data = self.get("/datasources", &params, credential).await?;
        Ok(extract_records(&data)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record) {
                Ok(datasource) => Some(datasource),
                Err(e) => {
                    warn!("Skipping malformed datasource: {}", e);
                    None
                }
            })
            .collect())
    }
}
