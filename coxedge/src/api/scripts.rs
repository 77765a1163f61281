//! Edge script API implementation

use super::common::{site_query, EdgeServiceResource};
use super::{ApiError, Client};
use crate::tasks::{TaskError, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    pub site_id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub routes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Request body for creating and updating scripts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest {
    pub site_id: String,
    pub name: String,
    pub code: String,
    pub routes: Vec<String>,
}

impl EdgeServiceResource for Script {
    fn service() -> &'static str {
        "scripts"
    }
}

impl Client {
    /// GET /services/{environment}/scripts?siteId={site_id}
    pub async fn list_scripts(
        &self,
        environment: &str,
        site_id: &str,
    ) -> Result<Vec<Script>, ApiError> {
        let path = format!(
            "{}{}",
            Script::collection_path(environment),
            site_query(site_id)
        );
        self.get(&path).await
    }

    /// GET /services/{environment}/scripts/{id}?siteId={site_id}
    pub async fn get_script(
        &self,
        environment: &str,
        site_id: &str,
        id: &str,
    ) -> Result<Script, ApiError> {
        let path = format!(
            "{}{}",
            Script::resource_path(environment, id),
            site_query(site_id)
        );
        self.get(&path).await
    }

    /// POST /services/{environment}/scripts?siteId={site_id}
    pub async fn create_script(
        &self,
        environment: &str,
        request: &ScriptRequest,
    ) -> Result<TaskId, TaskError> {
        let path = format!(
            "{}{}",
            Script::collection_path(environment),
            site_query(&request.site_id)
        );
        self.submit_create(&path, request).await
    }

    /// PUT /services/{environment}/scripts/{id}?siteId={site_id}
    pub async fn update_script(
        &self,
        environment: &str,
        id: &str,
        request: &ScriptRequest,
    ) -> Result<TaskId, TaskError> {
        let path = format!(
            "{}{}",
            Script::resource_path(environment, id),
            site_query(&request.site_id)
        );
        self.submit_update(&path, request).await
    }

    /// DELETE /services/{environment}/scripts/{id}?siteId={site_id}
    pub async fn delete_script(
        &self,
        environment: &str,
        site_id: &str,
        id: &str,
    ) -> Result<TaskId, TaskError> {
        let path = format!(
            "{}{}",
            Script::resource_path(environment, id),
            site_query(site_id)
        );
        self.submit_delete(&path).await
    }
}
