//! Submission side of the task protocol

use super::{TaskError, TaskId};
use crate::api::{ApiError, Client};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope returned by every mutating call. The task id normally sits at
/// the top level; some endpoints nest the whole envelope under `data`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHandle {
    #[serde(alias = "id", default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_status: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl TaskHandle {
    fn parse(text: &str) -> Result<Self, TaskError> {
        serde_json::from_str(text).map_err(|e| {
            tracing::error!("Failed to deserialize task envelope: {}, body: {}", e, text);
            TaskError::Submission(ApiError::ParseError(format!(
                "Failed to parse task envelope: {}",
                e
            )))
        })
    }

    /// Top-level id first; `data` is only consulted when there is none.
    fn into_task_id(self) -> Result<TaskId, TaskError> {
        let top_level = self.task_id.map(TaskId::from).filter(|id| !id.is_empty());
        let task_id = match top_level {
            Some(task_id) => Some(task_id),
            None => self
                .data
                .and_then(|data| serde_json::from_value::<TaskHandle>(data).ok())
                .and_then(|nested| nested.task_id)
                .map(TaskId::from)
                .filter(|id| !id.is_empty()),
        };

        task_id.ok_or_else(|| {
            TaskError::Submission(ApiError::ParseError(
                "response did not contain a task id".to_string(),
            ))
        })
    }
}

impl Client {
    /// POST a payload and return the task created for it.
    pub async fn submit_create<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TaskId, TaskError> {
        self.submit(Method::POST, path, Some(body)).await
    }

    /// PUT a payload and return the task created for it.
    pub async fn submit_update<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TaskId, TaskError> {
        self.submit(Method::PUT, path, Some(body)).await
    }

    /// DELETE a resource and return the task created for it.
    pub async fn submit_delete(&self, path: &str) -> Result<TaskId, TaskError> {
        self.submit::<()>(Method::DELETE, path, None).await
    }

    async fn submit<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<TaskId, TaskError> {
        let text = self
            .send_once(method, path, body)
            .await
            .map_err(TaskError::Submission)?;
        let handle = TaskHandle::parse(&text)?;
        let initial_status = handle.task_status.clone();
        let task_id = handle.into_task_id()?;

        tracing::debug!(
            "Submitted {} as task {} (status {:?})",
            path,
            task_id,
            initial_status
        );
        Ok(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::tasks::TaskErrorKind;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn submit_extracts_task_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/services/prod/scripts")
            .with_status(202)
            .with_body(r#"{"taskId":"t-1","taskStatus":"PENDING"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let task_id = client
            .submit_create("/services/prod/scripts", &json!({"name": "a"}))
            .await
            .unwrap();
        assert_eq!(task_id, TaskId::from("t-1"));
    }

    #[tokio::test]
    async fn submit_accepts_wrapped_envelope_and_id_alias() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/services/prod/scripts/sc-1")
            .with_body(r#"{"data":{"id":"t-2"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let task_id = client
            .submit_delete("/services/prod/scripts/sc-1")
            .await
            .unwrap();
        assert_eq!(task_id.as_str(), "t-2");
    }

    #[tokio::test]
    async fn top_level_task_id_wins_over_data_payload() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/services/prod/firewallrules")
            .with_body(
                r#"{"taskId":"t-1","taskStatus":"PENDING","data":{"id":"fw-42","name":"x"}}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let task_id = client
            .submit_create("/services/prod/firewallrules", &json!({"name": "x"}))
            .await
            .unwrap();
        assert_eq!(task_id.as_str(), "t-1");
    }

    #[tokio::test]
    async fn top_level_task_id_is_used_when_data_has_no_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("PUT", "/services/prod/scripts/sc-1")
            .with_body(r#"{"taskId":"t-3","data":{"name":"redirect"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let task_id = client
            .submit_update("/services/prod/scripts/sc-1", &json!({}))
            .await
            .unwrap();
        assert_eq!(task_id.as_str(), "t-3");
    }

    #[tokio::test]
    async fn missing_task_id_is_a_submission_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("PUT", "/services/prod/scripts/sc-1")
            .with_body(r#"{"taskStatus":"PENDING"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .submit_update("/services/prod/scripts/sc-1", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), TaskErrorKind::Submission);
    }

    #[tokio::test]
    async fn empty_task_id_is_a_submission_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/services/prod/scripts")
            .with_body(r#"{"taskId":"  "}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .submit_create("/services/prod/scripts", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Submission(ApiError::ParseError(_))));
    }

    #[tokio::test]
    async fn failed_submission_is_sent_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/services/prod/scripts")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .submit_create("/services/prod/scripts", &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TaskError::Submission(ApiError::ServiceUnavailable)
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_submission_keeps_remote_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/services/prod/scripts")
            .with_status(422)
            .with_body(r#"{"message":"name is taken"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .submit_create("/services/prod/scripts", &json!({}))
            .await
            .unwrap_err();

        match err {
            TaskError::Submission(api) => assert_eq!(api.status(), Some(422)),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
