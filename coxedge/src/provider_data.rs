//! Provider data handed to every resource

use crate::api::Client;
use crate::context::Context;
use crate::tasks::{AwaitConfig, TaskError, TaskId, TaskResolver, TaskResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProviderData {
    pub client: Arc<Client>,
    pub await_config: AwaitConfig,
}

impl ProviderData {
    pub fn new(client: Client, await_config: AwaitConfig) -> Self {
        Self {
            client: Arc::new(client),
            await_config,
        }
    }

    pub fn resolver(&self) -> TaskResolver<Arc<Client>> {
        TaskResolver::with_config(self.client.clone(), self.await_config.clone())
    }

    /// Await `task_id` with the provider-wide polling settings.
    pub async fn await_task(
        &self,
        ctx: &Context,
        task_id: &TaskId,
    ) -> Result<TaskResult, TaskError> {
        self.resolver().await_task(ctx, task_id).await
    }
}
