//! Edge script resource

use super::{
    cancellable, last_updated_now, string_attr, string_list_attr, submit_and_await,
    to_attributes, validate_attributes, ResourceError, ResourceKey,
};
use crate::api::{Script, ScriptRequest};
use crate::context::Context;
use crate::provider_data::ProviderData;
use crate::schema::SCRIPT;
use crate::tasks::TaskError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptConfig {
    pub environment_name: String,
    pub site_id: String,
    pub name: String,
    pub code: String,
    pub routes: Vec<String>,
}

impl ScriptConfig {
    pub fn from_attributes(attrs: &Map<String, Value>) -> Result<Self, ResourceError> {
        validate_attributes(SCRIPT, attrs)?;

        Ok(Self {
            environment_name: string_attr(attrs, "environment_name").unwrap_or_default(),
            site_id: string_attr(attrs, "site_id").unwrap_or_default(),
            name: string_attr(attrs, "name").unwrap_or_default(),
            code: string_attr(attrs, "code").unwrap_or_default(),
            routes: string_list_attr(attrs, "routes"),
        })
    }

    fn request(&self) -> ScriptRequest {
        ScriptRequest {
            site_id: self.site_id.clone(),
            name: self.name.clone(),
            code: self.code.clone(),
            routes: self.routes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptState {
    pub id: String,
    pub environment_name: String,
    pub site_id: String,
    pub stack_id: Option<String>,
    pub name: String,
    pub code: String,
    pub routes: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub version: Option<String>,
    pub last_updated: Option<String>,
}

impl ScriptState {
    fn from_script(environment_name: &str, script: Script) -> Self {
        Self {
            id: script.id,
            environment_name: environment_name.to_string(),
            site_id: script.site_id,
            stack_id: script.stack_id,
            name: script.name,
            code: script.code,
            routes: script.routes,
            created_at: script.created_at,
            updated_at: script.updated_at,
            version: script.version,
            last_updated: None,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.environment_name, &self.site_id, &self.id)
    }

    pub fn to_attributes(&self) -> Map<String, Value> {
        to_attributes(self)
    }
}

pub struct ScriptResource {
    data: ProviderData,
}

impl ScriptResource {
    pub fn new(data: ProviderData) -> Self {
        Self { data }
    }

    pub fn type_name(&self) -> &'static str {
        SCRIPT
    }

    pub async fn create(
        &self,
        ctx: &Context,
        config: &ScriptConfig,
    ) -> Result<ScriptState, ResourceError> {
        let request = config.request();
        let result = submit_and_await(
            &self.data,
            ctx,
            self.data
                .client
                .create_script(&config.environment_name, &request),
        )
        .await?;

        let id = result
            .resource_id()
            .ok_or_else(|| ResourceError::MissingResourceId {
                task_id: result.task_id.clone(),
            })?;
        tracing::info!("Created script {} in site {}", id, config.site_id);

        let key = ResourceKey::new(&config.environment_name, &config.site_id, id);
        let state = self.read(ctx, &key).await?;
        state.ok_or(ResourceError::NotFound {
            type_name: SCRIPT,
            key,
        })
    }

    pub async fn read(
        &self,
        ctx: &Context,
        key: &ResourceKey,
    ) -> Result<Option<ScriptState>, ResourceError> {
        let fetched = cancellable(
            ctx,
            self.data
                .client
                .get_script(&key.environment_name, &key.site_id, &key.id),
        )
        .await;

        match fetched {
            Ok(script) => Ok(Some(ScriptState::from_script(&key.environment_name, script))),
            Err(ResourceError::Api(e)) if e.is_not_found() => {
                tracing::warn!("Script {} is gone", key);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: &str,
        config: &ScriptConfig,
    ) -> Result<ScriptState, ResourceError> {
        let request = config.request();
        submit_and_await(
            &self.data,
            ctx,
            self.data
                .client
                .update_script(&config.environment_name, id, &request),
        )
        .await?;
        tracing::info!("Updated script {} in site {}", id, config.site_id);

        let key = ResourceKey::new(&config.environment_name, &config.site_id, id);
        let state = self.read(ctx, &key).await?;
        let mut state = state.ok_or(ResourceError::NotFound {
            type_name: SCRIPT,
            key,
        })?;
        state.last_updated = Some(last_updated_now());
        Ok(state)
    }

    pub async fn delete(&self, ctx: &Context, key: &ResourceKey) -> Result<(), ResourceError> {
        let deleted = submit_and_await(
            &self.data,
            ctx,
            self.data
                .client
                .delete_script(&key.environment_name, &key.site_id, &key.id),
        )
        .await;

        match deleted {
            Ok(_) => {
                tracing::info!("Deleted script {}", key);
                Ok(())
            }
            Err(ResourceError::Task(TaskError::Submission(e))) if e.is_not_found() => {
                tracing::warn!("Script {} was already deleted", key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn import(&self, ctx: &Context, import_id: &str) -> Result<ScriptState, ResourceError> {
        let key: ResourceKey = import_id.parse()?;
        let state = self.read(ctx, &key).await?;
        state.ok_or(ResourceError::NotFound {
            type_name: SCRIPT,
            key,
        })
    }
}
