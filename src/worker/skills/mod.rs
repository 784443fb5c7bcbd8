//! Worker-side capability table.
//!
//! Skills are looked up strictly through this table: a task payload names a
//! skill, the table resolves it, and nothing outside the table is ever
//! executed. The table is populated at startup; plugin sets are swapped in
//! through an explicit [`SkillSet::reload`].

pub mod shell;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SkillError;
use crate::protocol::SkillDescriptor;

/// A locally executable skill.
#[async_trait]
pub trait Skill: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Parameter schema advertised at registration.
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    /// Execute with the bound arguments from a task payload.
    async fn invoke(
        &self,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, SkillError>;
}

/// Name → invocable mapping for one worker.
pub struct SkillSet {
    skills: RwLock<HashMap<String, Arc<dyn Skill>>>,
}

impl SkillSet {
    pub fn new() -> Self {
        Self {
            skills: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, skill: Arc<dyn Skill>) {
        let name = skill.name().to_string();
        self.skills.write().await.insert(name.clone(), skill);
        tracing::debug!(skill = %name, "Skill registered");
    }

    /// Replace the whole table (plugin reload).
    pub async fn reload(&self, skills: Vec<Arc<dyn Skill>>) {
        let mut table = self.skills.write().await;
        table.clear();
        for skill in skills {
            table.insert(skill.name().to_string(), skill);
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.read().await.get(name).cloned()
    }

    pub async fn count(&self) -> usize {
        self.skills.read().await.len()
    }

    /// Invoke a skill by name, erroring on unknown names.
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, SkillError> {
        let skill = self.get(name).await.ok_or_else(|| SkillError::NotFound {
            name: name.to_string(),
        })?;
        skill.invoke(args).await
    }

    /// Manifest advertised on registration, sorted by name.
    pub async fn manifest(&self) -> Vec<SkillDescriptor> {
        let mut descriptors: Vec<SkillDescriptor> = self
            .skills
            .read()
            .await
            .values()
            .map(|s| SkillDescriptor {
                name: s.name().to_string(),
                description: s.description().to_string(),
                parameters: s.parameters_schema(),
            })
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

impl Default for SkillSet {
    fn default() -> Self {
        Self::new()
    }
}
