//! Resolves the active prompt text for a phase: a per-project override, if
//! one is active, beats a global override, which beats the built-in
//! default shipped with the binary.

use chrono::Utc;
use modelforge_utils::types::{PhaseId, PromptType, PromptVersion};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

pub mod defaults;

/// Key a prompt is registered under: stable identifier, phase, and type
/// (system vs. user prompt text).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptKey {
    pub key: String,
    pub phase: PhaseId,
    pub prompt_type: PromptType,
}

pub struct PromptRegistry {
    builtin: HashMap<PromptKey, String>,
    versions: RwLock<Vec<PromptVersion>>,
}

impl PromptRegistry {
    #[must_use]
    pub fn new(builtin: HashMap<PromptKey, String>) -> Self {
        Self { builtin, versions: RwLock::new(Vec::new()) }
    }

    /// Resolution order: active project override -> active global override
    /// -> built-in default.
    #[must_use]
    pub fn resolve(&self, key: &PromptKey, project_id: Option<Uuid>) -> Option<String> {
        let versions = self.versions.read().expect("prompt registry lock poisoned");

        if let Some(project_id) = project_id {
            if let Some(v) = versions
                .iter()
                .find(|v| v.active && v.key == key.key && v.phase == key.phase && v.prompt_type == key.prompt_type && v.project_id == Some(project_id))
            {
                return Some(v.content.clone());
            }
        }

        if let Some(v) = versions
            .iter()
            .find(|v| v.active && v.key == key.key && v.phase == key.phase && v.prompt_type == key.prompt_type && v.project_id.is_none())
        {
            return Some(v.content.clone());
        }

        self.builtin.get(key).cloned()
    }

    /// Save a new version, inactive by default.
    pub fn save(&self, key: &PromptKey, project_id: Option<Uuid>, content: String) -> PromptVersion {
        let version = PromptVersion {
            id: Uuid::new_v4(),
            key: key.key.clone(),
            phase: key.phase,
            prompt_type: key.prompt_type,
            project_id,
            content,
            active: false,
            created_at: Utc::now(),
        };
        self.versions.write().expect("prompt registry lock poisoned").push(version.clone());
        version
    }

    /// Activate `version_id`, atomically deactivating any other version in
    /// the same scope (same key/phase/type/project_id).
    pub fn activate(&self, version_id: Uuid) -> Result<(), String> {
        let mut versions = self.versions.write().expect("prompt registry lock poisoned");
        let target = versions
            .iter()
            .find(|v| v.id == version_id)
            .cloned()
            .ok_or_else(|| "version not found".to_string())?;

        for v in versions.iter_mut() {
            if v.key == target.key && v.phase == target.phase && v.prompt_type == target.prompt_type && v.project_id == target.project_id {
                v.active = v.id == version_id;
            }
        }
        Ok(())
    }

    /// Reset a scope back to the built-in default by deactivating every
    /// version in that scope; `resolve` then falls through to `builtin`.
    pub fn reset(&self, key: &PromptKey, project_id: Option<Uuid>) {
        let mut versions = self.versions.write().expect("prompt registry lock poisoned");
        for v in versions.iter_mut() {
            if v.key == key.key && v.phase == key.phase && v.prompt_type == key.prompt_type && v.project_id == project_id {
                v.active = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PromptKey {
        PromptKey { key: "analyze_business_model".into(), phase: PhaseId::Phase2, prompt_type: PromptType::User }
    }

    fn registry_with_default(text: &str) -> PromptRegistry {
        let mut builtin = HashMap::new();
        builtin.insert(key(), text.to_string());
        PromptRegistry::new(builtin)
    }

    #[test]
    fn falls_back_to_builtin_when_no_overrides() {
        let registry = registry_with_default("default prompt");
        assert_eq!(registry.resolve(&key(), None), Some("default prompt".to_string()));
    }

    #[test]
    fn global_override_beats_builtin() {
        let registry = registry_with_default("default prompt");
        let v = registry.save(&key(), None, "global override".into());
        registry.activate(v.id).unwrap();
        assert_eq!(registry.resolve(&key(), None), Some("global override".to_string()));
    }

    #[test]
    fn project_override_beats_global_override() {
        let registry = registry_with_default("default prompt");
        let project_id = Uuid::new_v4();
        let global = registry.save(&key(), None, "global override".into());
        registry.activate(global.id).unwrap();
        let project = registry.save(&key(), Some(project_id), "project override".into());
        registry.activate(project.id).unwrap();

        assert_eq!(registry.resolve(&key(), Some(project_id)), Some("project override".to_string()));
        assert_eq!(registry.resolve(&key(), None), Some("global override".to_string()));
    }

    #[test]
    fn activating_a_new_version_deactivates_the_previous_one() {
        let registry = registry_with_default("default prompt");
        let v1 = registry.save(&key(), None, "v1".into());
        registry.activate(v1.id).unwrap();
        let v2 = registry.save(&key(), None, "v2".into());
        registry.activate(v2.id).unwrap();

        assert_eq!(registry.resolve(&key(), None), Some("v2".to_string()));
        let versions = registry.versions.read().unwrap();
        assert!(!versions.iter().find(|v| v.id == v1.id).unwrap().active);
    }

    #[test]
    fn reset_falls_back_to_builtin() {
        let registry = registry_with_default("default prompt");
        let v = registry.save(&key(), None, "override".into());
        registry.activate(v.id).unwrap();
        registry.reset(&key(), None);
        assert_eq!(registry.resolve(&key(), None), Some("default prompt".to_string()));
    }
}
