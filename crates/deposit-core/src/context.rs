//! Contexto mutable compartido por todos los pasos de un workflow.
//!
//! Es un mapa ordenado `clave -> JSON`. Siempre contiene `user_id` y
//! `deposition_type`; durante la ejecución gana `step` y la marca `break`.
//! Al persistir se serializa completo salvo las claves reservadas
//! (`uuid`, `step`, `deposition_type`), que viven en columnas propias.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{KEY_BREAK, KEY_DEPOSITION_TYPE, KEY_STEP, KEY_USER_ID, RESERVED_KEYS};
use crate::identity::UserId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowContext {
    values: IndexMap<String, Value>,
}

impl WorkflowContext {
    pub fn new(user_id: UserId, deposition_type: &str) -> Self {
        let mut ctx = Self::default();
        ctx.set_user_id(user_id);
        ctx.set_deposition_type(Some(deposition_type));
        ctx
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.values.get(KEY_USER_ID).and_then(Value::as_i64).map(UserId)
    }

    pub fn set_user_id(&mut self, user_id: UserId) {
        self.values.insert(KEY_USER_ID.to_string(), Value::from(user_id.0));
    }

    pub fn deposition_type(&self) -> Option<&str> {
        self.values.get(KEY_DEPOSITION_TYPE).and_then(Value::as_str)
    }

    /// `None` deja el tipo actual intacto.
    pub fn set_deposition_type(&mut self, deposition_type: Option<&str>) {
        if let Some(t) = deposition_type {
            self.values.insert(KEY_DEPOSITION_TYPE.to_string(), Value::from(t));
        }
    }

    pub fn step(&self) -> Option<usize> {
        self.values
            .get(KEY_STEP)
            .and_then(Value::as_u64)
            .and_then(|s| usize::try_from(s).ok())
    }

    pub fn set_step(&mut self, step: usize) {
        self.values.insert(KEY_STEP.to_string(), Value::from(step as u64));
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.values.get(KEY_BREAK), Some(Value::Bool(true)))
    }

    pub fn mark_complete(&mut self) {
        self.values.insert(KEY_BREAK.to_string(), Value::Bool(true));
    }

    /// Blob que se guarda en el checkpoint: todo el contexto menos las claves
    /// reservadas.
    pub fn to_blob(&self) -> Value {
        let map: Map<String, Value> = self.values
                                          .iter()
                                          .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
                                          .map(|(k, v)| (k.clone(), v.clone()))
                                          .collect();
        Value::Object(map)
    }

    /// Fusiona un blob persistido sobre el contexto. Las claves del blob
    /// sobrescriben; un blob que no es objeto se ignora.
    pub fn merge_blob(&mut self, blob: &Value) {
        match blob {
            Value::Object(map) => {
                for (k, v) in map {
                    self.values.insert(k.clone(), v.clone());
                }
            }
            Value::Null => {}
            other => debug!("merge_blob: ignoring non-object blob kind={}", json_kind(other)),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_context_carries_actor_and_type() {
        let ctx = WorkflowContext::new(UserId(5), "article");
        assert_eq!(ctx.user_id(), Some(UserId(5)));
        assert_eq!(ctx.deposition_type(), Some("article"));
        assert_eq!(ctx.step(), None);
        assert!(!ctx.is_complete());
    }

    #[test]
    fn blob_excludes_reserved_keys() {
        let mut ctx = WorkflowContext::new(UserId(5), "article");
        ctx.insert("uuid", "abc");
        ctx.set_step(2);
        ctx.insert("title", "On resumable workflows");
        let blob = ctx.to_blob();
        assert_eq!(blob, json!({"user_id": 5, "title": "On resumable workflows"}));
    }

    #[test]
    fn blob_without_reserved_keys_still_works() {
        let mut ctx = WorkflowContext::default();
        ctx.insert("a", 1);
        assert_eq!(ctx.to_blob(), json!({"a": 1}));
    }

    #[test]
    fn merge_overwrites_and_keeps_order() {
        let mut ctx = WorkflowContext::new(UserId(1), "thesis");
        ctx.insert("title", "old");
        ctx.merge_blob(&json!({"title": "new", "authors": ["a", "b"]}));
        assert_eq!(ctx.get("title"), Some(&json!("new")));
        let keys: Vec<&String> = ctx.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["user_id", "deposition_type", "title", "authors"]);
    }

    #[test]
    fn merge_ignores_non_objects() {
        let mut ctx = WorkflowContext::new(UserId(1), "thesis");
        let before = ctx.clone();
        ctx.merge_blob(&json!([1, 2]));
        ctx.merge_blob(&Value::Null);
        assert_eq!(ctx, before);
    }

    #[test]
    fn completion_marker_round_trips_through_blob() {
        let mut ctx = WorkflowContext::new(UserId(1), "thesis");
        ctx.mark_complete();
        let mut restored = WorkflowContext::new(UserId(1), "thesis");
        restored.merge_blob(&ctx.to_blob());
        assert!(restored.is_complete());
    }
}
