//! Contrato con la capa de formularios y borradores.
//!
//! El renderizado y la validación de campos son externos; el controlador sólo
//! necesita saber si un paso tiene formulario asociado y pedir a cada campo
//! que vuelque su valor en un acumulador JSON.

use std::collections::HashMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::identity::UserId;

pub trait FormField {
    fn name(&self) -> &str;

    /// Vuelca el valor del campo en `acc` y devuelve el acumulador.
    fn cook_json(&self, acc: Map<String, Value>) -> Map<String, Value>;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub trait DepositionForm {
    fn fields(&self) -> Vec<&dyn FormField>;

    /// Valida todos los campos y guarda los errores. `true` si no hay errores.
    fn validate(&mut self) -> bool;

    fn errors(&self) -> &[String];
}

pub trait FormProvider {
    /// Formulario asociado al paso `step` (o al paso vigente si `None`).
    /// `None` significa que ese paso no tiene formulario; no es un error.
    fn get_form(&self, user_id: UserId, uuid: Uuid, step: Option<usize>) -> Option<Box<dyn DepositionForm>>;

    /// Todos los valores en borrador del actor para un tipo de depósito.
    fn draft_field_get_all(&self, user_id: UserId, deposition_type: &str) -> Value;
}

/// Campo con un valor JSON ya capturado.
///
/// Si el valor es un array y el acumulador ya tiene un array bajo el mismo
/// nombre, los elementos se concatenan (campos repetidos entre pasos, p.ej.
/// autores); en cualquier otro caso el valor sobrescribe.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonField {
    pub name: String,
    pub value: Value,
    pub required: bool,
}

impl JsonField {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(),
               value: value.into(),
               required: false }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl FormField for JsonField {
    fn name(&self) -> &str {
        &self.name
    }

    fn cook_json(&self, mut acc: Map<String, Value>) -> Map<String, Value> {
        let extend = matches!(acc.get(&self.name), Some(Value::Array(_)));
        match &self.value {
            Value::Null => {}
            Value::Array(items) if extend => {
                if let Some(Value::Array(existing)) = acc.get_mut(&self.name) {
                    existing.extend(items.iter().cloned());
                }
            }
            v => {
                acc.insert(self.name.clone(), v.clone());
            }
        }
        acc
    }

    fn validate(&self) -> Result<(), String> {
        let empty = match &self.value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        };
        if self.required && empty {
            return Err(format!("{} is required", self.name));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticForm {
    fields: Vec<JsonField>,
    errors: Vec<String>,
}

impl StaticForm {
    pub fn new(fields: Vec<JsonField>) -> Self {
        Self { fields,
               errors: Vec::new() }
    }
}

impl DepositionForm for StaticForm {
    fn fields(&self) -> Vec<&dyn FormField> {
        self.fields.iter().map(|f| f as &dyn FormField).collect()
    }

    fn validate(&mut self) -> bool {
        self.errors = self.fields.iter().filter_map(|f| f.validate().err()).collect();
        self.errors.is_empty()
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// Proveedor en memoria: formularios por (uuid, paso) y borradores por
/// (actor, tipo).
#[derive(Debug, Default)]
pub struct InMemoryFormProvider {
    forms: HashMap<(Uuid, usize), StaticForm>,
    drafts: HashMap<(UserId, String), Map<String, Value>>,
}

impl InMemoryFormProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_form(&mut self, uuid: Uuid, step: usize, form: StaticForm) {
        self.forms.insert((uuid, step), form);
    }

    pub fn save_draft(&mut self, user_id: UserId, deposition_type: &str, field: &str, value: impl Into<Value>) {
        self.drafts
            .entry((user_id, deposition_type.to_string()))
            .or_default()
            .insert(field.to_string(), value.into());
    }
}

impl FormProvider for InMemoryFormProvider {
    fn get_form(&self, _user_id: UserId, uuid: Uuid, step: Option<usize>) -> Option<Box<dyn DepositionForm>> {
        let step = step?;
        self.forms
            .get(&(uuid, step))
            .map(|f| Box::new(f.clone()) as Box<dyn DepositionForm>)
    }

    fn draft_field_get_all(&self, user_id: UserId, deposition_type: &str) -> Value {
        self.drafts
            .get(&(user_id, deposition_type.to_string()))
            .cloned()
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_fields_accumulate() {
        let a = JsonField::new("authors", json!(["Ada"]));
        let b = JsonField::new("authors", json!(["Grace"]));
        let acc = b.cook_json(a.cook_json(Map::new()));
        assert_eq!(Value::Object(acc), json!({"authors": ["Ada", "Grace"]}));
    }

    #[test]
    fn null_fields_contribute_nothing() {
        let acc = JsonField::new("title", Value::Null).cook_json(Map::new());
        assert!(acc.is_empty());
    }

    #[test]
    fn required_empty_field_fails_validation() {
        let mut form = StaticForm::new(vec![JsonField::new("title", "  ").required(),
                                            JsonField::new("abstract", "")]);
        assert!(!form.validate());
        assert_eq!(form.errors().to_vec(), vec!["title is required".to_string()]);
    }

    #[test]
    fn provider_without_form_returns_none() {
        let p = InMemoryFormProvider::new();
        assert!(p.get_form(UserId(1), Uuid::new_v4(), Some(0)).is_none());
        assert_eq!(p.draft_field_get_all(UserId(1), "article"), json!({}));
    }

    #[test]
    fn drafts_are_scoped_by_actor_and_type() {
        let mut p = InMemoryFormProvider::new();
        p.save_draft(UserId(1), "article", "title", "Mine");
        p.save_draft(UserId(2), "article", "title", "Theirs");
        assert_eq!(p.draft_field_get_all(UserId(1), "article"), json!({"title": "Mine"}));
        assert_eq!(p.draft_field_get_all(UserId(1), "thesis"), json!({}));
    }
}
