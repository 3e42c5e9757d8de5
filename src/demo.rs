//! Tipo de depósito de ejemplo ("article") con tres pasos.
//!
//! El primer paso espera a que el formulario aporte un título y pausa el
//! workflow mientras tanto; los otros dos completan datos derivados.

use deposit_core::{step_fn, DepositionStep, InMemoryFormProvider, JsonField, StaticForm, StepRegistry, StepRunResult};
use serde_json::{json, Value};
use uuid::Uuid;

pub const ARTICLE: &str = "article";

pub fn article_registry() -> StepRegistry {
    let steps: Vec<Box<dyn DepositionStep>> = vec![Box::new(step_fn("basic_information", |ctx, _| {
                                                       match ctx.get("title") {
                                                           Some(Value::String(t)) if !t.trim().is_empty() => {
                                                               StepRunResult::Success
                                                           }
                                                           _ => StepRunResult::halt("title required"),
                                                       }
                                                   })),
                                                   Box::new(step_fn("uploads", |ctx, _| {
                                                       let count = ctx.get("files")
                                                                      .and_then(Value::as_array)
                                                                      .map(|f| f.len())
                                                                      .unwrap_or(0);
                                                       ctx.insert("files_count", count as u64);
                                                       StepRunResult::Success
                                                   })),
                                                   Box::new(step_fn("finalize", |ctx, control| {
                                                       ctx.insert("recid", control.uuid().simple().to_string());
                                                       StepRunResult::Success
                                                   }))];
    StepRegistry::new(steps)
}

/// Formularios de los dos primeros pasos con valores ya capturados.
pub fn article_forms(uuid: Uuid, title: &str) -> InMemoryFormProvider {
    let mut forms = InMemoryFormProvider::new();
    forms.register_form(uuid,
                        0,
                        StaticForm::new(vec![JsonField::new("title", title).required(),
                                             JsonField::new("authors", json!(["Doe, J."]))]));
    forms.register_form(uuid,
                        1,
                        StaticForm::new(vec![JsonField::new("files", json!(["paper.pdf"]))]));
    forms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_three_steps() {
        let r = article_registry();
        assert_eq!(r.ids(), vec!["basic_information", "uploads", "finalize"]);
    }
}
