use deposit_core::{step_fn, DepositionWorkflow, DirectEngine, InMemoryCheckpointStore, InMemoryFormProvider, JsonField,
                   StaticForm, StaticIdentity, StepRunResult, UserId};
use serde_json::{json, Value};

fn four_steps() -> DepositionWorkflow<InMemoryCheckpointStore, DirectEngine> {
    let mut b = DepositionWorkflow::builder(InMemoryCheckpointStore::new(), DirectEngine::new(), "article");
    for id in ["basic", "authors", "upload", "confirm"] {
        b = b.step(step_fn(id, |_, _| StepRunResult::Success));
    }
    b.build(&StaticIdentity(UserId(11))).unwrap()
}

#[test]
fn cook_json_merges_forms_and_skips_steps_without_one() {
    let wf = four_steps();
    let mut forms = InMemoryFormProvider::new();
    forms.register_form(wf.uuid(),
                        0,
                        StaticForm::new(vec![JsonField::new("title", "Tides"),
                                             JsonField::new("authors", json!(["Ada"]))]));
    forms.register_form(wf.uuid(), 1, StaticForm::new(vec![JsonField::new("authors", json!(["Grace"]))]));
    // El paso 2 no tiene formulario.
    forms.register_form(wf.uuid(), 3, StaticForm::new(vec![JsonField::new("license", "CC-BY")]));

    let cooked = Value::Object(wf.cook_json(&forms));
    assert_eq!(cooked,
               json!({"title": "Tides", "authors": ["Ada", "Grace"], "license": "CC-BY"}));
}

#[test]
fn cook_json_does_not_depend_on_cursor() {
    let mut wf = four_steps();
    let mut forms = InMemoryFormProvider::new();
    forms.register_form(wf.uuid(), 0, StaticForm::new(vec![JsonField::new("title", "Tides")]));
    let before = wf.cook_json(&forms);
    wf.set_current_step(3, false).unwrap();
    assert_eq!(wf.cook_json(&forms), before);
    assert_eq!(wf.get_current_step(), 3);
}

#[test]
fn output_for_step_without_form() {
    let wf = four_steps();
    let mut forms = InMemoryFormProvider::new();
    forms.save_draft(UserId(11), "article", "title", "Draft title");

    let out = wf.get_output(&forms, true);
    assert!(out.form.is_none());
    assert_eq!(out.valid, None);
    assert_eq!(out.uuid, wf.uuid());
    assert_eq!(out.deposition_type, "article");
    assert_eq!(out.drafts, json!({"title": "Draft title"}));
    assert_eq!(out.workflow.get_current_step(), 0);
}

#[test]
fn output_validates_current_form_on_request() {
    let mut wf = four_steps();
    let mut forms = InMemoryFormProvider::new();
    forms.register_form(wf.uuid(),
                        1,
                        StaticForm::new(vec![JsonField::new("authors", json!([])).required()]));
    wf.jump_forward(false).unwrap();

    let unvalidated = wf.get_output(&forms, false);
    assert!(unvalidated.form.is_some());
    assert_eq!(unvalidated.valid, None);
    assert!(unvalidated.form_errors().is_empty());

    let validated = wf.get_output(&forms, true);
    assert_eq!(validated.valid, Some(false));
    assert_eq!(validated.form_errors().to_vec(), vec!["authors is required".to_string()]);
}
