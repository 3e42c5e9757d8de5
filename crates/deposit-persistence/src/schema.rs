//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    deposit_workflows (workflow_uuid) {
        workflow_uuid -> Uuid,
        name -> Text,
        user_id -> BigInt,
        module_name -> Text,
        counter_finished -> Integer,
        definition_hash -> Nullable<Text>,
        created -> Timestamptz,
        modified -> Timestamptz,
    }
}

diesel::table! {
    deposit_checkpoints (id) {
        id -> BigInt,
        workflow_uuid -> Uuid,
        user_id -> BigInt,
        deposition_type -> Text,
        status -> Text,
        current_step -> Integer,
        obj_json -> Jsonb,
        modified -> Timestamptz,
    }
}

diesel::table! {
    deposit_execution_records (id) {
        id -> BigInt,
        workflow_uuid -> Uuid,
        task_counter -> Integer,
        data -> Jsonb,
        modified -> Timestamptz,
    }
}

diesel::joinable!(deposit_checkpoints -> deposit_workflows (workflow_uuid));
diesel::joinable!(deposit_execution_records -> deposit_workflows (workflow_uuid));

diesel::allow_tables_to_appear_in_same_query!(
    deposit_workflows,
    deposit_checkpoints,
    deposit_execution_records,
);
