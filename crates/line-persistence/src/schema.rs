//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    workers (id) {
        id -> Uuid,
        name -> Text,
        number -> Int4,
    }
}

diesel::table! {
    lines (id) {
        id -> Uuid,
        name -> Text,
        input_headers -> Jsonb,
        step_order -> Array<Uuid>,
    }
}

diesel::table! {
    steps (id) {
        id -> Uuid,
        line_id -> Uuid,
        kind -> Text,
        worker_id -> Nullable<Uuid>,
        instruction -> Nullable<Jsonb>,
    }
}

diesel::table! {
    runs (id) {
        id -> Uuid,
        line_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    units (id) {
        id -> Uuid,
        run_id -> Uuid,
        seq -> Int8,
        results -> Jsonb,
    }
}

diesel::table! {
    step_instances (id) {
        id -> Uuid,
        unit_id -> Uuid,
        step_id -> Uuid,
        next_id -> Nullable<Uuid>,
        input_datas -> Jsonb,
    }
}

diesel::joinable!(steps -> lines (line_id));
diesel::joinable!(runs -> lines (line_id));
diesel::joinable!(units -> runs (run_id));
diesel::joinable!(step_instances -> units (unit_id));

diesel::allow_tables_to_appear_in_same_query!(
    workers,
    lines,
    steps,
    runs,
    units,
    step_instances,
);
