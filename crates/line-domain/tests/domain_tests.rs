use line_domain::{DomainError, Instruction, Line, Run, Step, StepKind, Unit};
use serde_json::json;

#[test]
fn test_line_deserializes_with_mixed_case_kinds() {
    let line: Line = serde_json::from_value(json!({
        "id": "6f1c6a43-64c1-4b52-9a2a-0b9a5b1f7c10",
        "name": "paint inspection",
        "input_headers": [{"label": "batch", "value": "B-1", "required": true}],
        "steps": [
            {"id": "0d3c0a3e-1b6f-4f4e-8d51-6a0f8a1d2b01", "kind": "WORK",
             "instruction": {"type": "form_fields", "fields": [
                 {"id": "a3b1e9d0-5c1e-4a51-9f0e-2f8f3d0c9e11", "label": "weight"}]}},
            {"id": "0d3c0a3e-1b6f-4f4e-8d51-6a0f8a1d2b02", "kind": "Review"}
        ]
    })).unwrap();
    assert_eq!(line.step_count(), 2);
    assert_eq!(line.ordered_steps()[0].kind, StepKind::Work);
    assert_eq!(line.ordered_steps()[1].kind, StepKind::Review);
    assert_eq!(line.input_labels(), vec!["batch"]);
    assert!(line.input_headers[0].required);
}

#[test]
fn test_unknown_kind_fails_whole_document() {
    let res: Result<Step, _> = serde_json::from_value(json!({
        "id": "0d3c0a3e-1b6f-4f4e-8d51-6a0f8a1d2b02", "kind": "approval"
    }));
    let err = res.unwrap_err().to_string();
    assert!(err.contains("unknown step kind"), "unexpected error: {err}");
    assert_eq!("approval".parse::<StepKind>(), Err(DomainError::UnknownStepKind("approval".into())));
}

#[test]
fn test_run_snapshot_roundtrips_chain_links() {
    let mut line = Line::new("l");
    let w = Step::new(StepKind::Work).with_instruction(Instruction::raw("result[x]"));
    let w_id = w.id;
    line.append_step(w).unwrap();

    let mut run = Run::new(line.id);
    let mut unit = Unit::new();
    unit.push_instance(w_id, vec![]);
    unit.push_result([("x".to_string(), json!(3))].into_iter().collect());
    run.push_unit(unit);

    let text = serde_json::to_string(&run).unwrap();
    let back: Run = serde_json::from_str(&text).unwrap();
    assert_eq!(back, run);
    assert_eq!(back.unit_count(), 1);
    assert!(back.units()[0].verify_chain(&line).is_ok());
}
