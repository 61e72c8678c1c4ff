use line_core::{Fixture, InMemoryStore, LineService, ResultSource};
use line_domain::StepKind;
use serde_json::json;
use uuid::Uuid;

const FIXTURE: &str = include_str!("fixtures/paint_inspection.json");

fn id(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap()
}

fn service() -> LineService<InMemoryStore> {
    let fixture = Fixture::from_json_str(FIXTURE).expect("fixture parses");
    LineService::new(InMemoryStore::from_fixture(fixture).expect("fixture is consistent"))
}

const LINE: &str = "11111111-1111-4111-8111-111111111111";
const W1: &str = "22222222-2222-4222-8222-000000000001";
const R1: &str = "22222222-2222-4222-8222-000000000002";
const W2: &str = "22222222-2222-4222-8222-000000000003";
const RUN: &str = "55555555-5555-4555-8555-555555555555";

#[test]
fn progress_per_step() {
    let svc = service();
    assert_eq!(svc.progress(id(LINE), id(W1), id(RUN)).unwrap(), 66.67);
    assert_eq!(svc.progress(id(LINE), id(R1), id(RUN)).unwrap(), 33.33);
    assert_eq!(svc.progress(id(LINE), id(W2), id(RUN)).unwrap(), 33.33);
}

#[test]
fn results_follow_unit_order_and_key_order() {
    let svc = service();
    let table = svc.get_results(id(LINE), id(W1), Some(id(RUN))).unwrap();
    assert_eq!(serde_json::to_value(&table).unwrap(),
               json!({"result": [["color", "weight"], ["red", 12], ["blue", 9]]}));

    let last = svc.get_results(id(LINE), id(W2), Some(id(RUN))).unwrap();
    assert_eq!(last.to_table(), vec![vec![json!("grade"), json!("notes")], vec![json!("A"), json!("ok")]]);
}

#[test]
fn input_headers_along_the_line() {
    let svc = service();
    let labels = |step: &str| -> Vec<String> {
        svc.input_headers(id(LINE), id(step), false).unwrap().unwrap().into_iter().map(|h| h.label).collect()
    };
    assert_eq!(labels(W1), vec!["batch", "operator"]);
    assert_eq!(labels(R1), vec!["batch", "operator"]);
    // W2 recibe las salidas declaradas del Review (plantilla)
    assert_eq!(labels(W2), vec!["approved"]);

    let review = svc.input_headers(id(LINE), id(R1), true).unwrap().unwrap();
    assert_eq!(review[0].value.as_deref(), Some("B-1"));
    let work = svc.input_headers(id(LINE), id(W2), true).unwrap().unwrap();
    assert!(work.iter().all(|h| h.is_dynamic()));
}

#[test]
fn completeness_and_gating_from_fixture() {
    let svc = service();
    assert!(svc.is_complete(id(LINE), id(W1)).unwrap());
    assert!(svc.is_complete(id(LINE), id(R1)).unwrap());
    assert!(!svc.is_complete(id(LINE), id(W2)).unwrap());
    assert_eq!(svc.allowed_kinds(id(LINE), id(W1)).unwrap(), &[StepKind::Work]);
    assert_eq!(svc.allowed_kinds(id(LINE), id(R1)).unwrap(), &[StepKind::Work, StepKind::Review]);
    // W2 no tiene worker: el próximo step sólo puede ser Work
    assert_eq!(svc.allowed_kinds_for_new(id(LINE)).unwrap(), &[StepKind::Work]);
}

#[test]
fn result_source_switches_on_previous_step() {
    let svc = service();
    let first = svc.result_source(id(LINE), id(W1), Some(id(RUN))).unwrap();
    match first {
        ResultSource::LineInputs { labels, required, .. } => {
            assert_eq!(labels, vec!["batch", "operator"]);
            assert_eq!(required, vec![true, false]);
        }
        other => panic!("unexpected {other:?}"),
    }
    let second = svc.result_source(id(LINE), id(R1), Some(id(RUN))).unwrap();
    assert!(second.load_data());
}

#[test]
fn fixture_roundtrips_through_json() {
    let fixture = Fixture::from_json_str(FIXTURE).unwrap();
    let again = Fixture::from_json_str(&fixture.to_json_pretty().unwrap()).unwrap();
    assert_eq!(again.lines, fixture.lines);
    assert_eq!(again.runs, fixture.runs);
}
