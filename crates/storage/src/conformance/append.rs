use super::{make_record, request_ids, TestResult};
use crate::InvocationStore;

pub(super) fn run_append_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: InvocationStore,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "append",
            "new_store_is_empty",
            new_store_is_empty(factory),
        ),
        TestResult::from_result(
            "append",
            "append_then_list_returns_record_last",
            append_then_list_returns_record_last(factory),
        ),
        TestResult::from_result(
            "append",
            "list_preserves_insertion_order",
            list_preserves_insertion_order(factory),
        ),
        TestResult::from_result(
            "append",
            "listed_records_do_not_alias_store",
            listed_records_do_not_alias_store(factory),
        ),
        TestResult::from_result(
            "append",
            "error_results_are_recorded",
            error_results_are_recorded(factory),
        ),
    ]
}

fn new_store_is_empty<S: InvocationStore, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let store = factory();
    if !store.is_empty() || !store.list(None).is_empty() {
        return Err(format!("expected empty store, found {} records", store.len()));
    }
    Ok(())
}

fn append_then_list_returns_record_last<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();
    store.append(make_record("first", "arn:a"));
    let record = make_record("second", "arn:b");
    store.append(record.clone());

    let listed = store.list(None);
    match listed.last() {
        Some(last) if *last == record => Ok(()),
        Some(last) => Err(format!("last record was {:?}, expected {:?}", last, record)),
        None => Err("list returned no records".to_string()),
    }
}

fn list_preserves_insertion_order<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();
    let expected: Vec<String> = (0..20).map(|i| format!("req-{i}")).collect();
    for id in &expected {
        store.append(make_record(id, "arn:a"));
    }

    let actual = request_ids(&store.list(None));
    if actual != expected {
        return Err(format!("order mismatch: {:?}", actual));
    }
    if store.len() != expected.len() {
        return Err(format!("len() = {}, expected {}", store.len(), expected.len()));
    }
    Ok(())
}

fn listed_records_do_not_alias_store<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();
    store.append(make_record("original", "arn:a"));

    let mut listed = store.list(None);
    listed[0].request_id = "changed".to_string();
    listed[0].result.logs.push_str("\nextra");

    let again = store.list(None);
    if again[0].request_id != "original" || again[0].result.logs != "START\nEND" {
        return Err(format!("store was mutated through a listed record: {:?}", again[0]));
    }
    Ok(())
}

fn error_results_are_recorded<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();
    let mut record = make_record("failing", "arn:a");
    record.result.is_error = true;
    record.result.payload = r#"{"errorMessage":"boom"}"#.to_string();
    store.append(record.clone());

    let listed = store.list(None);
    if listed != vec![record] {
        return Err(format!("unexpected records: {:?}", listed));
    }
    Ok(())
}
