use super::{make_record, request_ids, TestResult};
use crate::InvocationStore;

pub(super) fn run_filter_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: InvocationStore,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "filter",
            "filter_returns_only_matching_arn",
            filter_returns_only_matching_arn(factory),
        ),
        TestResult::from_result(
            "filter",
            "filter_is_not_substring_match",
            filter_is_not_substring_match(factory),
        ),
        TestResult::from_result(
            "filter",
            "filter_with_unknown_arn_is_empty",
            filter_with_unknown_arn_is_empty(factory),
        ),
    ]
}

fn filter_returns_only_matching_arn<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();
    store.append(make_record("1", "arn:fn:a"));
    store.append(make_record("2", "arn:fn:b"));
    store.append(make_record("3", "arn:fn:a"));
    store.append(make_record("4", "arn:fn:b"));
    store.append(make_record("5", "arn:fn:a"));

    let listed = store.list(Some("arn:fn:a"));
    if listed.iter().any(|r| r.function_arn != "arn:fn:a") {
        return Err(format!("filter leaked other ARNs: {:?}", listed));
    }
    let ids = request_ids(&listed);
    if ids != ["1", "3", "5"] {
        return Err(format!("expected [1, 3, 5], got {:?}", ids));
    }
    Ok(())
}

fn filter_is_not_substring_match<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();
    store.append(make_record("1", "arn:aws:lambda:us-east-1:000000000000:function:echo"));
    store.append(make_record("2", "arn:aws:lambda:us-east-1:000000000000:function:echo-v2"));

    let ids = request_ids(&store.list(Some("arn:aws:lambda:us-east-1:000000000000:function:echo")));
    if ids != ["1"] {
        return Err(format!("expected exact match only, got {:?}", ids));
    }
    if !store.list(Some("echo")).is_empty() {
        return Err("fragment of an ARN matched".to_string());
    }
    Ok(())
}

fn filter_with_unknown_arn_is_empty<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();
    store.append(make_record("1", "arn:fn:a"));
    let listed = store.list(Some("arn:fn:missing"));
    if !listed.is_empty() {
        return Err(format!("expected no records, got {:?}", listed));
    }
    Ok(())
}
