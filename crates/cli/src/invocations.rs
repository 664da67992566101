//! `lambda-inspector invocations` -- list what a running inspector recorded.
//!
//! Fetches the formatted listing, then narrows it the way the dashboard
//! does: a case-insensitive substring match on the ARN and the most recent
//! invocations first.

use lambda_inspector_core::{InvocationView, InvocationsResponse};
use time::format_description::well_known::Rfc3339;

use crate::OutputFormat;

/// Base URL of a locally running inspector with the default mount.
pub(crate) const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4599/_extension/lambda-inspector";

pub(crate) struct ListOptions<'a> {
    pub(crate) arn_contains: Option<&'a str>,
    pub(crate) last: Option<usize>,
}

pub(crate) fn cmd_invocations(
    endpoint: &str,
    options: &ListOptions<'_>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = fetch(endpoint)?;
    let selected = select(&response.invocations, options);

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&selected)?),
        OutputFormat::Text => {
            if selected.is_empty() {
                println!("No invocations recorded.");
            } else {
                print!("{}", render_text(&selected));
            }
        }
    }
    Ok(())
}

fn fetch(endpoint: &str) -> Result<InvocationsResponse, Box<dyn std::error::Error>> {
    let url = format!("{}/invocations?formatted=true", endpoint.trim_end_matches('/'));
    let response = ureq::get(&url)
        .call()
        .map_err(|e| format!("could not reach inspector at {}: {}", url, e))?;
    let decoded = response
        .into_body()
        .read_json::<InvocationsResponse>()
        .map_err(|e| format!("unexpected response from {}: {}", url, e))?;
    Ok(decoded)
}

/// Matching invocations, newest first, truncated to `last`.
fn select<'a>(
    invocations: &'a [InvocationView],
    options: &ListOptions<'_>,
) -> Vec<&'a InvocationView> {
    let needle = options
        .arn_contains
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    invocations
        .iter()
        .rev()
        .filter(|inv| match &needle {
            Some(needle) => inv.function_arn.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .take(options.last.unwrap_or(usize::MAX))
        .collect()
}

fn render_text(invocations: &[&InvocationView]) -> String {
    let mut out = String::new();
    for inv in invocations {
        let status = if inv.result.is_error { "ERR" } else { "OK " };
        let timestamp = inv
            .timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| inv.timestamp.to_string());
        out.push_str(&format!(
            "{}  {}  {}  {}\n",
            status,
            timestamp,
            inv.function_name(),
            inv.request_id
        ));
        for line in inv.result.logs.lines() {
            out.push_str("    ");
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_inspector_core::{LogsView, ResultView};
    use serde_json::json;
    use time::macros::datetime;

    fn view(request_id: &str, arn: &str, is_error: bool) -> InvocationView {
        InvocationView {
            timestamp: datetime!(2025-06-01 08:00:00 UTC),
            request_id: request_id.to_string(),
            function_arn: arn.to_string(),
            payload: json!({}),
            result: ResultView {
                payload: json!({"ok": !is_error}),
                logs: LogsView::Lines(vec!["START".to_string(), "END".to_string()]),
                is_error,
            },
        }
    }

    fn sample() -> Vec<InvocationView> {
        vec![
            view("1", "arn:aws:lambda:us-east-1:1:function:Orders", false),
            view("2", "arn:aws:lambda:us-east-1:1:function:billing", true),
            view("3", "arn:aws:lambda:us-east-1:1:function:orders-v2", false),
        ]
    }

    fn ids(selected: &[&InvocationView]) -> Vec<String> {
        selected.iter().map(|inv| inv.request_id.clone()).collect()
    }

    #[test]
    fn newest_first_without_filter() {
        let all = sample();
        let options = ListOptions {
            arn_contains: None,
            last: None,
        };
        assert_eq!(ids(&select(&all, &options)), ["3", "2", "1"]);
    }

    #[test]
    fn arn_filter_is_case_insensitive_substring() {
        let all = sample();
        let options = ListOptions {
            arn_contains: Some("ORDERS"),
            last: None,
        };
        assert_eq!(ids(&select(&all, &options)), ["3", "1"]);
    }

    #[test]
    fn last_limits_after_filtering() {
        let all = sample();
        let options = ListOptions {
            arn_contains: Some("orders"),
            last: Some(1),
        };
        assert_eq!(ids(&select(&all, &options)), ["3"]);

        let none = ListOptions {
            arn_contains: None,
            last: Some(0),
        };
        assert!(select(&all, &none).is_empty());
    }

    #[test]
    fn text_rendering_shows_status_name_and_logs() {
        let all = sample();
        let selected: Vec<&InvocationView> = all.iter().skip(1).take(1).collect();
        assert_eq!(
            render_text(&selected),
            "ERR  2025-06-01T08:00:00Z  billing  2\n    START\n    END\n"
        );
    }
}
