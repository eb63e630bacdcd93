//! Shared utilities

use anyhow::bail;
use chrono::NaiveDateTime;
use wander_agent::{Answer, InterruptContext};
use wander_proto::InterruptKind;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Format a server timestamp (naive UTC) for display.
pub fn format_timestamp(ts: Option<NaiveDateTime>) -> String {
    ts.map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Turn a typed line into an answer for the open interrupt.
///
/// Destination choices are entered 1-based, as listed; anything else is
/// an error naming the valid range. Questions accept numbers as numbers
/// and anything else as text.
pub fn parse_answer(input: &str, context: &InterruptContext) -> anyhow::Result<Answer> {
    let input = input.trim();
    match context.kind {
        InterruptKind::DestinationSelection => {
            let count = context.options.len();
            match input.parse::<usize>() {
                Ok(n) if (1..=count).contains(&n) => Ok(Answer::Option(n - 1)),
                _ => bail!("Choose a number from 1 to {}", count),
            }
        }
        InterruptKind::Question => {
            if let Ok(n) = input.parse::<i64>() {
                return Ok(Answer::Number(n.into()));
            }
            Ok(
                match input
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    Some(n) => Answer::Number(n),
                    None => Answer::text(input),
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wander_proto::InterruptRequest;

    fn context(value: serde_json::Value) -> InterruptContext {
        let request: InterruptRequest = serde_json::from_value(value).unwrap();
        InterruptContext::from(request)
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("Zürich café", 6), "Zürich...");
    }

    #[test]
    fn test_format_timestamp() {
        let dt = NaiveDateTime::parse_from_str("2025-03-14 09:26:53", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(format_timestamp(Some(dt)), "2025-03-14 09:26");
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn test_parse_destination_choice() {
        let ctx = context(json!({
            "interrupt_type": "destination_selection",
            "question": "Pick one",
            "options": [{"name": "Kyoto"}, {"name": "Lisbon"}]
        }));
        assert_eq!(parse_answer(" 2 ", &ctx).unwrap(), Answer::Option(1));
        assert_eq!(parse_answer("1", &ctx).unwrap(), Answer::Option(0));
        for bad in ["0", "3", "-1", "Kyoto"] {
            let err = parse_answer(bad, &ctx).unwrap_err();
            assert_eq!(err.to_string(), "Choose a number from 1 to 2");
        }
    }

    #[test]
    fn test_parse_question_answer() {
        let ctx = context(json!({
            "interrupt_type": "question",
            "question": "What's your total budget for this trip in USD?",
            "field": "budget"
        }));
        assert_eq!(parse_answer("3000", &ctx).unwrap(), Answer::Number(3000.into()));
        assert_eq!(
            parse_answer("2500.5", &ctx).unwrap(),
            Answer::Number(serde_json::Number::from_f64(2500.5).unwrap())
        );
        assert_eq!(
            parse_answer("in the summer", &ctx).unwrap(),
            Answer::text("in the summer")
        );
    }
}
