//! Best-effort readers for free-text model output.
//!
//! Models are asked for JSON but routinely wrap it in prose or code fences, add trailing commentary,
//! or ignore the format entirely. Each reader tries, in order: a JSON object anywhere in the text,
//! then a line-based format. `None` means nothing usable was found.

use crate::model::Insight;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Recommendations without a matching insight are attached to an insight with this text.
pub(super) const UNPAIRED_RECOMMENDATION: &str = "Additional recommendation";

/// Returns the first JSON object embedded in `text`.
pub(super) fn json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(ix, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[ix..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

/// Reads a label to category mapping. Keys are lowercased and trimmed.
///
/// Accepted shapes:
/// - `{"assignments": {"matcha latte": "coffee"}}`
/// - `{"matcha latte": "coffee"}`
/// - `{"categories": [{"name": "coffee", "descriptions": ["matcha latte"]}]}`
/// - `{"categories": {"matcha latte": "coffee"}}`
/// - lines of `matcha latte: coffee`, `matcha latte -> coffee` or `matcha latte => coffee`
pub(super) fn assignments(text: &str) -> Option<HashMap<String, String>> {
    let map = match json_object(text) {
        Some(object) => assignments_from_json(object),
        None => key_value_lines(text),
    };
    (!map.is_empty()).then_some(map)
}

fn assignments_from_json(mut object: Map<String, Value>) -> HashMap<String, String> {
    if let Some(Value::Object(inner)) = object.remove("assignments") {
        return string_pairs(inner);
    }
    match object.remove("categories") {
        Some(Value::Object(inner)) => return string_pairs(inner),
        Some(Value::Array(groups)) => return grouped(groups),
        Some(other) => {
            object.insert("categories".to_string(), other);
        }
        None => {}
    }
    string_pairs(object)
}

/// Reads `[{"name": "coffee", "descriptions": ["matcha latte"]}]`.
fn grouped(groups: Vec<Value>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for group in groups {
        let Some(name) = group.get("name").and_then(Value::as_str) else {
            continue;
        };
        let descriptions = group
            .get("descriptions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for description in descriptions.iter().filter_map(Value::as_str) {
            map.insert(normalize(description), normalize(name));
        }
    }
    map
}

/// Reads a label to note mapping from `{"notes": {...}}` or `label: note` lines.
pub(super) fn notes(text: &str) -> Option<HashMap<String, String>> {
    let map = match json_object(text) {
        Some(mut object) => match object.remove("notes") {
            Some(Value::Object(inner)) => inner
                .into_iter()
                .filter_map(|(k, v)| Some((normalize(&k), clean(v.as_str()?))))
                .filter(|(_, v)| !v.is_empty())
                .collect(),
            _ => HashMap::new(),
        },
        None => split_lines(text)
            .map(|(k, v)| (normalize(k), clean(v)))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect(),
    };
    (!map.is_empty()).then_some(map)
}

/// Reads ranked insights.
///
/// Accepted shapes:
/// - `{"insights": ["..."], "recommendations": ["..."]}`, paired by position
/// - `{"insights": [{"text": "...", "recommendation": "..."}]}`
/// - bulleted or numbered lines, split into insights and recommendations by the nearest heading
pub(super) fn insights(text: &str) -> Option<Vec<Insight>> {
    let (observations, recommendations) = match json_object(text) {
        Some(object) => insights_from_json(object),
        None => insights_from_lines(text),
    };
    let insights = pair(observations, recommendations);
    (!insights.is_empty()).then_some(insights)
}

fn insights_from_json(mut object: Map<String, Value>) -> (Vec<Insight>, Vec<String>) {
    let observations = match object.remove("insights") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(Insight {
                    text: clean(&s),
                    recommendation: None,
                }),
                Value::Object(o) => {
                    let text = ["text", "insight", "observation"]
                        .iter()
                        .find_map(|k| o.get(*k).and_then(Value::as_str))?;
                    Some(Insight {
                        text: clean(text),
                        recommendation: o
                            .get("recommendation")
                            .and_then(Value::as_str)
                            .map(clean)
                            .filter(|r| !r.is_empty()),
                    })
                }
                _ => None,
            })
            .filter(|i| !i.text.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    let recommendations = match object.remove("recommendations") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(clean)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    (observations, recommendations)
}

fn insights_from_lines(text: &str) -> (Vec<Insight>, Vec<String>) {
    let mut observations = Vec::new();
    let mut recommendations = Vec::new();
    let mut in_recommendations = false;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match strip_bullet(line) {
            Some(item) => {
                let item = clean(item);
                if item.is_empty() {
                    continue;
                }
                if in_recommendations {
                    recommendations.push(item);
                } else {
                    observations.push(Insight {
                        text: item,
                        recommendation: None,
                    });
                }
            }
            None => {
                let heading = line.to_lowercase();
                if heading.contains("recommend") {
                    in_recommendations = true;
                } else if heading.contains("insight") || heading.contains("observation") {
                    in_recommendations = false;
                }
            }
        }
    }
    (observations, recommendations)
}

/// Fills in recommendations by position. Extra recommendations get their own entry.
fn pair(mut insights: Vec<Insight>, recommendations: Vec<String>) -> Vec<Insight> {
    let mut extra = Vec::new();
    let mut open = insights.iter_mut().filter(|i| i.recommendation.is_none());
    for recommendation in recommendations {
        match open.next() {
            Some(insight) => insight.recommendation = Some(recommendation),
            None => extra.push(Insight {
                text: UNPAIRED_RECOMMENDATION.to_string(),
                recommendation: Some(recommendation),
            }),
        }
    }
    insights.extend(extra);
    insights
}

fn string_pairs(object: Map<String, Value>) -> HashMap<String, String> {
    object
        .into_iter()
        .filter_map(|(k, v)| Some((normalize(&k), normalize(v.as_str()?))))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

/// Lines of the form `key: value`, `key -> value` or `key => value`, normalized.
fn key_value_lines(text: &str) -> HashMap<String, String> {
    split_lines(text)
        .map(|(k, v)| (normalize(k), normalize(v)))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

fn split_lines(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let line = line.trim();
        let line = strip_bullet(line).unwrap_or(line);
        ["->", "=>", ":"]
            .iter()
            .find_map(|sep| line.split_once(*sep))
    })
}

/// Returns the item text if `line` starts with `-`, `*`, `•` or `1.` / `1)`.
fn strip_bullet(line: &str) -> Option<&str> {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest);
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest);
        }
    }
    None
}

/// Lowercased, trimmed, without surrounding quotes or markdown emphasis.
fn normalize(s: &str) -> String {
    clean(s).to_lowercase()
}

fn clean(s: &str) -> String {
    s.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*' | ','))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object_in_prose() {
        let text = "Sure! Here you go:\n```json\n{\"a\": {\"b\": 1}}\n```\nLet me know {if} that helps.";
        let object = json_object(text).unwrap();
        assert_eq!(object["a"]["b"], 1);
    }

    #[test]
    fn test_json_object_skips_broken_braces() {
        let text = "{not json} then {\"ok\": true}";
        assert_eq!(json_object(text).unwrap()["ok"], true);
        assert!(json_object("no braces at all").is_none());
    }

    #[test]
    fn test_assignments_well_formed() {
        let text = r#"{"assignments": {"Matcha Latte": "Coffee", "shell": "gas"}}"#;
        let map = assignments(text).unwrap();
        assert_eq!(map["matcha latte"], "coffee");
        assert_eq!(map["shell"], "gas");
    }

    #[test]
    fn test_assignments_flat_object() {
        let map = assignments(r#"Here: {"chipotle": "food", "count": 3}"#).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["chipotle"], "food");
    }

    #[test]
    fn test_assignments_grouped_categories() {
        let text = r#"{"categories": [
            {"name": "Coffee", "total_amount": 10.5, "descriptions": ["matcha latte", "coffee"]},
            {"name": "Food", "descriptions": ["lunch"]},
            {"descriptions": ["ignored"]}
        ]}"#;
        let map = assignments(text).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["lunch"], "food");
    }

    #[test]
    fn test_assignments_categories_object() {
        let map = assignments(r#"{"categories": {"Matcha Latte": "Coffee", "shell": "gas"}}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["matcha latte"], "coffee");
        assert_eq!(map["shell"], "gas");
    }

    #[test]
    fn test_assignments_lines() {
        let text = "Here are the categories:\n\n- matcha latte -> coffee\n* **shell**: gas\n3. netflix => entertainment\nthanks";
        let map = assignments(text).unwrap();
        assert_eq!(map["matcha latte"], "coffee");
        assert_eq!(map["shell"], "gas");
        assert_eq!(map["netflix"], "entertainment");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_assignments_malformed() {
        assert!(assignments("I cannot help with that.").is_none());
        assert!(assignments("").is_none());
        assert!(assignments(r#"{"assignments": ["coffee"]}"#).is_none());
    }

    #[test]
    fn test_notes() {
        let map = notes(r#"{"notes": {"Matcha Latte": "Four a month adds up."}}"#).unwrap();
        assert_eq!(map["matcha latte"], "Four a month adds up.");
        let map = notes("- matcha latte: Four a month Adds up.").unwrap();
        assert_eq!(map["matcha latte"], "Four a month Adds up.");
        assert!(notes(r#"{"patterns": ["x"]}"#).is_none());
        assert!(notes("nothing useful").is_none());
    }

    #[test]
    fn test_insights_paired() {
        let text = r#"{"insights": ["Coffee is 40% of spend", "Rent is stable"],
                       "recommendations": ["Brew at home", "Keep it up", "Review subscriptions"]}"#;
        let insights = insights(text).unwrap();
        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].text, "Coffee is 40% of spend");
        assert_eq!(insights[0].recommendation.as_deref(), Some("Brew at home"));
        assert_eq!(insights[1].recommendation.as_deref(), Some("Keep it up"));
        assert_eq!(insights[2].text, UNPAIRED_RECOMMENDATION);
    }

    #[test]
    fn test_insights_objects() {
        let text = r#"{"insights": [{"text": "Coffee is high", "recommendation": "Brew at home"},
                                    {"insight": "Gas is steady"}, 7]}"#;
        let insights = insights(text).unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[1].text, "Gas is steady");
        assert_eq!(insights[1].recommendation, None);
    }

    #[test]
    fn test_insights_lines() {
        let text = "Insights:\n1. Coffee is high\n2) Gas is steady\n\nRecommendations:\n- Brew at home\n";
        let insights = insights(text).unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].recommendation.as_deref(), Some("Brew at home"));
        assert_eq!(insights[1].recommendation, None);
    }

    #[test]
    fn test_insights_malformed() {
        assert!(insights("The model is thinking...").is_none());
        assert!(insights(r#"{"insights": "not a list"}"#).is_none());
        assert!(insights(r#"{"summary": "nothing here"}"#).is_none());
    }
}
