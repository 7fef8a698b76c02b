// src/services/normalizer.rs
//! Turns whatever text the vision model replied with into an [`AnalysisResult`].
//!
//! Three strategies are tried in order and the first that matches wins:
//! a JSON parse, a line scanner that follows section headings and list
//! items, and finally the whole reply as a single insight. The last one
//! always matches, so normalization never fails.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::{AnalysisResult, Annotation, Strategy};

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-•]|[0-9]+\.)\s*").expect("list marker pattern is valid"));

const CHAIN: [Strategy; 3] = [
    Strategy::Structured,
    Strategy::SectionScan,
    Strategy::WholeText,
];

pub fn normalize(raw: &str) -> AnalysisResult {
    normalize_with_strategy(raw).0
}

pub fn normalize_with_strategy(raw: &str) -> (AnalysisResult, Strategy) {
    let (result, strategy) = CHAIN
        .iter()
        .find_map(|&strategy| attempt(strategy, raw).map(|result| (result, strategy)))
        .unwrap_or_else(|| (whole_text(raw), Strategy::WholeText));

    debug!(
        "Normalized {} byte reply via {:?}: {} ux / {} visual / {} best practice items, {} annotations",
        raw.len(),
        strategy,
        result.ux_insights.len(),
        result.visual_design.len(),
        result.best_practices.len(),
        result.annotations.len()
    );

    (result, strategy)
}

fn attempt(strategy: Strategy, raw: &str) -> Option<AnalysisResult> {
    match strategy {
        Strategy::Structured => parse_structured(raw),
        Strategy::SectionScan => scan_sections(raw),
        Strategy::WholeText => Some(whole_text(raw)),
    }
}

// Structured

/// Any valid JSON document matches, even one with none of the expected fields.
fn parse_structured(raw: &str) -> Option<AnalysisResult> {
    let value: Value = serde_json::from_str(raw).ok()?;

    Some(AnalysisResult {
        ux_insights: string_items(&value["uxInsights"]),
        visual_design: string_items(&value["visualDesign"]),
        best_practices: string_items(&value["bestPractices"]),
        annotations: annotations(&value["annotations"]),
    })
}

fn string_items(field: &Value) -> Vec<String> {
    field
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn annotations(field: &Value) -> Vec<Annotation> {
    field
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .map(|item| Annotation {
                    x: coordinate(&item["x"]),
                    y: coordinate(&item["y"]),
                    width: coordinate(&item["width"]),
                    height: coordinate(&item["height"]),
                    text: item["text"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn coordinate(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

// Section scan

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    UxInsights,
    VisualDesign,
    BestPractices,
}

impl Section {
    /// Keyword groups are checked in this order; the first hit wins.
    fn from_heading(line: &str) -> Option<Section> {
        let lower = line.to_lowercase();

        if contains_any(&lower, &["ux", "usability"]) {
            Some(Section::UxInsights)
        } else if contains_any(&lower, &["visual", "design"]) {
            Some(Section::VisualDesign)
        } else if contains_any(&lower, &["best", "practice"]) {
            Some(Section::BestPractices)
        } else {
            None
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Heading(Section),
    Item(&'a str),
    Other,
}

impl<'a> Line<'a> {
    fn classify(line: &'a str) -> Line<'a> {
        if let Some(section) = Section::from_heading(line) {
            return Line::Heading(section);
        }

        let trimmed = line.trim();
        match LIST_MARKER.find(trimmed) {
            Some(marker) => {
                let item = &trimmed[marker.end()..];
                if item.is_empty() {
                    Line::Other
                } else {
                    Line::Item(item)
                }
            }
            None => Line::Other,
        }
    }
}

/// Matches only when at least one list item landed in a section.
fn scan_sections(raw: &str) -> Option<AnalysisResult> {
    let mut result = AnalysisResult::default();
    let mut current = Section::UxInsights;

    for line in raw.lines().filter(|line| !line.trim().is_empty()) {
        match Line::classify(line) {
            Line::Heading(section) => current = section,
            Line::Item(item) => {
                let bucket = match current {
                    Section::UxInsights => &mut result.ux_insights,
                    Section::VisualDesign => &mut result.visual_design,
                    Section::BestPractices => &mut result.best_practices,
                };
                bucket.push(item.to_string());
            }
            Line::Other => {}
        }
    }

    (!result.is_empty()).then_some(result)
}

// Whole text

fn whole_text(raw: &str) -> AnalysisResult {
    AnalysisResult {
        ux_insights: vec![raw.to_string()],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn structured_reply_is_taken_as_is() {
        let (result, strategy) = normalize_with_strategy(
            r#"{"uxInsights":["a"],"visualDesign":[],"bestPractices":["b"]}"#,
        );
        assert_eq!(strategy, Strategy::Structured);
        assert_eq!(result.ux_insights, strings(&["a"]));
        assert!(result.visual_design.is_empty());
        assert_eq!(result.best_practices, strings(&["b"]));
        assert!(result.annotations.is_empty());
    }

    #[test]
    fn structured_reply_keeps_annotations() {
        let raw = r#"{
            "uxInsights": ["Primary action is hard to find"],
            "annotations": [
                {"x": 12, "y": 40.5, "width": 200, "height": 48, "text": "Low contrast button"},
                {"x": "8", "text": "Partial box"},
                "not an object"
            ]
        }"#;
        let result = normalize(raw);
        assert_eq!(result.annotations.len(), 2);
        assert_eq!(
            result.annotations[0],
            Annotation {
                x: 12.0,
                y: 40.5,
                width: 200.0,
                height: 48.0,
                text: "Low contrast button".into(),
            }
        );
        assert_eq!(
            result.annotations[1],
            Annotation {
                x: 8.0,
                text: "Partial box".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn structured_reply_without_known_fields_is_empty() {
        let (result, strategy) = normalize_with_strategy(r#"{"summary": "looks fine"}"#);
        assert_eq!(strategy, Strategy::Structured);
        assert_eq!(result, AnalysisResult::default());

        let (result, strategy) = normalize_with_strategy("42");
        assert_eq!(strategy, Strategy::Structured);
        assert!(result.is_empty());
    }

    #[test]
    fn structured_fields_of_the_wrong_shape_are_empty() {
        let result = normalize(
            r#"{"uxInsights":"one string","visualDesign":["ok", 3, null, true],"annotations":{}}"#,
        );
        assert!(result.ux_insights.is_empty());
        assert_eq!(result.visual_design, strings(&["ok", "3", "true"]));
        assert!(result.annotations.is_empty());
    }

    #[test]
    fn section_scan_follows_headings() {
        let (result, strategy) = normalize_with_strategy(
            "UX Insights\n- Good contrast\n- Confusing nav\nBest Practices\n1. Add alt text",
        );
        assert_eq!(strategy, Strategy::SectionScan);
        assert_eq!(result.ux_insights, strings(&["Good contrast", "Confusing nav"]));
        assert!(result.visual_design.is_empty());
        assert_eq!(result.best_practices, strings(&["Add alt text"]));
        assert!(result.annotations.is_empty());
    }

    #[test]
    fn section_scan_starts_in_ux_insights() {
        let result = normalize("Here is my take:\n• Buttons are too small\n\n   12.   Spacing is uneven  ");
        assert_eq!(
            result.ux_insights,
            strings(&["Buttons are too small", "Spacing is uneven"])
        );
    }

    #[test]
    fn section_scan_covers_all_three_sections() {
        let raw = "\
## Usability
- Search is buried
### Visual
- Palette feels dated
### Best practices
- Label form inputs
";
        let result = normalize(raw);
        assert_eq!(result.ux_insights, strings(&["Search is buried"]));
        assert_eq!(result.visual_design, strings(&["Palette feels dated"]));
        assert_eq!(result.best_practices, strings(&["Label form inputs"]));
    }

    #[test]
    fn keyword_lines_switch_without_appending() {
        let raw = "Visual notes\n- Increase UX writing clarity\n- Align icons";
        let result = normalize(raw);
        // The first bullet mentions "ux", so it only switches the section.
        assert_eq!(result.ux_insights, strings(&["Align icons"]));
        assert!(result.visual_design.is_empty());
    }

    #[test]
    fn ux_keywords_take_precedence_over_later_groups() {
        assert_eq!(
            Line::classify("Best UX design practices"),
            Line::Heading(Section::UxInsights)
        );
        assert_eq!(
            Line::classify("Design best practices"),
            Line::Heading(Section::VisualDesign)
        );
        assert_eq!(
            Line::classify("PRACTICE makes perfect"),
            Line::Heading(Section::BestPractices)
        );
    }

    #[test]
    fn bare_markers_and_prose_are_ignored() {
        assert_eq!(Line::classify("-"), Line::Other);
        assert_eq!(Line::classify("  3.   "), Line::Other);
        assert_eq!(Line::classify("Nothing stands out here."), Line::Other);
        assert_eq!(Line::classify("*starred item*"), Line::Other);
        assert_eq!(Line::classify("1) numbered"), Line::Other);
    }

    #[test]
    fn prose_falls_back_to_whole_text() {
        let raw = "This page looks fine overall.";
        let (result, strategy) = normalize_with_strategy(raw);
        assert_eq!(strategy, Strategy::WholeText);
        assert_eq!(result.ux_insights, strings(&[raw]));
        assert!(result.visual_design.is_empty());
        assert!(result.best_practices.is_empty());
        assert!(result.annotations.is_empty());
    }

    #[test]
    fn prose_with_design_keyword_still_falls_back() {
        let raw = "This design looks fine overall.";
        assert_eq!(normalize(raw).ux_insights, strings(&[raw]));
    }

    #[test]
    fn whole_text_keeps_the_original_untrimmed() {
        let raw = "  \nUX looks fine\n  ";
        let (result, strategy) = normalize_with_strategy(raw);
        assert_eq!(strategy, Strategy::WholeText);
        assert_eq!(result.ux_insights, vec![raw.to_string()]);
    }

    #[test]
    fn empty_input_yields_single_empty_insight() {
        let result = normalize("");
        assert_eq!(result.ux_insights, strings(&[""]));
        assert!(result.visual_design.is_empty());
        assert!(result.best_practices.is_empty());
        assert!(result.annotations.is_empty());
    }

    #[test]
    fn renormalizing_serialized_output_is_stable() {
        let inputs = [
            r#"{"uxInsights":["a"],"visualDesign":["b"],"bestPractices":[],"annotations":[{"x":1.5,"y":2,"width":3,"height":4,"text":"t"}]}"#,
            "UX\n- one\nVisual\n- two\nBest\n- three",
            "plain prose",
            "",
        ];
        for raw in inputs {
            let first = normalize(raw);
            let serialized = serde_json::to_string(&first).unwrap();
            assert_eq!(normalize(&serialized), first, "input: {raw:?}");
        }
    }
}
