use draftloop_generator::{Candidate, CollectedInput, TaskSpec};

/// Prompt templates for the evaluator
pub struct EvaluatorPrompts;

impl EvaluatorPrompts {
    /// Build the evaluation prompt for one candidate
    pub fn build_evaluation_prompt(
        spec: &TaskSpec,
        input: &CollectedInput,
        candidate: &Candidate,
        iteration: usize,
    ) -> String {
        format!(
            r#"You are a rigorous quality reviewer. Judge whether the draft artifact below is ready to return to the caller.

## Purpose
{purpose}

## Desired Output Shape
```json
{shape}
```

## Collected Input (the only permitted source of facts)
```json
{facts}
```

## Draft Under Review
Title: {title}
Summary: {summary}

Structured data:
```json
{structured}
```

Rendered output:
```
{rendered}
```

## Context
This is iteration {iteration} of the refinement loop.

---

## Scoring Rubric

Score each axis from 0 to 10:

1. **accuracy** - Every fact in the draft must appear in the collected input. Invented names, numbers, or dates are severe failures.
2. **completeness** - Every field implied by the desired output shape should be filled, so far as the collected input allows.
3. **formatting** - The rendered output reads cleanly: no broken markup, no dangling placeholders, consistent structure.

Then give an overall **score** (0-10) and an independent **approved** judgment: would you ship this as-is? A draft can score well and still not be approvable, or the reverse.

## Issue List Rules

- Each issue must be concrete and addressable ("The total on line 3 does not appear in the collected input"), never generic commentary ("could be better").
- Order issues most important first.
- The feedback prose must be directly actionable by the author of the draft.

## Required Response Format

Respond with a single JSON object and nothing else:

{{"approved": false, "score": 6.5, "sub_scores": {{"accuracy": 7.0, "completeness": 6.0, "formatting": 6.5}}, "issues": ["..."], "feedback": "..."}}"#,
            purpose = spec.purpose,
            shape = to_pretty_json(&spec.output_shape),
            facts = truncate_output(&to_pretty_json(&input.facts), 20000),
            title = candidate.title,
            summary = candidate.summary,
            structured = truncate_output(&to_pretty_json(&candidate.structured_data), 10000),
            rendered = truncate_output(&candidate.rendered_output, 10000),
            iteration = iteration,
        )
    }
}

fn to_pretty_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn truncate_output(output: &str, max_len: usize) -> &str {
    if output.len() <= max_len {
        return output;
    }
    // max_len may land inside a multibyte character
    let mut cut = max_len;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    if let Some(pos) = output[..cut].rfind('\n') {
        &output[..pos]
    } else {
        &output[..cut]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluation_prompt_carries_all_sections() {
        let spec = TaskSpec::new("summarize an incident", json!({"severity": "string"}));
        let input = CollectedInput::new(json!({"incident": "db outage"}));
        let candidate = Candidate {
            title: "Outage Report".into(),
            summary: "Database went down".into(),
            structured_data: json!({"severity": "high"}),
            rendered_output: "<p>report</p>".into(),
            confidence: 7.0,
            notes: String::new(),
            iteration: 1,
        };
        let prompt = EvaluatorPrompts::build_evaluation_prompt(&spec, &input, &candidate, 1);
        assert!(prompt.contains("summarize an incident"));
        assert!(prompt.contains("db outage"));
        assert!(prompt.contains("Outage Report"));
        assert!(prompt.contains("iteration 1"));
    }

    #[test]
    fn test_truncate_inside_multibyte_char() {
        let text = "ü".repeat(12);
        for max_len in 1..text.len() {
            let truncated = truncate_output(&text, max_len);
            assert!(truncated.len() <= max_len);
            assert!(text.starts_with(truncated));
        }
    }

    #[test]
    fn test_evaluation_prompt_survives_large_multibyte_rendering() {
        let spec = TaskSpec::new("summarize notes", json!({}));
        let input = CollectedInput::new(json!({}));
        let candidate = Candidate {
            title: "Notes".into(),
            summary: String::new(),
            structured_data: json!({}),
            rendered_output: "résumé → done ".repeat(1000),
            confidence: 5.0,
            notes: String::new(),
            iteration: 1,
        };
        let prompt = EvaluatorPrompts::build_evaluation_prompt(&spec, &input, &candidate, 1);
        assert!(prompt.contains("Notes"));
    }
}
