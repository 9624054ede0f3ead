use crate::{CollectedInput, TaskSpec};

/// Prompt templates for the generator
pub struct GeneratorPrompts;

impl GeneratorPrompts {
    /// Build the first-iteration generation prompt
    pub fn build_generation_prompt(spec: &TaskSpec, input: &CollectedInput) -> String {
        format!(
            r#"You are an expert document synthesizer. Produce one complete draft of the artifact described below, built strictly from the collected input.

## Purpose
{purpose}

## Desired Output Shape
```json
{shape}
```

## Collected Input
```json
{facts}
```

---

## Rules

- Use ONLY facts present in the collected input. Never invent names, numbers, dates, or any other data that is not there.
- Fill the structured data to match the desired output shape as closely as the collected input allows.
- The rendered output is what a person will read: clean, well-formatted, complete sentences.
- Rate your own confidence honestly on a 1-10 scale.

## Required Response Format

Respond with a single JSON object and nothing else:

{{"title": "...", "summary": "...", "structured_data": {{...}}, "rendered_output": "...", "confidence": 7.5, "notes": "..."}}"#,
            purpose = spec.purpose,
            shape = shape_json(spec),
            facts = truncate_input(&facts_json(input), 20000),
        )
    }

    /// Build the prompt for a refinement iteration (includes evaluator feedback)
    pub fn build_refinement_prompt(
        spec: &TaskSpec,
        input: &CollectedInput,
        feedback: &str,
    ) -> String {
        format!(
            r#"You are an expert document synthesizer. A previous draft of this artifact was reviewed and not approved. Produce an improved draft.

## Purpose
{purpose}

## Desired Output Shape
```json
{shape}
```

## Collected Input
```json
{facts}
```

## Reviewer Feedback
{feedback}

---

## Rules

- Address every point in the reviewer feedback.
- Do NOT contradict the collected input while doing so; the feedback never licenses inventing data that is not there.
- Keep everything that the feedback did not flag.
- Rate your own confidence honestly on a 1-10 scale.

## Required Response Format

Respond with a single JSON object and nothing else:

{{"title": "...", "summary": "...", "structured_data": {{...}}, "rendered_output": "...", "confidence": 7.5, "notes": "..."}}"#,
            purpose = spec.purpose,
            shape = shape_json(spec),
            facts = truncate_input(&facts_json(input), 20000),
            feedback = feedback,
        )
    }
}

fn shape_json(spec: &TaskSpec) -> String {
    serde_json::to_string_pretty(&spec.output_shape).unwrap_or_else(|_| "{}".to_string())
}

fn facts_json(input: &CollectedInput) -> String {
    serde_json::to_string_pretty(&input.facts).unwrap_or_else(|_| "{}".to_string())
}

fn truncate_input(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    // max_len may land inside a multibyte character
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    // Try to truncate at a line boundary
    if let Some(pos) = text[..cut].rfind('\n') {
        &text[..pos]
    } else {
        &text[..cut]
    }
}
