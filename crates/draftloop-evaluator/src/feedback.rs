use std::fmt::Write;

use crate::EvaluationResult;

/// Turn an evaluation into guidance the generator can act on.
///
/// Every issue is carried into the output so refinement converges on the
/// reviewer's findings instead of "try again". An evaluation with no issues
/// still yields a non-empty string, since the loop always needs something to
/// hand the generator.
pub fn format_feedback(evaluation: &EvaluationResult) -> String {
    if evaluation.issues.is_empty() {
        let prose = evaluation.feedback.trim();
        if prose.is_empty() {
            return "The previous draft was close but not approved. Re-check every fact against \
                    the collected input, fill any thin sections, and tighten the formatting of \
                    the rendered output."
                .to_string();
        }
        return prose.to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "The previous draft scored {:.1}/10 and was not approved. Address every issue below:",
        evaluation.score
    );
    for (index, issue) in evaluation.issues.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, issue);
    }
    let prose = evaluation.feedback.trim();
    if !prose.is_empty() {
        let _ = writeln!(out, "\nReviewer notes: {}", prose);
    }
    out.trim_end().to_string()
}
