//! Rendering of full explanation trees.

use std::collections::BTreeSet;
use std::fmt::Write;

use deduce_engine::{Answer, Explanation};

/// Summary of an explanation tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExplanationSummary {
    /// Labels of every rule applied anywhere in the tree.
    pub rules: BTreeSet<String>,
    /// Rule applications in the tree.
    pub applications: usize,
    /// Lookups the tree rests on.
    pub lookups: usize,
    /// Rule applications on the deepest path.
    pub depth: usize,
}

/// Counts what an answer's explanation is made of.
#[must_use]
pub fn summarize(answer: &Answer) -> ExplanationSummary {
    let mut summary = ExplanationSummary {
        depth: answer.explanation.depth(),
        ..ExplanationSummary::default()
    };
    let mut pending = vec![answer];
    while let Some(answer) = pending.pop() {
        match answer.explanation.as_ref() {
            Explanation::Lookup => summary.lookups += 1,
            Explanation::RuleApplication { rule, premise, .. } => {
                summary.applications += 1;
                summary.rules.insert(rule.to_string());
                pending.push(premise);
            }
            Explanation::Join { left, right } => {
                pending.push(left);
                pending.push(right);
            }
        }
    }
    summary
}

/// Renders an indented deduction tree, expanding at most `max_depth` rule
/// applications on any path.
///
/// ```text
/// {$x=#1 ...} by rule transitive-location
///   join
///     {$x=#1 ...} from storage
///     ...
/// ```
#[must_use]
pub fn render(answer: &Answer, max_depth: usize) -> String {
    let mut out = String::new();
    render_into(&mut out, answer, 0, max_depth);
    out
}

fn render_into(out: &mut String, answer: &Answer, indent: usize, remaining: usize) {
    let pad = "  ".repeat(indent);
    match answer.explanation.as_ref() {
        Explanation::Lookup => {
            let _ = writeln!(out, "{pad}{} from storage", answer.concepts);
        }
        Explanation::Join { left, right } => {
            let _ = writeln!(out, "{pad}{} by join", answer.concepts);
            render_into(out, left, indent + 1, remaining);
            render_into(out, right, indent + 1, remaining);
        }
        Explanation::RuleApplication {
            rule,
            unifier,
            premise,
        } => {
            let _ = writeln!(out, "{pad}{} by rule {rule} {unifier}", answer.concepts);
            if remaining == 0 {
                let _ = writeln!(out, "{pad}  ...");
            } else {
                render_into(out, premise, indent + 1, remaining - 1);
            }
        }
    }
}
