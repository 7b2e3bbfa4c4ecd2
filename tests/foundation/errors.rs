//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use deduce_foundation::{Error, ErrorContext, ErrorKind, Label, SemanticLimit};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_illegal_concludable() {
    let err = Error::illegal_concludable("relation without role players");
    assert!(matches!(err.kind, ErrorKind::IllegalConcludable(_)));
    assert!(err.to_string().contains("role players"));
}

#[test]
fn error_unresolved_type() {
    let err = Error::unresolved_type(Label::of("planet"));
    assert!(matches!(err.kind, ErrorKind::UnresolvedType(ref label) if label.name() == "planet"));
    assert!(err.to_string().contains("planet"));
}

#[test]
fn error_unsupported_negation() {
    let err = Error::unsupported_negation("nested negation");
    assert!(matches!(err.kind, ErrorKind::UnsupportedNegationShape(_)));
    assert!(err.to_string().starts_with("unsupported negation"));
}

#[test]
fn error_storage_and_internal() {
    assert!(matches!(Error::storage("x").kind, ErrorKind::Storage(_)));
    assert!(matches!(Error::internal("x").kind, ErrorKind::Internal(_)));
}

// =============================================================================
// Limits
// =============================================================================

#[test]
fn limit_max_iterations() {
    let err = Error::limit_exceeded(SemanticLimit::MaxIterations { limit: 32 });
    assert!(err.to_string().contains("max iterations (32)"));
}

#[test]
fn limit_explanation_depth_names_rule() {
    let err = Error::limit_exceeded(SemanticLimit::MaxExplanationDepth {
        limit: 4,
        rule: Some("transitive-location".to_string()),
    });
    let msg = err.to_string();
    assert!(msg.contains("(4)"));
    assert!(msg.contains("transitive-location"));
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn error_context_display() {
    let context = ErrorContext::new()
        .with_rule("located-in-country")
        .with_pattern("{ $x isa city; }")
        .with_frame("resolving $x isa city");
    let text = context.to_string();
    assert!(text.starts_with("in rule located-in-country at { $x isa city; }"));
    assert!(text.contains("  in resolving $x isa city"));
}

#[test]
fn error_with_context_keeps_kind() {
    let err = Error::illegal_concludable("bad head").with_context(ErrorContext::new().with_rule("r"));
    assert!(matches!(err.kind, ErrorKind::IllegalConcludable(_)));
    assert_eq!(err.context.and_then(|c| c.rule), Some("r".to_string()));
}
