//! Analyzer-fatal errors.

/// Errors that abort the analysis of a module.
///
/// Non-fatal conservativeness findings go through
/// [`crate::diag::DiagnosticSink`] instead.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A library call whose operand count matches no known signature.
    #[error("unsupported signature: call to `{name}` with {arity} operands")]
    UnsupportedCall { name: String, arity: usize },

    /// The metadata oracle kept reporting a function as unknown after the
    /// explorer had already assumed it conflicting.
    #[error("metadata oracle still reports `{name}` as unknown after it was assumed conflicting")]
    AssumptionViolated { name: String },
}
