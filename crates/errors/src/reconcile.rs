//! Reconciler error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    #[error("invalid sink reference `{entry}`: expected `kind:name`")]
    InvalidSinkRef { entry: String },

    #[error("unknown sink kind: {kind}")]
    UnknownSinkKind { kind: String },

    #[error("unknown data link strategy: {strategy}")]
    UnknownStrategy { strategy: String },
}
