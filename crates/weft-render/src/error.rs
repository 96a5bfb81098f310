use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The node kind has no host representation in this reconciler.
    #[error("unsupported node: {kind}")]
    UnsupportedNode { kind: String },
    /// A previous node was patched in place but never reached the host.
    #[error("previous {kind} node has no host element")]
    NotMounted { kind: &'static str },
}
