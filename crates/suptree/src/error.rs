//! Error kinds of the support generator.
//!
//! Only conditions the caller must react to surface as errors. A support
//! point that cannot be routed is not one of them; those are collected per
//! build and reported as index lists.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
  /// The configuration cannot produce any valid support tree. Reported
  /// before any work starts.
  #[error("invalid support configuration: {0}")]
  ConfigInvalid(String),

  /// The cancel predicate fired. Partial builder state may be inspected
  /// but must not be sliced.
  #[error("support generation cancelled")]
  Cancelled,

  /// A support-point text blob failed to parse.
  #[error("malformed support point entry at line {0}")]
  MalformedSupportPoint(usize),
}
