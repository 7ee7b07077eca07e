use thiserror::Error;
use std::sync::Arc;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Resolution failures.
///
/// Every variant is a test-authoring defect: they are raised where the
/// resolution happens and are never retried.
#[derive(Error, Debug, Clone)]
pub enum Error {
  #[error("unresolved type: {0} has no type mapping and no implementation in the catalog")]
  UnresolvedType(&'static str),
  #[error("ambiguous resolution for {contract}: implemented by {}", .candidates.join(", "))]
  AmbiguousResolution {
    contract: &'static str,
    candidates: Vec<&'static str>,
  },
  #[error("no matching constructor for {0}")]
  NoMatchingConstructor(&'static str),
  #[error("ambiguous constructor for {type_name}: {count} constructors take {arity} parameters")]
  AmbiguousConstructor {
    type_name: &'static str,
    arity: usize,
    count: usize,
  },
  #[error("duplicate registration: a substitute for {0} is already registered")]
  DuplicateRegistration(&'static str),
  #[error("cyclic dependency: {}", .0.join(" -> "))]
  CyclicDependency(Vec<&'static str>),
  #[error("type mismatch for: {0}")]
  TypeMismatch(&'static str),
  #[error("factory: {0}")]
  Factory(Arc<anyhow::Error>),
}
