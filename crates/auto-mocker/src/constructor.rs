//! Chooses which constructor of a class to invoke.

use crate::builder::BuildContext;
use crate::catalog::{ClassInfo, Constructor, Resolvable, Visibility};
use crate::error::{Error, Result};
use crate::helpers::{AnyRef, TypeKey};
use crate::parameter;
use std::any::TypeId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// An ordered list of literal constructor arguments.
///
/// A constructor matches when its parameter types are exactly the argument
/// types, position by position.
#[derive(Clone, Default)]
pub struct Args {
  values: Vec<(TypeKey, AnyRef)>,
}

impl Args {
  pub fn new() -> Self {
    Args::default()
  }

  pub fn with<T: Resolvable>(mut self, value: T) -> Self {
    self.push(value);
    self
  }

  pub fn push<T: Resolvable>(&mut self, value: T) -> &mut Self {
    self.values.push((TypeKey::of::<T>(), Arc::new(value)));
    self
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  fn matches(&self, params: &[TypeKey]) -> bool {
    self.values.len() == params.len()
      && self.values.iter().zip(params).all(|((key, _), param)| key == param)
  }

  fn values(&self) -> Vec<AnyRef> {
    self.values.iter().map(|(_, value)| value.clone()).collect()
  }
}

pub(crate) struct Selection {
  pub constructor: Constructor,
  pub values: Vec<AnyRef>,
}

/// Picks the constructor of `class` to invoke along with its arguments.
///
/// The richest viable constructor wins. Equally rich candidates are an
/// error unless one's parameter set strictly contains the other's. When no public
/// constructor is viable, the search is repeated with non-public ones,
/// except in strict mode.
pub(crate) fn select(
  ctx: &mut BuildContext<'_>,
  class: &ClassInfo,
  explicit: Option<&Args>,
  include_non_public: bool,
) -> Result<Selection> {
  let mut first_failure = None;

  if let Some(selection) = search(ctx, class, explicit, include_non_public, &mut first_failure)? {
    return Ok(selection);
  }

  if !include_non_public && !ctx.session.config.strict {
    tracing::trace!(class = class.key.name, "no viable public constructor, including non-public");
    if let Some(selection) = search(ctx, class, explicit, true, &mut first_failure)? {
      return Ok(selection);
    }
  }

  Err(first_failure.unwrap_or(Error::NoMatchingConstructor(class.key.name)))
}

fn candidates(class: &ClassInfo, include_non_public: bool) -> Vec<&Constructor> {
  let mut candidates: Vec<_> = class.constructors
    .iter()
    .filter(|c| include_non_public || c.visibility == Visibility::Public)
    .collect();
  // Stable, so declaration order is kept among equal arities.
  candidates.sort_by(|a, b| b.arity().cmp(&a.arity()));
  candidates
}

fn search(
  ctx: &mut BuildContext<'_>,
  class: &ClassInfo,
  explicit: Option<&Args>,
  include_non_public: bool,
  first_failure: &mut Option<Error>,
) -> Result<Option<Selection>> {
  let candidates = candidates(class, include_non_public);

  if let Some(args) = explicit {
    return Ok(candidates
      .into_iter()
      .find(|c| args.matches(&c.params))
      .map(|c| Selection {
        constructor: c.clone(),
        values: args.values(),
      }));
  }

  let mut start = 0;
  while start < candidates.len() {
    let arity = candidates[start].arity();
    let end = candidates[start..]
      .iter()
      .position(|c| c.arity() != arity)
      .map_or(candidates.len(), |offset| start + offset);

    let mut viable = Vec::new();
    for constructor in &candidates[start..end] {
      match resolve_all(ctx, constructor) {
        Ok(values) => viable.push(Selection {
          constructor: (*constructor).clone(),
          values,
        }),
        Err(err @ Error::CyclicDependency(_)) => return Err(err),
        Err(err) => {
          tracing::trace!(class = class.key.name, arity, error = %err, "constructor not viable");
          if first_failure.is_none() {
            *first_failure = Some(err);
          }
        }
      }
    }

    if !viable.is_empty() {
      return pick(class, arity, viable).map(Some);
    }
    start = end;
  }

  Ok(None)
}

fn resolve_all(ctx: &mut BuildContext<'_>, constructor: &Constructor) -> Result<Vec<AnyRef>> {
  constructor.params
    .iter()
    .map(|key| parameter::resolve_parameter(ctx, key))
    .collect()
}

fn pick(class: &ClassInfo, arity: usize, mut viable: Vec<Selection>) -> Result<Selection> {
  if viable.len() == 1 {
    return Ok(viable.remove(0));
  }

  let sets: Vec<BTreeSet<TypeId>> = viable
    .iter()
    .map(|s| s.constructor.params.iter().map(|p| p.id).collect())
    .collect();

  // Only a strict subset loses; identical sets are a genuine tie.
  let survivors: Vec<usize> = sets
    .iter()
    .enumerate()
    .filter(|(_, set)| !sets.iter().any(|other| set.is_subset(other) && *set != other))
    .map(|(index, _)| index)
    .collect();

  match survivors.as_slice() {
    [index] => Ok(viable.swap_remove(*index)),
    _ => Err(Error::AmbiguousConstructor {
      type_name: class.key.name,
      arity,
      count: survivors.len(),
    }),
  }
}
