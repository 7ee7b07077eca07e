//! Decides the value of a single constructor parameter.

use crate::builder::{self, BuildContext};
use crate::catalog::Resolvable;
use crate::error::Result;
use crate::helpers::{AnyRef, Named, TypeKey};
use crate::registry;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Values that take precedence over every other rule for the duration of
/// one resolution call, including nested dependencies.
#[derive(Clone, Default)]
pub struct Overrides {
  values: BTreeMap<TypeId, Named<AnyRef>>,
}

impl Overrides {
  pub fn new() -> Self {
    Overrides::default()
  }

  pub fn with<T: Resolvable>(mut self, value: T) -> Self {
    self.insert(value);
    self
  }

  pub fn insert<T: Resolvable>(&mut self, value: T) -> &mut Self {
    let key = TypeKey::of::<T>();
    self.values.insert(key.id, key.named(Arc::new(value) as AnyRef));
    self
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub(crate) fn get(&self, key: &TypeKey) -> Option<&AnyRef> {
    self.values.get(&key.id).map(|named| &named.value)
  }
}

/// Resolves one parameter, in priority order:
///
/// 1. an override of the current call;
/// 2. a well-known convenience instance, unless the session is strict;
/// 3. the default of a value type;
/// 4. the product of an explicit type mapping or factory;
/// 5. the session substitute of a contract;
/// 6. anything else is built, never substituted.
pub(crate) fn resolve_parameter(ctx: &mut BuildContext<'_>, key: &TypeKey) -> Result<AnyRef> {
  if let Some(value) = ctx.overrides.get(key) {
    tracing::trace!(parameter = key.name, "using override");
    return Ok(value.clone());
  }

  if !ctx.session.config.strict {
    if let Some(value) = ctx.session.well_known.get(key) {
      tracing::trace!(parameter = key.name, "using well-known instance");
      return Ok(value);
    }
  }

  if let Some(value) = ctx.session.catalog.value_info(key) {
    return Ok((value.default)());
  }

  if ctx.session.mappings.get(key).is_some() {
    return builder::build(ctx, key, None);
  }

  if let Some(contract) = ctx.session.catalog.contract_info(key).cloned() {
    return registry::get_or_create(ctx, &contract).map(|stored| stored.handle);
  }

  builder::build(ctx, key, None)
}
