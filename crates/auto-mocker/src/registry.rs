//! Identity cache of one substitute per contract.

use crate::builder::{self, BuildContext};
use crate::catalog::{ContractInfo, ContractKind};
use crate::error::{Error, Result};
use crate::helpers::{AnyRef, Named, TypeKey};
use crate::substitute::{Contract, Substitute};
use crate::type_resolver;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A substitute with its type erased.
#[derive(Clone)]
pub(crate) struct StoredSubstitute {
  substitute: AnyRef,
  pub handle: AnyRef,
}

impl StoredSubstitute {
  pub fn new<T>(substitute: Substitute<T>) -> Self
    where T: ?Sized + Contract
  {
    StoredSubstitute {
      handle: Arc::new(substitute.object()),
      substitute: Arc::new(substitute),
    }
  }

  pub fn downcast<T>(&self) -> Option<Substitute<T>>
    where T: ?Sized + Contract
  {
    self.substitute.downcast_ref::<Substitute<T>>().cloned()
  }
}

#[derive(Default)]
pub(crate) struct MockRegistry {
  entries: BTreeMap<TypeId, Named<StoredSubstitute>>,
}

impl MockRegistry {
  pub fn get(&self, key: &TypeKey) -> Option<&StoredSubstitute> {
    self.entries.get(&key.id).map(|named| &named.value)
  }

  pub fn contains(&self, key: &TypeKey) -> bool {
    self.entries.contains_key(&key.id)
  }

  pub fn add(&mut self, key: TypeKey, substitute: StoredSubstitute, overwrite: bool) -> Result<()> {
    if !overwrite && self.contains(&key) {
      return Err(Error::DuplicateRegistration(key.name));
    }
    if self.entries.insert(key.id, key.named(substitute)).is_some() {
      tracing::debug!(contract = key.name, "substitute replaced");
    }
    Ok(())
  }

  pub fn remove(&mut self, key: &TypeKey) -> bool {
    let removed = self.entries.remove(&key.id).is_some();
    if removed {
      tracing::debug!(contract = key.name, "substitute removed");
    }
    removed
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

/// Returns the session's substitute for `contract`, creating it on first use.
///
/// The contract must resolve to an implementation even when the substitute
/// has no base, so that substitutes exist only for contracts the catalog (or
/// a mapping) can satisfy. A base for an overridable contract is built
/// through the object builder, which also guards against cycles.
pub(crate) fn get_or_create(ctx: &mut BuildContext<'_>, contract: &ContractInfo) -> Result<StoredSubstitute> {
  if let Some(existing) = ctx.session.registry.get(&contract.key) {
    return Ok(existing.clone());
  }

  let strict = ctx.session.config.strict;
  let base = match contract.kind {
    ContractKind::Overridable if !strict => Some(builder::build(ctx, &contract.key, None)?),
    _ => {
      type_resolver::resolve(&ctx.session.catalog, &ctx.session.mappings, &contract.key)?;
      None
    }
  };

  let stored = (contract.create)(strict, base.as_ref())?;
  ctx.session.registry.add(contract.key, stored.clone(), true)?;
  tracing::debug!(contract = contract.key.name, strict, partial = base.is_some(), "substitute created");
  Ok(stored)
}
