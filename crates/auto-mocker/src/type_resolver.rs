//! Maps a requested handle type to what actually gets built.

use crate::catalog::{Catalog, Upcast};
use crate::error::{Error, Result};
use crate::helpers::{Named, TypeKey};
use crate::provider::ProviderObject;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) enum TypeMapping {
  Class { class: TypeKey, upcast: Upcast },
  Factory(Arc<dyn ProviderObject>),
}

#[derive(Clone)]
pub(crate) enum Target {
  /// A class or value type, built as requested.
  Concrete(TypeKey),
  /// A class implementing the requested contract.
  Implementation { class: TypeKey, upcast: Upcast },
  Factory(Arc<dyn ProviderObject>),
}

/// Explicit contract mappings of one session.
#[derive(Default)]
pub(crate) struct TypeMappings {
  map: BTreeMap<TypeId, Named<TypeMapping>>,
}

impl TypeMappings {
  pub fn insert(&mut self, key: TypeKey, mapping: TypeMapping) {
    tracing::debug!(contract = key.name, "type mapping registered");
    self.map.insert(key.id, key.named(mapping));
  }

  pub fn get(&self, key: &TypeKey) -> Option<&TypeMapping> {
    self.map.get(&key.id).map(|named| &named.value)
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }
}

/// Resolves `requested` in order: concrete types as-is, explicit mappings,
/// then the single class of the catalog implementing it directly.
pub(crate) fn resolve(catalog: &Catalog, mappings: &TypeMappings, requested: &TypeKey) -> Result<Target> {
  if catalog.is_concrete(requested) {
    return Ok(Target::Concrete(*requested));
  }

  if let Some(mapping) = mappings.get(requested) {
    return Ok(match mapping.clone() {
      TypeMapping::Class { class, upcast } => {
        tracing::debug!(contract = requested.name, class = class.name, "resolved through type mapping");
        Target::Implementation { class, upcast }
      }
      TypeMapping::Factory(provider) => {
        tracing::debug!(contract = requested.name, "resolved through factory");
        Target::Factory(provider)
      }
    });
  }

  let mut implementations = catalog.implementations_of(requested);
  match implementations.len() {
    0 => Err(Error::UnresolvedType(requested.name)),
    1 => {
      let (class, upcast) = implementations.remove(0);
      tracing::debug!(contract = requested.name, class = class.name, "resolved through catalog scan");
      Ok(Target::Implementation { class, upcast })
    }
    _ => {
      let mut candidates: Vec<_> = implementations.iter().map(|(class, _)| class.name).collect();
      candidates.sort_unstable();
      Err(Error::AmbiguousResolution {
        contract: requested.name,
        candidates,
      })
    }
  }
}
