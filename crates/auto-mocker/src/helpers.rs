use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

pub type BoxAny = Box<dyn Any + Send + Sync>;

// Resolved handles are shared between the caches and every consumer, and are
// cloned out by downcasting to the concrete handle type.
pub type AnyRef = Arc<dyn Any + Send + Sync>;

pub struct Named<T> {
  pub name: &'static str,
  pub value: T,
}

impl<T> fmt::Debug for Named<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Named")
      .field("name", &self.name)
      .finish()
  }
}

impl<T> Clone for Named<T>
  where T: Clone
{
  fn clone(&self) -> Self {
    Named {
      name: self.name,
      value: self.value.clone(),
    }
  }
}

/// Identity of a resolvable handle type.
///
/// Equality and ordering only consider the `TypeId`; the name is carried
/// for error messages and logs.
#[derive(Clone, Copy)]
pub struct TypeKey {
  pub id: TypeId,
  pub name: &'static str,
}

impl TypeKey {
  pub fn of<T: ?Sized + 'static>() -> Self {
    TypeKey {
      id: TypeId::of::<T>(),
      name: type_name::<T>(),
    }
  }

  pub fn named<U>(&self, value: U) -> Named<U> {
    Named {
      name: self.name,
      value,
    }
  }
}

impl PartialEq for TypeKey {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TypeKey {}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}
