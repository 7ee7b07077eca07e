//! Registration table of the types a session can build.
//!
//! Rust has no runtime reflection, so the types a test wants resolved are
//! described here once: contracts (trait objects that can be substituted),
//! classes (concrete types with constructors) and value types (built from
//! their default). Scanning for implementations of a contract walks this
//! table.

use crate::helpers::{AnyRef, BoxAny, TypeKey};
use crate::substitute::{self, Contract, CreateSubstitute};
use crate::well_known;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A value that can flow through resolution: constructor parameters,
/// cached instances and substitute handles.
pub trait Resolvable: Clone + Send + Sync + 'static {}

impl<T> Resolvable for T
  where T: Clone + Send + Sync + 'static
{}

/// An ordered list of resolvable parameter types.
///
/// Implemented for tuples of up to eight [`Resolvable`] values so that one
/// generic entry point covers every constructor arity.
pub trait Dependencies: Sized + 'static {
  fn keys() -> Vec<TypeKey>;
  fn from_values(values: &[AnyRef]) -> Option<Self>;
}

macro_rules! dependencies_tuple {
  ($($name:ident : $index:tt),*) => {
    impl<$($name: Resolvable),*> Dependencies for ($($name,)*) {
      fn keys() -> Vec<TypeKey> {
        vec![$(TypeKey::of::<$name>()),*]
      }

      #[allow(unused_variables)]
      fn from_values(values: &[AnyRef]) -> Option<Self> {
        if values.len() != Self::keys().len() {
          return None;
        }
        Some(($(values.get($index)?.downcast_ref::<$name>()?.clone(),)*))
      }
    }
  };
}

dependencies_tuple!();
dependencies_tuple!(A: 0);
dependencies_tuple!(A: 0, B: 1);
dependencies_tuple!(A: 0, B: 1, C: 2);
dependencies_tuple!(A: 0, B: 1, C: 2, D: 3);
dependencies_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
dependencies_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
dependencies_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
dependencies_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  Public,
  NonPublic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
  /// Substitutes have no behavior beyond what is configured.
  Interface,
  /// Substitutes delegate unconfigured calls to a real implementation.
  Overridable,
}

pub(crate) type Invoker = Arc<dyn Fn(&[AnyRef]) -> Option<BoxAny> + Send + Sync>;
pub(crate) type Upcast = Arc<dyn Fn(&AnyRef) -> Option<AnyRef> + Send + Sync>;
type MemberProbe = Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> bool + Send + Sync>;
type MemberAssign = Arc<dyn Fn(&mut (dyn Any + Send + Sync), &AnyRef) -> bool + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Constructor {
  pub params: Vec<TypeKey>,
  pub visibility: Visibility,
  pub invoke: Invoker,
}

impl Constructor {
  pub fn arity(&self) -> usize {
    self.params.len()
  }
}

#[derive(Clone)]
pub(crate) struct Member {
  pub name: &'static str,
  pub key: TypeKey,
  pub is_unset: MemberProbe,
  pub assign: MemberAssign,
}

#[derive(Clone)]
pub(crate) struct Implementation {
  pub contract: TypeKey,
  pub direct: bool,
  pub upcast: Upcast,
}

#[derive(Clone)]
pub(crate) struct ClassInfo {
  pub key: TypeKey,
  pub constructors: Vec<Constructor>,
  pub members: Vec<Member>,
  pub implements: Vec<Implementation>,
  pub finish: fn(BoxAny) -> Option<AnyRef>,
}

impl ClassInfo {
  fn new<C>() -> Self
    where C: Send + Sync + 'static
  {
    ClassInfo {
      key: TypeKey::of::<Arc<C>>(),
      constructors: Vec::new(),
      members: Vec::new(),
      implements: Vec::new(),
      finish: finish::<C>,
    }
  }
}

fn finish<C>(value: BoxAny) -> Option<AnyRef>
  where C: Send + Sync + 'static
{
  value.downcast::<C>().ok().map(|c| Arc::new(Arc::new(*c)) as AnyRef)
}

#[derive(Clone)]
pub(crate) struct ContractInfo {
  pub key: TypeKey,
  pub kind: ContractKind,
  pub create: CreateSubstitute,
}

#[derive(Clone)]
pub(crate) struct ValueInfo {
  pub default: fn() -> AnyRef,
}

pub(crate) fn erase_upcast<C, I, F>(upcast: F) -> Upcast
  where
    C: Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
{
  Arc::new(move |value: &AnyRef| {
    value
      .downcast_ref::<Arc<C>>()
      .map(|c| Arc::new(upcast(c.clone())) as AnyRef)
  })
}

fn default_value<T: Default + Resolvable>() -> AnyRef {
  Arc::new(T::default())
}

/// The set of types known to a resolution session.
///
/// A catalog is usually assembled once per test module and handed to every
/// [`Mocker`](crate::Mocker) by value; sessions never share it mutably.
#[derive(Clone, Default)]
pub struct Catalog {
  classes: BTreeMap<TypeId, Arc<ClassInfo>>,
  contracts: BTreeMap<TypeId, ContractInfo>,
  values: BTreeMap<TypeId, ValueInfo>,
}

impl Catalog {
  /// A catalog pre-populated with primitive value types and the well-known
  /// convenience types (file system and HTTP).
  pub fn new() -> Self {
    let mut catalog = Catalog::empty();

    catalog
      .value::<bool>()
      .value::<char>()
      .value::<i8>()
      .value::<i16>()
      .value::<i32>()
      .value::<i64>()
      .value::<i128>()
      .value::<isize>()
      .value::<u8>()
      .value::<u16>()
      .value::<u32>()
      .value::<u64>()
      .value::<u128>()
      .value::<usize>()
      .value::<f32>()
      .value::<f64>()
      .value::<String>()
      .value::<Duration>()
      .value::<PathBuf>();

    well_known::register(&mut catalog);
    catalog
  }

  pub fn empty() -> Self {
    Catalog::default()
  }

  /// Declares a contract whose substitutes only do what they are told.
  pub fn interface<T>(&mut self) -> &mut Self
    where T: ?Sized + Contract
  {
    self.contract::<T>(ContractKind::Interface)
  }

  /// Declares a contract whose substitutes fall back to the real
  /// implementation the contract resolves to.
  pub fn overridable<T>(&mut self) -> &mut Self
    where T: ?Sized + Contract
  {
    self.contract::<T>(ContractKind::Overridable)
  }

  fn contract<T>(&mut self, kind: ContractKind) -> &mut Self
    where T: ?Sized + Contract
  {
    let key = TypeKey::of::<Arc<T>>();
    self.contracts.insert(key.id, ContractInfo {
      key,
      kind,
      create: substitute::create_erased::<T>,
    });
    self
  }

  /// Declares a sealed value type, resolved to its default.
  pub fn value<T>(&mut self) -> &mut Self
    where T: Default + Resolvable
  {
    self.values.insert(TypeId::of::<T>(), ValueInfo {
      default: default_value::<T>,
    });
    self
  }

  /// Declares (or extends) a concrete class, resolved as `Arc<C>`.
  pub fn class<C>(&mut self) -> ClassBuilder<'_, C>
    where C: Send + Sync + 'static
  {
    let info = self.classes
      .entry(TypeId::of::<Arc<C>>())
      .or_insert_with(|| Arc::new(ClassInfo::new::<C>()));
    ClassBuilder {
      info: Arc::make_mut(info),
      _p: PhantomData,
    }
  }

  pub fn contains<T: ?Sized + 'static>(&self) -> bool {
    let id = TypeId::of::<T>();
    self.classes.contains_key(&id) || self.contracts.contains_key(&id) || self.values.contains_key(&id)
  }

  pub(crate) fn class_info(&self, key: &TypeKey) -> Option<Arc<ClassInfo>> {
    self.classes.get(&key.id).cloned()
  }

  pub(crate) fn contract_info(&self, key: &TypeKey) -> Option<&ContractInfo> {
    self.contracts.get(&key.id)
  }

  pub(crate) fn value_info(&self, key: &TypeKey) -> Option<&ValueInfo> {
    self.values.get(&key.id)
  }

  pub(crate) fn ensure_contract<T>(&mut self) -> ContractInfo
    where T: ?Sized + Contract
  {
    let key = TypeKey::of::<Arc<T>>();
    self.contracts
      .entry(key.id)
      .or_insert_with(|| ContractInfo {
        key,
        kind: ContractKind::Interface,
        create: substitute::create_erased::<T>,
      })
      .clone()
  }

  pub(crate) fn is_concrete(&self, key: &TypeKey) -> bool {
    self.classes.contains_key(&key.id) || self.values.contains_key(&key.id)
  }

  pub(crate) fn implementations_of(&self, contract: &TypeKey) -> Vec<(TypeKey, Upcast)> {
    self.classes
      .values()
      .flat_map(|class| {
        class.implements
          .iter()
          .filter(|i| i.direct && i.contract == *contract)
          .map(move |i| (class.key, i.upcast.clone()))
      })
      .collect()
  }
}

pub struct ClassBuilder<'a, C> {
  info: &'a mut ClassInfo,
  _p: PhantomData<fn() -> C>,
}

impl<C> ClassBuilder<'_, C>
  where C: Send + Sync + 'static
{
  pub fn constructor<D, F>(&mut self, f: F) -> &mut Self
    where
      D: Dependencies,
      F: Fn(D) -> C + Send + Sync + 'static,
  {
    self.push_constructor(Visibility::Public, f)
  }

  /// Adds a constructor only considered when public ones are not viable, or
  /// when non-public constructors are requested.
  pub fn internal_constructor<D, F>(&mut self, f: F) -> &mut Self
    where
      D: Dependencies,
      F: Fn(D) -> C + Send + Sync + 'static,
  {
    self.push_constructor(Visibility::NonPublic, f)
  }

  fn push_constructor<D, F>(&mut self, visibility: Visibility, f: F) -> &mut Self
    where
      D: Dependencies,
      F: Fn(D) -> C + Send + Sync + 'static,
  {
    let invoke: Invoker = Arc::new(move |values: &[AnyRef]| {
      D::from_values(values).map(|deps| Box::new(f(deps)) as BoxAny)
    });
    self.info.constructors.push(Constructor {
      params: D::keys(),
      visibility,
      invoke,
    });
    self
  }

  pub fn implements<I, F>(&mut self, upcast: F) -> &mut Self
    where
      I: ?Sized + Send + Sync + 'static,
      F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
  {
    self.push_implementation(true, upcast)
  }

  /// Declares that `C` reaches `I` only through an intermediate contract.
  /// Such implementations are ignored when scanning for `I`.
  pub fn implements_indirectly<I, F>(&mut self, upcast: F) -> &mut Self
    where
      I: ?Sized + Send + Sync + 'static,
      F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
  {
    self.push_implementation(false, upcast)
  }

  fn push_implementation<I, F>(&mut self, direct: bool, upcast: F) -> &mut Self
    where
      I: ?Sized + Send + Sync + 'static,
      F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
  {
    self.info.implements.push(Implementation {
      contract: TypeKey::of::<Arc<I>>(),
      direct,
      upcast: erase_upcast(upcast),
    });
    self
  }

  /// Tags an `Option<T>` field for injection after construction. The field
  /// is resolved and assigned only if the constructor left it `None`.
  pub fn inject<T>(&mut self, name: &'static str, field: fn(&mut C) -> &mut Option<T>) -> &mut Self
    where T: Resolvable
  {
    self.info.members.push(Member {
      name,
      key: TypeKey::of::<T>(),
      is_unset: Arc::new(move |instance: &mut (dyn Any + Send + Sync)| {
        instance.downcast_mut::<C>().map_or(false, |c| field(c).is_none())
      }),
      assign: Arc::new(move |instance: &mut (dyn Any + Send + Sync), value: &AnyRef| {
        match (instance.downcast_mut::<C>(), value.downcast_ref::<T>()) {
          (Some(c), Some(value)) => {
            *field(c) = Some(value.clone());
            true
          }
          _ => false,
        }
      }),
    });
    self
  }
}
