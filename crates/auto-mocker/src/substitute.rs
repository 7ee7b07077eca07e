//! Substitutes: stand-ins for a contract whose behavior is plain data.
//!
//! A contract is a `dyn Trait`. The [`substitute!`](crate::substitute!) macro
//! generates a proxy struct implementing the trait; every call on the proxy is
//! recorded and answered from the setups configured on its
//! [`SubstituteCore`]. Calls nobody configured fall through to the base
//! object of a partial substitute, fail when the substitute is strict, and
//! return the method's default otherwise.

use crate::error::{Error, Result};
use crate::helpers::AnyRef;
use crate::registry::StoredSubstitute;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Implemented for `dyn Trait` by [`substitute!`](crate::substitute!).
pub trait Contract: Send + Sync + 'static {
  #[doc(hidden)]
  fn proxy(core: Arc<SubstituteCore>, base: Option<Arc<Self>>) -> Arc<Self>;
}

type Matcher = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;
type Answer = Box<dyn Fn(&dyn Any) -> Option<Box<dyn Any>> + Send + Sync>;

enum Response {
  Answer(Answer),
  Panic(String),
}

struct Setup {
  method: &'static str,
  matcher: Option<Matcher>,
  response: Response,
}

impl Setup {
  fn matches(&self, method: &str, args: &dyn Any) -> bool {
    self.method == method && self.matcher.as_ref().map_or(true, |m| m(args))
  }
}

struct ReceivedCall {
  method: &'static str,
  args: Box<dyn Any + Send>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared state behind a substitute and its proxy.
pub struct SubstituteCore {
  contract: &'static str,
  strict: bool,
  partial: bool,
  setups: Mutex<Vec<Arc<Setup>>>,
  calls: Mutex<Vec<ReceivedCall>>,
}

impl SubstituteCore {
  fn new(contract: &'static str, strict: bool, partial: bool) -> Self {
    SubstituteCore {
      contract,
      strict,
      partial,
      setups: Mutex::new(Vec::new()),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Records a call and answers it from the latest matching setup.
  #[doc(hidden)]
  pub fn respond<A, R>(&self, method: &'static str, args: A) -> Option<R>
    where
      A: Send + 'static,
      R: 'static,
  {
    // Setups are cloned out so that an answer may call back into this substitute.
    let setup = lock(&self.setups)
      .iter()
      .rev()
      .find(|s| s.matches(method, &args))
      .cloned();

    tracing::trace!(contract = self.contract, method, configured = setup.is_some(), "substitute call");

    let answer = match setup.as_deref().map(|s| &s.response) {
      Some(Response::Panic(message)) => {
        self.record(method, args);
        panic!("{}", message);
      }
      Some(Response::Answer(answer)) => Some(answer(&args)),
      None => None,
    };
    self.record(method, args);

    match answer? {
      Some(value) => match value.downcast::<R>() {
        Ok(value) => Some(*value),
        Err(_) => panic!(
          "setup for `{}::{}` does not return {}",
          self.contract,
          method,
          type_name::<R>()
        ),
      },
      None => panic!(
        "setup for `{}::{}` expects arguments other than {}",
        self.contract,
        method,
        type_name::<A>()
      ),
    }
  }

  /// Called when a call has neither a setup nor a base to fall back to.
  #[doc(hidden)]
  pub fn unconfigured(&self, method: &'static str) {
    if self.strict {
      panic!("no setup configured for `{}::{}`", self.contract, method);
    }
  }

  fn record<A: Send + 'static>(&self, method: &'static str, args: A) {
    lock(&self.calls).push(ReceivedCall {
      method,
      args: Box::new(args),
    });
  }
}

impl fmt::Debug for SubstituteCore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SubstituteCore")
      .field("contract", &self.contract)
      .field("strict", &self.strict)
      .field("partial", &self.partial)
      .field("setups", &lock(&self.setups).len())
      .field("calls", &lock(&self.calls).len())
      .finish()
  }
}

/// A configurable stand-in for the contract `T`.
///
/// Clones share the same setups and call log; [`Substitute::object`] hands
/// out the `Arc<T>` that code under test receives.
pub struct Substitute<T: ?Sized> {
  core: Arc<SubstituteCore>,
  object: Arc<T>,
}

impl<T: ?Sized> Clone for Substitute<T> {
  fn clone(&self) -> Self {
    Substitute {
      core: self.core.clone(),
      object: self.object.clone(),
    }
  }
}

impl<T: ?Sized> fmt::Debug for Substitute<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&*self.core, f)
  }
}

impl<T> Default for Substitute<T>
  where T: ?Sized + Contract
{
  fn default() -> Self {
    Substitute::new()
  }
}

impl<T> Substitute<T>
  where T: ?Sized + Contract
{
  /// A loose substitute: unconfigured calls return defaults.
  pub fn new() -> Self {
    Substitute::create(false, None)
  }

  /// A strict substitute: unconfigured calls panic.
  pub fn strict() -> Self {
    Substitute::create(true, None)
  }

  /// A substitute delegating unconfigured calls to `base`.
  pub fn partial(base: Arc<T>) -> Self {
    Substitute::create(false, Some(base))
  }

  pub(crate) fn create(strict: bool, base: Option<Arc<T>>) -> Self {
    let core = Arc::new(SubstituteCore::new(type_name::<T>(), strict, base.is_some()));
    let object = T::proxy(core.clone(), base);
    Substitute { core, object }
  }

  pub fn object(&self) -> Arc<T> {
    self.object.clone()
  }

  pub fn setup(&self, method: &'static str) -> SetupBuilder<'_> {
    SetupBuilder {
      core: &self.core,
      method,
      matcher: None,
    }
  }

  pub fn received(&self, method: &str) -> usize {
    lock(&self.core.calls).iter().filter(|c| c.method == method).count()
  }

  /// Number of calls received by `method` whose argument tuple satisfies
  /// `predicate`.
  pub fn received_matching<A, F>(&self, method: &str, predicate: F) -> usize
    where
      A: 'static,
      F: Fn(&A) -> bool,
  {
    lock(&self.core.calls)
      .iter()
      .filter(|c| c.method == method)
      .filter(|c| c.args.downcast_ref::<A>().map_or(false, &predicate))
      .count()
  }

  pub fn received_calls(&self) -> Vec<&'static str> {
    lock(&self.core.calls).iter().map(|c| c.method).collect()
  }

  pub fn reset(&self) {
    lock(&self.core.setups).clear();
    lock(&self.core.calls).clear();
  }

  pub fn is_strict(&self) -> bool {
    self.core.strict
  }

  pub fn is_partial(&self) -> bool {
    self.core.partial
  }

  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.core, &other.core)
  }
}

#[must_use = "a setup is only stored once a response is given"]
pub struct SetupBuilder<'a> {
  core: &'a SubstituteCore,
  method: &'static str,
  matcher: Option<Matcher>,
}

impl SetupBuilder<'_> {
  /// Restricts the setup to calls whose argument tuple satisfies `matcher`.
  pub fn matching<A, F>(mut self, matcher: F) -> Self
    where
      A: 'static,
      F: Fn(&A) -> bool + Send + Sync + 'static,
  {
    self.matcher = Some(Box::new(move |args: &dyn Any| {
      args.downcast_ref::<A>().map_or(false, &matcher)
    }));
    self
  }

  pub fn returns<R>(self, value: R)
    where R: Clone + Send + Sync + 'static
  {
    self.store(Response::Answer(Box::new(move |_: &dyn Any| {
      Some(Box::new(value.clone()) as Box<dyn Any>)
    })));
  }

  pub fn returns_with<A, R, F>(self, f: F)
    where
      A: 'static,
      R: 'static,
      F: Fn(&A) -> R + Send + Sync + 'static,
  {
    self.store(Response::Answer(Box::new(move |args: &dyn Any| {
      args.downcast_ref::<A>().map(|args| Box::new(f(args)) as Box<dyn Any>)
    })));
  }

  pub fn panics(self, message: impl Into<String>) {
    self.store(Response::Panic(message.into()));
  }

  fn store(self, response: Response) {
    lock(&self.core.setups).push(Arc::new(Setup {
      method: self.method,
      matcher: self.matcher,
      response,
    }));
  }
}

pub(crate) type CreateSubstitute = fn(bool, Option<&AnyRef>) -> Result<StoredSubstitute>;

pub(crate) fn create_erased<T>(strict: bool, base: Option<&AnyRef>) -> Result<StoredSubstitute>
  where T: ?Sized + Contract
{
  let base = match base {
    Some(base) => Some(
      base
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(Error::TypeMismatch(type_name::<T>()))?,
    ),
    None => None,
  };
  Ok(StoredSubstitute::new(Substitute::<T>::create(strict, base)))
}

/// Generates a substitute proxy for a trait and implements
/// [`Contract`](crate::Contract) for its trait object.
///
/// The trait must be `Send + Sync`, its methods must take `&self` and owned
/// arguments that are `Clone + Send + 'static`. A return type without a
/// `Default` needs a fallback expression used by loose substitutes:
///
/// ```
/// use auto_mocker::{substitute, Substitute};
///
/// pub trait Prices: Send + Sync {
///     fn price(&self, id: u32) -> u32;
///     fn lookup(&self, name: String) -> Result<u32, String>;
/// }
///
/// substitute! {
///     pub struct PricesSubstitute for dyn Prices {
///         fn price(&self, id: u32) -> u32;
///         fn lookup(&self, name: String) -> Result<u32, String> = Ok(0);
///     }
/// }
///
/// let prices = Substitute::<dyn Prices>::new();
/// prices.setup("price").returns(10u32);
/// assert_eq!(prices.object().price(1), 10);
/// assert_eq!(prices.object().lookup("x".into()), Ok(0));
/// ```
#[macro_export]
macro_rules! substitute {
  (
    $(#[$attr:meta])*
    $vis:vis struct $proxy:ident for dyn $contract:path {
      $(
        fn $method:ident(&self $(, $arg:ident : $ty:ty)*) -> $ret:ty $(= $fallback:expr)?;
      )*
    }
  ) => {
    $(#[$attr])*
    $vis struct $proxy {
      core: ::std::sync::Arc<$crate::SubstituteCore>,
      base: ::std::option::Option<::std::sync::Arc<dyn $contract>>,
    }

    impl $contract for $proxy {
      $(
        fn $method(&self $(, $arg: $ty)*) -> $ret {
          let args = ($(::std::clone::Clone::clone(&$arg),)*);
          if let ::std::option::Option::Some(value) =
            self.core.respond::<_, $ret>(::std::stringify!($method), args)
          {
            return value;
          }
          match &self.base {
            ::std::option::Option::Some(base) => base.$method($($arg),*),
            ::std::option::Option::None => {
              self.core.unconfigured(::std::stringify!($method));
              $crate::__substitute_fallback!($($fallback)?)
            }
          }
        }
      )*
    }

    impl $crate::Contract for dyn $contract {
      fn proxy(
        core: ::std::sync::Arc<$crate::SubstituteCore>,
        base: ::std::option::Option<::std::sync::Arc<Self>>,
      ) -> ::std::sync::Arc<Self> {
        ::std::sync::Arc::new($proxy { core, base })
      }
    }
  };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __substitute_fallback {
  () => {
    ::std::default::Default::default()
  };
  ($fallback:expr) => {
    $fallback
  };
}
