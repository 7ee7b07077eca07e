use std::marker::PhantomData;
use std::sync::Arc;
use crate::builder::BuildContext;
use crate::catalog::Resolvable;
use crate::error::Error;
use crate::helpers::AnyRef;

pub type ProvideResult<T> = anyhow::Result<T>;

/// A factory for one handle type, used as the target of a type mapping.
pub trait Provider: Send + Sync + 'static {
  type Ref: Resolvable;
  fn provide(&self, ctx: &mut BuildContext<'_>) -> ProvideResult<Self::Ref>;
}

pub(crate) trait ProviderObject: Send + Sync + 'static {
  fn provide(&self, ctx: &mut BuildContext<'_>) -> Result<AnyRef, Error>;
}

impl<T> ProviderObject for T
  where T: Provider
{
  fn provide(&self, ctx: &mut BuildContext<'_>) -> Result<AnyRef, Error> {
    Provider::provide(self, ctx)
      .map(|v| Arc::new(v) as AnyRef)
      .map_err(|err| {
        match err.downcast::<Error>() {
          Ok(err) => err,
          Err(err) => Error::Factory(Arc::new(err))
        }
      })
  }
}

/// Always provides a clone of the same value.
pub struct StaticProvider<T>(T);

impl<T> StaticProvider<T> {
  pub fn new(value: T) -> Self {
    StaticProvider(value)
  }
}

impl<T> Provider for StaticProvider<T>
where T: Resolvable
{
  type Ref = T;

  fn provide(&self, _: &mut BuildContext<'_>) -> ProvideResult<Self::Ref> {
    Ok(self.0.clone())
  }
}

/// Provides the result of a closure, which may resolve its own dependencies
/// through the build context.
pub struct FnProvider<F, T> {
  f: F,
  _p: PhantomData<fn() -> T>,
}

impl<F, T> FnProvider<F, T>
where
  F: Fn(&mut BuildContext<'_>) -> ProvideResult<T> + Send + Sync + 'static,
  T: Resolvable,
{
  pub fn new(f: F) -> Self {
    FnProvider { f, _p: PhantomData }
  }
}

impl<F, T> Provider for FnProvider<F, T>
where
  F: Fn(&mut BuildContext<'_>) -> ProvideResult<T> + Send + Sync + 'static,
  T: Resolvable,
{
  type Ref = T;

  fn provide(&self, ctx: &mut BuildContext<'_>) -> ProvideResult<Self::Ref> {
    (self.f)(ctx)
  }
}
