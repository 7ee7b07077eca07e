//! The build pipeline: resolve the target type, pick a constructor, invoke
//! it, inject tagged members and cache the result.

use crate::constructor::{self, Args};
use crate::error::{Error, Result};
use crate::helpers::{AnyRef, BoxAny, TypeKey};
use crate::catalog::{ClassInfo, Resolvable};
use crate::parameter::{self, Overrides};
use crate::provider::ProviderObject;
use crate::registry;
use crate::session::Session;
use crate::substitute::{Contract, Substitute};
use crate::type_resolver::{self, Target};
use std::any::type_name;
use std::sync::Arc;

/// State of one resolution call.
///
/// Handed to [`Provider`](crate::Provider)s so that factories can resolve
/// their own dependencies within the same call.
pub struct BuildContext<'s> {
    pub(crate) session: &'s mut Session,
    pub(crate) overrides: Overrides,
    stack: Vec<TypeKey>,
}

impl<'s> BuildContext<'s> {
    pub(crate) fn new(session: &'s mut Session, overrides: Overrides) -> Self {
        BuildContext {
            session,
            overrides,
            stack: Vec::new(),
        }
    }

    /// Resolves `T` the way a constructor parameter of type `T` would be.
    pub fn resolve<T>(&mut self) -> Result<T>
    where
        T: Resolvable,
    {
        let value = parameter::resolve_parameter(self, &TypeKey::of::<T>())?;
        downcast(&value)
    }

    /// Builds `T`, even when `T` is a contract.
    pub fn build<T>(&mut self) -> Result<T>
    where
        T: Resolvable,
    {
        let value = build(self, &TypeKey::of::<T>(), None)?;
        downcast(&value)
    }

    pub fn substitute<T>(&mut self) -> Result<Substitute<T>>
    where
        T: ?Sized + Contract,
    {
        let contract = self.session.catalog.ensure_contract::<T>();
        registry::get_or_create(self, &contract)?
            .downcast::<T>()
            .ok_or(Error::TypeMismatch(type_name::<T>()))
    }

    pub fn is_strict(&self) -> bool {
        self.session.config.strict
    }

    fn enter(&mut self, key: TypeKey) -> Result<()> {
        if self.stack.contains(&key) {
            let mut path: Vec<_> = self.stack.iter().map(|k| k.name).collect();
            path.push(key.name);
            return Err(Error::CyclicDependency(path));
        }
        self.stack.push(key);
        Ok(())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }
}

pub(crate) fn downcast<T>(value: &AnyRef) -> Result<T>
where
    T: Resolvable,
{
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or(Error::TypeMismatch(type_name::<T>()))
}

/// Entry point of a top-level request. Without explicit arguments, a
/// request resolves like a constructor parameter; otherwise it is built.
pub(crate) fn resolve_root(ctx: &mut BuildContext<'_>, requested: &TypeKey, explicit: Option<&Args>) -> Result<AnyRef> {
    if explicit.is_none() {
        if !ctx.session.config.strict {
            if let Some(value) = ctx.session.well_known.get(requested) {
                return Ok(value);
            }
        }
        if ctx.session.mappings.get(requested).is_some() {
            return build(ctx, requested, None);
        }
        if let Some(contract) = ctx.session.catalog.contract_info(requested).cloned() {
            return registry::get_or_create(ctx, &contract).map(|stored| stored.handle);
        }
    }
    build(ctx, requested, explicit)
}

/// Builds an instance of `requested`.
///
/// Builds without explicit arguments or overrides are served from, and
/// stored into, the session instance cache.
pub(crate) fn build(ctx: &mut BuildContext<'_>, requested: &TypeKey, explicit: Option<&Args>) -> Result<AnyRef> {
    let cacheable = explicit.is_none() && ctx.overrides.is_empty();
    if cacheable {
        if let Some(instance) = ctx.session.instances.get(&requested.id) {
            tracing::debug!(type_name = requested.name, "served from instance cache");
            return Ok(instance.value.clone());
        }
    }

    let target = type_resolver::resolve(&ctx.session.catalog, &ctx.session.mappings, requested)?;

    ctx.enter(*requested)?;
    let result = realize(ctx, requested, target, explicit);
    ctx.leave();
    let instance = result?;

    if cacheable {
        ctx.session.instances.insert(requested.id, requested.named(instance.clone()));
    }
    Ok(instance)
}

fn realize(ctx: &mut BuildContext<'_>, requested: &TypeKey, target: Target, explicit: Option<&Args>) -> Result<AnyRef> {
    match target {
        Target::Factory(provider) => provider.provide(ctx),
        Target::Implementation { class, upcast } => {
            let instance = build(ctx, &class, explicit)?;
            upcast(&instance).ok_or(Error::TypeMismatch(requested.name))
        }
        Target::Concrete(key) => construct(ctx, &key, explicit),
    }
}

fn construct(ctx: &mut BuildContext<'_>, key: &TypeKey, explicit: Option<&Args>) -> Result<AnyRef> {
    if let Some(value) = ctx.session.catalog.value_info(key) {
        return Ok((value.default)());
    }

    let class = ctx
        .session
        .catalog
        .class_info(key)
        .ok_or(Error::UnresolvedType(key.name))?;
    let include_non_public = ctx.session.config.include_non_public;
    let selection = constructor::select(ctx, &class, explicit, include_non_public)?;

    tracing::debug!(
        type_name = key.name,
        arity = selection.constructor.arity(),
        visibility = ?selection.constructor.visibility,
        "constructing"
    );

    let mut instance = (selection.constructor.invoke)(&selection.values).ok_or(Error::TypeMismatch(key.name))?;
    inject_members(ctx, &class, &mut instance)?;
    (class.finish)(instance).ok_or(Error::TypeMismatch(key.name))
}

fn inject_members(ctx: &mut BuildContext<'_>, class: &Arc<ClassInfo>, instance: &mut BoxAny) -> Result<()> {
    for member in &class.members {
        if !(member.is_unset)(&mut **instance) {
            continue;
        }
        let value = parameter::resolve_parameter(ctx, &member.key)?;
        if !(member.assign)(&mut **instance, &value) {
            return Err(Error::TypeMismatch(member.key.name));
        }
        tracing::trace!(type_name = class.key.name, member = member.name, "member injected");
    }
    Ok(())
}
