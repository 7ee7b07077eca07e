//! Auto-mocking dependency resolution for unit tests.
//!
//! A [`Mocker`] builds the type under test from a [`Catalog`], resolving
//! every constructor parameter on the way: contracts become cached
//! [`Substitute`]s, value types their defaults, and concrete classes are
//! built recursively.
//!
//! ```
//! use auto_mocker::{substitute, Catalog, Mocker};
//! use std::sync::Arc;
//!
//! pub trait CarService: Send + Sync {
//!     fn name(&self) -> String;
//! }
//!
//! substitute! {
//!     pub struct CarServiceSubstitute for dyn CarService {
//!         fn name(&self) -> String;
//!     }
//! }
//!
//! struct RealCarService;
//!
//! impl CarService for RealCarService {
//!     fn name(&self) -> String {
//!         "real".into()
//!     }
//! }
//!
//! struct Car {
//!     service: Arc<dyn CarService>,
//! }
//!
//! let mut catalog = Catalog::new();
//! catalog.interface::<dyn CarService>();
//! catalog
//!     .class::<RealCarService>()
//!     .constructor(|()| RealCarService)
//!     .implements::<dyn CarService, _>(|s| s as Arc<dyn CarService>);
//! catalog
//!     .class::<Car>()
//!     .constructor(|(service,): (Arc<dyn CarService>,)| Car { service });
//!
//! let mut mocker = Mocker::with_catalog(catalog);
//! mocker
//!     .get_substitute::<dyn CarService>()
//!     .unwrap()
//!     .setup("name")
//!     .returns(String::from("substituted"));
//!
//! let car: Arc<Car> = mocker.resolve().unwrap();
//! assert_eq!(car.service.name(), "substituted");
//! ```

mod builder;
pub use builder::BuildContext;
mod catalog;
pub use catalog::{Catalog, ClassBuilder, ContractKind, Dependencies, Resolvable, Visibility};
mod config;
pub use config::MockerConfig;
mod constructor;
pub use constructor::Args;
mod error;
pub use error::{Error, Result};
mod helpers;
mod parameter;
pub use parameter::Overrides;
mod provider;
pub use provider::{FnProvider, ProvideResult, Provider, StaticProvider};
mod registry;
mod session;
mod substitute;
pub use substitute::{Contract, SetupBuilder, Substitute, SubstituteCore};
mod type_resolver;
mod well_known;
pub use well_known::{
    FakeTransport, FileSystem, FileSystemError, FileSystemSubstitute, HttpClient, HttpError, HttpRequest,
    HttpResponse, HttpTransport, HttpTransportSubstitute, MemoryFileSystem, Method,
};

use catalog::erase_upcast;
use helpers::{AnyRef, TypeKey};
use registry::{MockRegistry, StoredSubstitute};
use session::Session;
use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use type_resolver::{TypeMapping, TypeMappings};
use well_known::WellKnown;

/// One resolution session, owned by one test.
pub struct Mocker {
    session: Session,
}

impl fmt::Debug for Mocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mocker")
            .field("config", &self.session.config)
            .field("mappings", &self.session.mappings.len())
            .field("substitutes", &self.session.registry.len())
            .field("instances", &self.session.instances.len())
            .finish()
    }
}

impl Mocker {
    pub fn new<F>(catalog: Catalog, config: F) -> Self
    where
        F: FnOnce(&mut MockerBuilder),
    {
        let mut builder = MockerBuilder::new(catalog);

        config(&mut builder);

        builder.finalize()
    }

    pub fn build(catalog: Catalog) -> MockerBuilder {
        MockerBuilder::new(catalog)
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Mocker::new(catalog, |_| {})
    }

    /// Resolves `T` the way a constructor parameter of type `T` would be:
    /// well-known instances (outside strict mode), then mapped products,
    /// then the session substitute of a contract. Registered classes and
    /// value types are built directly.
    pub fn resolve<T>(&mut self) -> Result<T>
    where
        T: Resolvable,
    {
        self.resolve_request(None, Overrides::default())
    }

    /// Builds `T` with the constructor whose parameter types are exactly
    /// the types of `args`.
    pub fn resolve_with_args<T>(&mut self, args: Args) -> Result<T>
    where
        T: Resolvable,
    {
        self.resolve_request(Some(&args), Overrides::default())
    }

    pub fn resolve_with_overrides<T>(&mut self, overrides: Overrides) -> Result<T>
    where
        T: Resolvable,
    {
        self.resolve_request(None, overrides)
    }

    fn resolve_request<T>(&mut self, args: Option<&Args>, overrides: Overrides) -> Result<T>
    where
        T: Resolvable,
    {
        let key = TypeKey::of::<T>();
        tracing::debug!(type_name = key.name, "resolve");
        let mut ctx = BuildContext::new(&mut self.session, overrides);
        let value = builder::resolve_root(&mut ctx, &key, args)?;
        builder::downcast(&value)
    }

    pub fn get_substitute<T>(&mut self) -> Result<Substitute<T>>
    where
        T: ?Sized + Contract,
    {
        BuildContext::new(&mut self.session, Overrides::default()).substitute::<T>()
    }

    /// Maps the contract `I` to the class `C`, taking precedence over the
    /// catalog scan.
    pub fn register_type_mapping<I, C, F>(&mut self, upcast: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.insert_mapping(TypeKey::of::<Arc<I>>(), class_mapping::<I, C, F>(upcast));
        self
    }

    pub fn register_factory<P>(&mut self, provider: P) -> &mut Self
    where
        P: Provider,
    {
        self.insert_mapping(TypeKey::of::<P::Ref>(), TypeMapping::Factory(Arc::new(provider)));
        self
    }

    pub fn register_factory_fn<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Resolvable,
        F: Fn(&mut BuildContext<'_>) -> ProvideResult<T> + Send + Sync + 'static,
    {
        self.register_factory(FnProvider::new(f))
    }

    pub fn register_instance<T>(&mut self, value: T) -> &mut Self
    where
        T: Resolvable,
    {
        self.register_factory(StaticProvider::new(value))
    }

    fn insert_mapping(&mut self, key: TypeKey, mapping: TypeMapping) {
        self.session.instances.remove(&key.id);
        self.session.mappings.insert(key, mapping);
    }

    /// Seeds the substitute for `T`. Without `overwrite`, an existing
    /// substitute is a [`Error::DuplicateRegistration`].
    pub fn add_substitute<T>(&mut self, substitute: Substitute<T>, overwrite: bool) -> Result<()>
    where
        T: ?Sized + Contract,
    {
        let contract = self.session.catalog.ensure_contract::<T>();
        self.session
            .registry
            .add(contract.key, StoredSubstitute::new(substitute), overwrite)
    }

    pub fn remove_substitute<T>(&mut self) -> bool
    where
        T: ?Sized + Contract,
    {
        self.session.registry.remove(&TypeKey::of::<Arc<T>>())
    }

    pub fn contains_substitute<T>(&self) -> bool
    where
        T: ?Sized + Contract,
    {
        self.session.registry.contains(&TypeKey::of::<Arc<T>>())
    }

    pub fn clear_substitutes(&mut self) {
        self.session.registry.clear();
    }

    /// Fetches or creates the substitute for `T` and applies `configurator`,
    /// first clearing its setups and calls when `reset_existing` is set.
    pub fn configure_substitute<T, F>(&mut self, configurator: F, reset_existing: bool) -> Result<Substitute<T>>
    where
        T: ?Sized + Contract,
        F: FnOnce(&Substitute<T>),
    {
        let substitute = self.get_substitute::<T>()?;
        if reset_existing {
            substitute.reset();
        }
        configurator(&substitute);
        Ok(substitute)
    }

    pub fn strict_mode(&self) -> bool {
        self.session.config.strict
    }

    /// Applies to substitutes created from now on.
    pub fn set_strict_mode(&mut self, strict: bool) -> &mut Self {
        self.session.config.strict = strict;
        self
    }

    pub fn config(&self) -> &MockerConfig {
        &self.session.config
    }

    /// Resolves the parameters of `f` like constructor parameters and calls it.
    pub fn invoke<D, R, F>(&mut self, f: F) -> Result<R>
    where
        D: Dependencies,
        F: FnOnce(D) -> R,
    {
        let mut ctx = BuildContext::new(&mut self.session, Overrides::default());
        let values = D::keys()
            .iter()
            .map(|key| parameter::resolve_parameter(&mut ctx, key))
            .collect::<Result<Vec<_>>>()?;
        let dependencies = D::from_values(&values).ok_or(Error::TypeMismatch(type_name::<D>()))?;
        Ok(f(dependencies))
    }

    pub fn file_system(&self) -> Arc<MemoryFileSystem> {
        self.session.well_known.file_system()
    }

    pub fn http_transport(&self) -> Arc<FakeTransport> {
        self.session.well_known.transport()
    }

    pub fn http_client(&self) -> HttpClient {
        HttpClient::new(self.http_transport())
    }
}

fn class_mapping<I, C, F>(upcast: F) -> TypeMapping
where
    I: ?Sized + Send + Sync + 'static,
    C: Send + Sync + 'static,
    F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
{
    TypeMapping::Class {
        class: TypeKey::of::<Arc<C>>(),
        upcast: erase_upcast(upcast),
    }
}

pub struct MockerBuilder {
    catalog: Catalog,
    config: MockerConfig,
    file_system: Arc<MemoryFileSystem>,
    transport: Arc<FakeTransport>,
    extra: Vec<(TypeKey, AnyRef)>,
    mappings: TypeMappings,
}

impl fmt::Debug for MockerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockerBuilder")
            .field("config", &self.config)
            .field("mappings", &self.mappings.len())
            .finish()
    }
}

impl MockerBuilder {
    fn new(catalog: Catalog) -> Self {
        MockerBuilder {
            catalog,
            config: MockerConfig::default(),
            file_system: Arc::new(MemoryFileSystem::new()),
            transport: Arc::new(FakeTransport::new()),
            extra: Vec::new(),
            mappings: TypeMappings::default(),
        }
    }

    pub fn config(&mut self, config: MockerConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.config.strict = strict;
        self
    }

    pub fn well_known_types(&mut self, enabled: bool) -> &mut Self {
        self.config.well_known = enabled;
        self
    }

    pub fn include_non_public(&mut self, enabled: bool) -> &mut Self {
        self.config.include_non_public = enabled;
        self
    }

    pub fn file_system(&mut self, file_system: Arc<MemoryFileSystem>) -> &mut Self {
        self.file_system = file_system;
        self
    }

    pub fn transport(&mut self, transport: Arc<FakeTransport>) -> &mut Self {
        self.transport = transport;
        self
    }

    /// Hands out `value` for every parameter of type `T`, outside strict mode.
    pub fn well_known<T>(&mut self, value: T) -> &mut Self
    where
        T: Resolvable,
    {
        self.extra.push((TypeKey::of::<T>(), Arc::new(value)));
        self
    }

    pub fn map<I, C, F>(&mut self, upcast: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.mappings.insert(TypeKey::of::<Arc<I>>(), class_mapping::<I, C, F>(upcast));
        self
    }

    pub fn factory<P>(&mut self, provider: P) -> &mut Self
    where
        P: Provider,
    {
        self.mappings.insert(TypeKey::of::<P::Ref>(), TypeMapping::Factory(Arc::new(provider)));
        self
    }

    pub fn finalize(self) -> Mocker {
        let well_known = WellKnown::new(self.config.well_known, self.file_system, self.transport, self.extra);
        Mocker {
            session: Session {
                catalog: self.catalog,
                mappings: self.mappings,
                registry: MockRegistry::default(),
                instances: BTreeMap::new(),
                well_known,
                config: self.config,
            },
        }
    }
}
