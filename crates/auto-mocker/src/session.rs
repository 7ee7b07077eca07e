use crate::catalog::Catalog;
use crate::config::MockerConfig;
use crate::helpers::{AnyRef, Named};
use crate::registry::MockRegistry;
use crate::type_resolver::TypeMappings;
use crate::well_known::WellKnown;
use std::any::TypeId;
use std::collections::BTreeMap;

/// Everything one test resolves against. Owned by a single
/// [`Mocker`](crate::Mocker) and dropped with it.
pub(crate) struct Session {
    pub catalog: Catalog,
    pub mappings: TypeMappings,
    pub registry: MockRegistry,
    pub instances: BTreeMap<TypeId, Named<AnyRef>>,
    pub well_known: WellKnown,
    pub config: MockerConfig,
}
