#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod application;
pub(crate) mod cache;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod extension;
pub(crate) mod finalizer;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod lifespan;
pub(crate) mod lifetime;
pub(crate) mod lock;
pub(crate) mod provider;
pub(crate) mod registry;
pub(crate) mod service;

pub use any::TypeInfo;
pub use application::{Application, ApplicationBuilder, Phase};
pub use container::{Container, LifespanGuard, OverrideGuard};
pub use context::{Context, InjectionContext};
pub use dependency_resolver::DependencyResolver;
pub use errors::{
    BindingError, BuildError, CycleChain, InstantiateErrorKind, InstantiatorErrorKind, ReleaseError, ReleaseFailure,
    ReleaseSubject, ResolveErrorKind, StartError, StartErrorKind,
};
pub use extension::Extension;
pub use finalizer::Finalizer;
pub use inject::{Inject, InjectTransient};
pub use instantiator::{instance, Instantiator};
pub use lifespan::{Lifespan, LifespanFactory, LifespanSetup};
pub use lifetime::Lifetime;
pub use provider::Provider;
