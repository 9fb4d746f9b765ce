//! The assembler: services in, resource tree out.

use std::sync::Arc;

use daedalus_core::Service;
use daedalus_processor::{Assembly, Chain, Processing};
use daedalus_router::ResourceTree;

use crate::error::AssemblerError;
use crate::register::{AssemblerSettings, Exclusion, EXCLUDED, SERVICES, SETTINGS, SUGGESTIONS, TREE};
use crate::stages::{
    Decoding, Definitions, Encoding, Freeze, InvokerNode, MethodHttp, OptionSlice, PathAccessible,
    PathDomain, PathGetModel, PathInput, PathSlash, PathTarget, PathUpdate, PathWebName,
    RootResources, ServiceCaller, TargetModel, ValidateHints, ValidateSolved,
};

/// The assembler stages in their fixed order.
///
/// Extra stages can be anchored on the stage names with
/// [`Assembly::add_before`] and [`Assembly::add_after`] before passing the
/// assembly to [`Assembler::from_assembly`].
#[must_use]
pub fn assembler_assembly() -> Assembly {
    Assembly::new("assembler")
        .add(ServiceCaller)
        .add(ValidateHints)
        .add(MethodHttp)
        .add(TargetModel)
        .add(PathInput)
        .add(PathUpdate)
        .add(PathTarget)
        .add(PathDomain)
        .add(PathWebName)
        .add(Decoding)
        .add(OptionSlice)
        .add(ValidateSolved)
        .add(Encoding)
        .add(Definitions)
        .add(InvokerNode)
        .add(PathSlash)
        .add(PathGetModel)
        .add(PathAccessible)
        .add(RootResources)
        .add(Freeze)
}

/// The outcome of an assembly.
#[derive(Debug)]
pub struct Resources {
    /// The frozen tree.
    pub tree: ResourceTree,
    /// Calls left out, with the reason.
    pub excluded: Vec<Exclusion>,
    /// Hints about calls that work but could be declared better.
    pub suggestions: Vec<String>,
}

/// Builds resource trees from services.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use daedalus_assembler::{Assembler, AssemblerSettings};
/// use daedalus_core::{Call, Primitive, Service, Type, TypeModel, Value};
/// use http::Method;
///
/// let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
/// let service = Service::new("UserService").call(
///     Call::get("get", |args| Ok(Value::object([("Id", args.get("id").cloned().unwrap_or_default())])))
///         .input("id", Type::Property(user.property_id().unwrap()))
///         .output(Type::Model(Arc::clone(&user))),
/// );
///
/// let assembler = Assembler::new(AssemblerSettings::default()).unwrap();
/// let resources = assembler.assemble(vec![service]).unwrap();
/// assert!(resources.excluded.is_empty());
/// assert!(resources.tree.lookup(&Method::GET, "/User/3").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Assembler {
    processing: Arc<Processing>,
    settings: AssemblerSettings,
}

impl Assembler {
    /// Compiles the default stages.
    pub fn new(settings: AssemblerSettings) -> Result<Self, AssemblerError> {
        Self::from_assembly(&assembler_assembly(), settings)
    }

    /// Compiles a customized assembly of stages.
    pub fn from_assembly(assembly: &Assembly, settings: AssemblerSettings) -> Result<Self, AssemblerError> {
        let processing = assembly.create(&[SERVICES.attribute(), SETTINGS.attribute()])?;
        tracing::debug!(report = %processing.report(), "Compiled assembler");
        Ok(Self {
            processing: Arc::new(processing),
            settings,
        })
    }

    /// The settings in use.
    #[must_use]
    pub const fn settings(&self) -> &AssemblerSettings {
        &self.settings
    }

    /// Runs the stages over the services.
    ///
    /// Calls that cannot be published are excluded and reported; only a
    /// failure of the stages themselves is an error.
    pub fn assemble(&self, services: impl IntoIterator<Item = Service>) -> Result<Resources, AssemblerError> {
        let services: Vec<Service> = services.into_iter().collect();
        tracing::info!(services = services.len(), "Assembling resources");

        let mut ctx = self.processing.contexts();
        ctx.set(&SERVICES, services);
        ctx.set(&SETTINGS, self.settings.clone());
        Chain::new(&self.processing).process(&mut ctx)?;

        let tree = ctx.take(&TREE).ok_or(AssemblerError::MissingTree)?;
        let excluded = ctx.take(&EXCLUDED).unwrap_or_default();
        let suggestions = ctx.take(&SUGGESTIONS).unwrap_or_default();
        if !excluded.is_empty() {
            tracing::warn!(excluded = excluded.len(), "Some calls are not published");
        }
        Ok(Resources {
            tree,
            excluded,
            suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let assembler = Assembler::new(AssemblerSettings::default()).unwrap();
        let steps = assembler.processing.step_names();
        assert_eq!(steps.first(), Some(&"service_caller"));
        assert_eq!(steps.last(), Some(&"freeze"));
        assert_eq!(steps[1], "validate_hints");
        assert_eq!(steps.len(), 20);
    }

    #[test]
    fn test_no_services_still_serves_root() {
        let assembler = Assembler::new(AssemblerSettings::default()).unwrap();
        let resources = assembler.assemble(Vec::new()).unwrap();
        assert!(resources.tree.lookup(&http::Method::GET, "/").is_some());
    }
}
