//! The model and query registry.
//!
//! The framework owns the registry: it is collected from the declared
//! services instead of being discovered at runtime. Encoders use it to
//! resolve reference properties to the referenced model.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::service::Service;
use crate::types::{Type, TypeModel, TypeQuery};

/// Models and queries known to the framework, by name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    models: IndexMap<String, Arc<TypeModel>>,
    queries: IndexMap<String, Arc<TypeQuery>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every model and query used by the services.
    #[must_use]
    pub fn from_services(services: &[Service]) -> Self {
        let mut registry = Self::new();
        for service in services {
            for call in service.calls() {
                for input in call.inputs() {
                    registry.collect(input.ty());
                }
                registry.collect(call.output_type());
            }
        }
        registry
    }

    /// Registers the models and queries reachable from a type.
    pub fn collect(&mut self, ty: &Type) {
        match ty {
            Type::Model(model) => self.register_model(model),
            Type::Property(property) => self.register_model(property.model()),
            Type::Query(query) => self.register_query(query),
            Type::Collection(_, item) | Type::Dict(_, item) => self.collect(item),
            Type::None | Type::Primitive(_) | Type::Option(_) | Type::Reference => {}
        }
    }

    /// Registers a model; the first registration of a name wins.
    pub fn register_model(&mut self, model: &Arc<TypeModel>) {
        if let Some(existing) = self.models.get(model.name()) {
            if existing.properties() != model.properties() {
                tracing::warn!(
                    model = model.name(),
                    "Model registered twice with different properties, keeping the first"
                );
            }
            return;
        }
        self.models
            .insert(model.name().to_string(), Arc::clone(model));
    }

    /// Registers a query; the first registration of a name wins.
    pub fn register_query(&mut self, query: &Arc<TypeQuery>) {
        self.queries
            .entry(query.name().to_string())
            .or_insert_with(|| Arc::clone(query));
    }

    /// Looks up a model.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Arc<TypeModel>> {
        self.models.get(name)
    }

    /// Looks up a query.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&Arc<TypeQuery>> {
        self.queries.get(name)
    }

    /// All models in registration order.
    pub fn models(&self) -> impl Iterator<Item = &Arc<TypeModel>> {
        self.models.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Call;
    use crate::types::{Comparator, Primitive};
    use crate::value::Value;

    #[test]
    fn test_collects_models_and_queries() {
        let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
        let query = TypeQuery::builder("QUser", "User")
            .criterion("name", Primitive::Str, &[Comparator::Like])
            .build();
        let service = Service::new("Users").call(
            Call::get("find", |_| Ok(Value::List(vec![])))
                .input("q", Type::Query(query))
                .output(Type::iter(Type::Model(user))),
        );

        let registry = TypeRegistry::from_services(&[service]);
        assert!(registry.model("User").is_some());
        assert!(registry.query("QUser").is_some());
        assert_eq!(registry.models().count(), 1);
    }
}
