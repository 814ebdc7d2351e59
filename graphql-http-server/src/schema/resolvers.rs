use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tower::BoxError;

use crate::context::ExecutionContext;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// Computes the value of a field.
///
/// Called with the parent object, the coerced field arguments and the
/// context of the current request.
pub type FieldResolver =
    Arc<dyn Fn(&Object, &Object, &ExecutionContext) -> Result<Value, BoxError> + Send + Sync>;

/// Field resolvers of a schema, keyed by `Type.field`.
///
/// Fields without a resolver read the property of the same name from their
/// parent object.
#[derive(Clone, Default)]
pub struct Resolvers {
    fields: HashMap<String, FieldResolver>,
}

impl Resolvers {
    /// An empty set of resolvers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the resolver of `field` on `type_name`.
    pub fn field<F>(mut self, type_name: &str, field: &str, resolver: F) -> Self
    where
        F: Fn(&Object, &Object, &ExecutionContext) -> Result<Value, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.fields
            .insert(format!("{type_name}.{field}"), Arc::new(resolver));
        self
    }

    /// The resolver of `field` on `type_name`, if any.
    pub fn get(&self, type_name: &str, field: &str) -> Option<&FieldResolver> {
        if self.fields.is_empty() {
            return None;
        }
        self.fields.get(&format!("{type_name}.{field}"))
    }
}

impl fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self.fields.keys().collect();
        fields.sort();
        f.debug_struct("Resolvers").field("fields", &fields).finish()
    }
}
