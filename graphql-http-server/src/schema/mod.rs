//! GraphQL schemas and their lookup by name.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::schema::Implementers;
use apollo_compiler::validation::Valid;

pub use self::resolvers::FieldResolver;
pub use self::resolvers::Resolvers;
use crate::configuration::SchemaSource;
use crate::error::SchemaError;
use crate::json_ext::Object;
use crate::json_ext::Value;

mod resolvers;

/// A compiled, executable schema and its name.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct SchemaHandle {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    definitions: Valid<Schema>,
    implementers_map: apollo_compiler::collections::HashMap<Name, Implementers>,
    root_data: Object,
    resolvers: Resolvers,
}

#[buildstructor::buildstructor]
impl SchemaHandle {
    /// Parses and validates `sdl` into a schema registered as `name`.
    ///
    /// `root_data` is the parent object of root fields; `resolvers` override
    /// the default property lookup.
    #[builder(visibility = "pub")]
    fn new(
        name: String,
        sdl: String,
        root_data: Option<Object>,
        resolvers: Option<Resolvers>,
    ) -> Result<Self, SchemaError> {
        let definitions = Schema::parse_and_validate(sdl, format!("{name}.graphql")).map_err(
            |invalid| SchemaError::Invalid {
                name: name.clone(),
                message: invalid.errors.to_string(),
            },
        )?;
        let implementers_map = definitions.implementers_map();
        Ok(Self {
            inner: Arc::new(Inner {
                name,
                definitions,
                implementers_map,
                root_data: root_data.unwrap_or_default(),
                resolvers: resolvers.unwrap_or_default(),
            }),
        })
    }

    /// Loads a schema from its SDL file and optional JSON root data file.
    pub fn load(source: &SchemaSource) -> Result<Self, SchemaError> {
        let sdl = read(&source.sdl)?;
        let root_data = match &source.data {
            Some(path) => {
                let text = read(path)?;
                match serde_json::from_str::<Value>(&text) {
                    Ok(Value::Object(object)) => Some(object),
                    Ok(_) => {
                        return Err(SchemaError::DataNotAnObject {
                            name: source.name.clone(),
                        });
                    }
                    Err(source_error) => {
                        return Err(SchemaError::InvalidData {
                            name: source.name.clone(),
                            source: source_error,
                        });
                    }
                }
            }
            None => None,
        };
        Self::builder()
            .name(source.name.clone())
            .sdl(sdl)
            .and_root_data(root_data)
            .build()
    }

    /// The name this schema is registered under.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The validated schema definitions.
    pub fn definitions(&self) -> &Valid<Schema> {
        &self.inner.definitions
    }

    pub(crate) fn implementers_map(
        &self,
    ) -> &apollo_compiler::collections::HashMap<Name, Implementers> {
        &self.inner.implementers_map
    }

    /// The parent object of root fields.
    pub fn root_data(&self) -> &Object {
        &self.inner.root_data
    }

    /// Field resolvers.
    pub fn resolvers(&self) -> &Resolvers {
        &self.inner.resolvers
    }
}

impl fmt::Debug for SchemaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaHandle")
            .field("name", &self.inner.name)
            .field("resolvers", &self.inner.resolvers)
            .finish_non_exhaustive()
    }
}

fn read(path: &Path) -> Result<String, SchemaError> {
    std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// The schemas served, by name.
///
/// Filled once at startup and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, SchemaHandle>,
}

impl SchemaRegistry {
    /// Creates a registry, failing if two schemas share a name.
    pub fn new(schemas: impl IntoIterator<Item = SchemaHandle>) -> Result<Self, SchemaError> {
        let mut registry = Self::default();
        for schema in schemas {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Loads every configured schema.
    pub fn load(sources: &[SchemaSource]) -> Result<Self, SchemaError> {
        Self::new(
            sources
                .iter()
                .map(SchemaHandle::load)
                .collect::<Result<Vec<_>, _>>()?,
        )
    }

    /// Adds a schema, failing if its name is already taken.
    pub fn register(&mut self, schema: SchemaHandle) -> Result<(), SchemaError> {
        let name = schema.name().to_string();
        if self.schemas.contains_key(&name) {
            return Err(SchemaError::Duplicate(name));
        }
        tracing::debug!(schema = %name, "registered schema");
        self.schemas.insert(name, schema);
        Ok(())
    }

    /// Finds the schema a request should execute against.
    ///
    /// A non-blank `hint` must name a registered schema exactly. Without one,
    /// the only registered schema is used; with none or several registered
    /// there is no answer.
    pub fn resolve(&self, hint: Option<&str>) -> Option<&SchemaHandle> {
        match hint.filter(|hint| !hint.trim().is_empty()) {
            Some(name) => {
                let schema = self.schemas.get(name);
                if schema.is_none() {
                    tracing::debug!(schema = %name, "no schema registered under this name");
                }
                schema
            }
            None if self.schemas.len() == 1 => self.schemas.values().next(),
            None => {
                tracing::debug!(
                    registered = self.schemas.len(),
                    "cannot pick a schema without a name"
                );
                None
            }
        }
    }

    /// The number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no schema is registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// The registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
