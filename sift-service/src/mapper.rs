//! Startup-time property registry
//!
//! The [`PropertyMapper`] declares which properties of each entity type may be
//! filtered or sorted, under what external name, and with which declared value
//! kind. It is built once at process start from declarative configuration and
//! is immutable afterwards, so it can be shared read-only across every
//! concurrent request without locking.
//!
//! Multiple configuration units may register properties for the same entity
//! type; entries merge by `(entity type, external name)` with the later
//! registration fully overwriting the earlier one.
//!
//! # Example
//!
//! ```rust
//! use sift_service::mapper::{PropertyMapper, ValueKind};
//!
//! struct Student;
//!
//! let mapper = PropertyMapper::builder()
//!     .entity::<Student>(|e| {
//!         e.property("id", ValueKind::Integer).filterable().sortable();
//!         e.property("first_name", ValueKind::String)
//!             .filterable()
//!             .sortable()
//!             .alias("FirstName");
//!     })
//!     .build();
//!
//! let mapping = mapper.resolve::<Student>("firstname").unwrap();
//! assert_eq!(mapping.property, "first_name");
//! assert!(mapping.filterable);
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Declared value kind of a mapped property
///
/// Filter values arrive as raw text and are converted against this kind
/// during resolution; a conversion failure is a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Integer,
    /// 64-bit float
    Float,
    /// Boolean (`true`/`false`)
    Boolean,
    /// Calendar date (ISO 8601, `YYYY-MM-DD`)
    Date,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
        }
    }
}

/// One registered property of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMapping {
    /// Property name as declared on the entity
    pub property: String,
    /// External name used in requests; defaults to the property name
    pub external_name: String,
    /// Declared value kind used for filter-value conversion
    pub kind: ValueKind,
    /// Whether the property may appear in filter clauses
    pub filterable: bool,
    /// Whether the property may appear in sort clauses
    pub sortable: bool,
    /// Registered custom filter method to use instead of the default test
    pub custom_filter: Option<String>,
    /// Registered custom comparer to use instead of the default ordering
    pub custom_sort: Option<String>,
}

type MappingKey = (TypeId, String);

/// Immutable, process-wide registry of property mappings
///
/// Construct with [`PropertyMapper::builder`]; lookups are case-insensitive
/// on the external name.
#[derive(Debug, Default)]
pub struct PropertyMapper {
    mappings: HashMap<MappingKey, PropertyMapping>,
}

impl PropertyMapper {
    /// Start declarative configuration
    #[must_use]
    pub fn builder() -> PropertyMapperBuilder {
        PropertyMapperBuilder {
            mappings: HashMap::new(),
        }
    }

    /// Look up the mapping for `external_name` on entity type `T`
    ///
    /// Returns `None` when no property was registered under that name.
    #[must_use]
    pub fn resolve<T: 'static>(&self, external_name: &str) -> Option<&PropertyMapping> {
        self.mappings
            .get(&(TypeId::of::<T>(), external_name.to_ascii_lowercase()))
    }

    /// All mappings registered for entity type `T`
    pub fn mappings_for<T: 'static>(&self) -> impl Iterator<Item = &PropertyMapping> {
        let type_id = TypeId::of::<T>();
        self.mappings
            .iter()
            .filter(move |((id, _), _)| *id == type_id)
            .map(|(_, mapping)| mapping)
    }
}

/// Builder collecting property configuration before the mapper is frozen
///
/// Applied at startup only; [`build`](Self::build) freezes the registry.
#[derive(Debug)]
pub struct PropertyMapperBuilder {
    mappings: HashMap<MappingKey, PropertyMapping>,
}

impl PropertyMapperBuilder {
    /// Register properties for entity type `T`
    ///
    /// May be called more than once for the same type (e.g. from separate
    /// configuration units); later registrations for the same external name
    /// overwrite earlier ones.
    #[must_use]
    pub fn entity<T: 'static>(mut self, configure: impl FnOnce(&mut EntityMapping<'_, T>)) -> Self {
        let mut entity = EntityMapping {
            mappings: &mut self.mappings,
            _marker: PhantomData,
        };
        configure(&mut entity);
        self
    }

    /// Freeze the registry
    #[must_use]
    pub fn build(self) -> PropertyMapper {
        PropertyMapper {
            mappings: self.mappings,
        }
    }
}

/// Registrar scoped to one entity type
pub struct EntityMapping<'a, T> {
    mappings: &'a mut HashMap<MappingKey, PropertyMapping>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> EntityMapping<'_, T> {
    /// Declare a property with its value kind
    ///
    /// The property starts with no capabilities; chain
    /// [`filterable`](PropertyBuilder::filterable) /
    /// [`sortable`](PropertyBuilder::sortable) to grant them. Declaring the
    /// same external name again replaces the earlier entry entirely.
    pub fn property(&mut self, name: &str, kind: ValueKind) -> PropertyBuilder<'_> {
        let key = (TypeId::of::<T>(), name.to_ascii_lowercase());
        self.mappings.insert(
            key.clone(),
            PropertyMapping {
                property: name.to_string(),
                external_name: name.to_string(),
                kind,
                filterable: false,
                sortable: false,
                custom_filter: None,
                custom_sort: None,
            },
        );
        PropertyBuilder {
            mappings: self.mappings,
            key,
        }
    }
}

/// Fluent capability configuration for one declared property
pub struct PropertyBuilder<'a> {
    mappings: &'a mut HashMap<MappingKey, PropertyMapping>,
    key: MappingKey,
}

impl PropertyBuilder<'_> {
    fn update(&mut self, f: impl FnOnce(&mut PropertyMapping)) {
        if let Some(mapping) = self.mappings.get_mut(&self.key) {
            f(mapping);
        }
    }

    /// Allow the property in filter clauses
    #[must_use]
    pub fn filterable(mut self) -> Self {
        self.update(|m| m.filterable = true);
        self
    }

    /// Allow the property in sort clauses
    #[must_use]
    pub fn sortable(mut self) -> Self {
        self.update(|m| m.sortable = true);
        self
    }

    /// Expose the property under a different external name
    ///
    /// Lookup stays case-insensitive. The entry is re-keyed, so a later
    /// registration under the same alias overwrites this one.
    #[must_use]
    pub fn alias(mut self, name: &str) -> Self {
        if let Some(mut mapping) = self.mappings.remove(&self.key) {
            mapping.external_name = name.to_string();
            let new_key = (self.key.0, name.to_ascii_lowercase());
            self.mappings.insert(new_key.clone(), mapping);
            self.key = new_key;
        }
        self
    }

    /// Use the named registered filter method instead of the default test
    ///
    /// The name is validated against the registered custom methods when the
    /// query engine for the entity is constructed; a missing name is a
    /// startup configuration error.
    #[must_use]
    pub fn filter_with(mut self, method: &str) -> Self {
        self.update(|m| m.custom_filter = Some(method.to_string()));
        self
    }

    /// Use the named registered comparer instead of the default ordering
    #[must_use]
    pub fn sort_with(mut self, method: &str) -> Self {
        self.update(|m| m.custom_sort = Some(method.to_string()));
        self
    }
}
