//! Entity metadata registered at startup.
//!
//! # Responsibility
//! - Describe tables, primary keys, fields and relations explicitly.
//! - Validate the relation graph once, before any query runs.
//!
//! # Invariants
//! - A built [`Schema`] is immutable and safe to share across threads.
//! - Every identifier matches `[A-Za-z_][A-Za-z0-9_]*`, so it can be quoted
//!   into SQL without escaping surprises.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod entity;

pub use entity::{
    EntityDescriptor, FieldDescriptor, RelationDescriptor, RelationKind,
    DEFAULT_PRIMARY_KEY_COLUMN,
};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

pub(crate) fn is_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}

/// Descriptor registration failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    DuplicateEntity(String),
    InvalidIdentifier {
        entity: String,
        identifier: String,
    },
    DuplicateMember {
        entity: String,
        member: String,
    },
    UnknownRelationTarget {
        entity: String,
        relation: String,
        target: String,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEntity(name) => write!(f, "entity `{name}` is registered twice"),
            Self::InvalidIdentifier { entity, identifier } => {
                write!(f, "entity `{entity}` uses invalid identifier `{identifier}`")
            }
            Self::DuplicateMember { entity, member } => {
                write!(f, "entity `{entity}` declares `{member}` more than once")
            }
            Self::UnknownRelationTarget {
                entity,
                relation,
                target,
            } => write!(
                f,
                "relation `{entity}.{relation}` targets unregistered entity `{target}`"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Immutable registry of entity descriptors.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: HashMap<String, EntityDescriptor>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    /// Primary-key column of `entity`: declared override or `"id"`.
    pub fn primary_key_column(&self, entity: &str) -> Option<&str> {
        self.entity(entity)
            .map(EntityDescriptor::primary_key_column)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Collects descriptors and validates them as a whole in [`SchemaBuilder::build`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityDescriptor>,
}

impl SchemaBuilder {
    pub fn entity(mut self, descriptor: EntityDescriptor) -> Self {
        self.entities.push(descriptor);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut entities = HashMap::with_capacity(self.entities.len());
        for descriptor in self.entities {
            validate_descriptor(&descriptor)?;
            let name = descriptor.name().to_string();
            if entities.contains_key(&name) {
                return Err(SchemaError::DuplicateEntity(name));
            }
            entities.insert(name, descriptor);
        }

        for descriptor in entities.values() {
            for relation in descriptor.relations() {
                if !entities.contains_key(&relation.target) {
                    return Err(SchemaError::UnknownRelationTarget {
                        entity: descriptor.name().to_string(),
                        relation: relation.name.clone(),
                        target: relation.target.clone(),
                    });
                }
            }
        }

        Ok(Schema { entities })
    }
}

fn validate_descriptor(descriptor: &EntityDescriptor) -> Result<(), SchemaError> {
    let entity = descriptor.name();
    let relation_columns = descriptor.relations().iter().map(|relation| match &relation.kind {
        RelationKind::ToOne { local_column } => local_column.as_str(),
        RelationKind::ToMany { remote_column } => remote_column.as_str(),
    });
    let identifiers = [entity, descriptor.table(), descriptor.primary_key_column()]
        .into_iter()
        .chain(descriptor.fields().iter().flat_map(|field| {
            [field.name.as_str(), field.column.as_str()]
        }))
        .chain(descriptor.relations().iter().map(|relation| relation.name.as_str()))
        .chain(relation_columns);

    for identifier in identifiers {
        if !is_identifier(identifier) {
            return Err(SchemaError::InvalidIdentifier {
                entity: entity.to_string(),
                identifier: identifier.to_string(),
            });
        }
    }

    // Field and relation names share one namespace so path segments stay
    // unambiguous.
    let mut members: Vec<&str> = Vec::new();
    let names = descriptor
        .fields()
        .iter()
        .map(|field| field.name.as_str())
        .chain(descriptor.relations().iter().map(|relation| relation.name.as_str()));
    for name in names {
        if members.contains(&name) {
            return Err(SchemaError::DuplicateMember {
                entity: entity.to_string(),
                member: name.to_string(),
            });
        }
        members.push(name);
    }

    Ok(())
}
