//! Declarative entity descriptors.
//!
//! # Invariants
//! - The primary-key column is `"id"` unless explicitly overridden.
//! - A field's column defaults to the field name.
//! - Descriptors are immutable once registered in a [`crate::schema::Schema`].

pub const DEFAULT_PRIMARY_KEY_COLUMN: &str = "id";

/// One scalar attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub column: String,
}

/// How a relation is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// `source.local_column` references the target's primary key.
    ToOne { local_column: String },
    /// `target.remote_column` references the source's primary key.
    ToMany { remote_column: String },
}

/// Navigable link from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
}

impl RelationDescriptor {
    pub fn is_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::ToMany { .. })
    }
}

/// Schema registration record for a single entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    name: String,
    table: String,
    primary_key_column: String,
    fields: Vec<FieldDescriptor>,
    relations: Vec<RelationDescriptor>,
}

impl EntityDescriptor {
    /// Starts a descriptor for `name` stored in `table`.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key_column: DEFAULT_PRIMARY_KEY_COLUMN.to_string(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Overrides the default `"id"` primary-key column.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key_column = column.into();
        self
    }

    /// Adds a field whose column has the same name.
    pub fn field(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let column = name.clone();
        self.field_with_column(name, column)
    }

    pub fn field_with_column(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            column: column.into(),
        });
        self
    }

    /// Adds a to-one relation stored as a foreign key on this entity's table.
    pub fn to_one(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        local_column: impl Into<String>,
    ) -> Self {
        self.relations.push(RelationDescriptor {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::ToOne {
                local_column: local_column.into(),
            },
        });
        self
    }

    /// Adds a to-many relation stored as a foreign key on the target's table.
    pub fn to_many(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        remote_column: impl Into<String>,
    ) -> Self {
        self.relations.push(RelationDescriptor {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::ToMany {
                remote_column: remote_column.into(),
            },
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key_column(&self) -> &str {
        &self.primary_key_column
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    /// Looks up a field by name. The primary-key column always resolves,
    /// even when no field declares it.
    pub fn find_column(&self, segment: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == segment)
            .map(|field| field.column.as_str())
            .or_else(|| {
                (segment == self.primary_key_column).then_some(self.primary_key_column.as_str())
            })
    }

    pub fn find_relation(&self, segment: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|relation| relation.name == segment)
    }

    /// Columns selected when materializing this entity: primary key first,
    /// then declared field columns in declaration order.
    pub fn select_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.primary_key_column.as_str()];
        for field in &self.fields {
            if !columns.contains(&field.column.as_str()) {
                columns.push(field.column.as_str());
            }
        }
        columns
    }
}
