//! Sort requests to ORDER BY terms.
//!
//! Resolution is pure, so an invalid sort field fails before any store
//! access. No implicit primary-key tiebreak is added: rows that tie on every
//! sort term come back in whatever order the store yields.

use super::path::{resolve_field_path, FieldPath};
use crate::pagination::{SortDirection, Sortable};
use crate::repo::{RepoError, RepoResult};
use crate::schema::{EntityDescriptor, Schema};

#[derive(Debug, Clone)]
pub(crate) struct OrderTerm<'s> {
    pub(crate) path: FieldPath<'s>,
    pub(crate) direction: SortDirection,
}

/// Resolved sort terms, highest precedence first.
#[derive(Debug, Clone, Default)]
pub(crate) struct OrderClause<'s> {
    terms: Vec<OrderTerm<'s>>,
}

impl<'s> OrderClause<'s> {
    /// # Errors
    /// - `InvalidSortField` when any segment of a sort field does not resolve.
    pub(crate) fn build(
        schema: &'s Schema,
        root: &'s EntityDescriptor,
        sortable: &Sortable,
    ) -> RepoResult<Self> {
        let terms = sortable
            .specs()
            .iter()
            .map(|spec| {
                let path = resolve_field_path(schema, root, &spec.field).map_err(|err| {
                    RepoError::InvalidSortField {
                        field: err.path,
                        reason: err.reason,
                    }
                })?;
                Ok(OrderTerm {
                    path,
                    direction: spec.direction,
                })
            })
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(Self { terms })
    }

    pub(crate) fn terms(&self) -> &[OrderTerm<'s>] {
        &self.terms
    }
}

#[cfg(test)]
mod tests {
    use super::OrderClause;
    use crate::pagination::{SortDirection, SortSpec, Sortable};
    use crate::repo::RepoError;
    use crate::schema::{EntityDescriptor, Schema};

    fn schema() -> Schema {
        Schema::builder()
            .entity(
                EntityDescriptor::new("person", "people")
                    .field("name")
                    .to_one("address", "address", "address_id"),
            )
            .entity(EntityDescriptor::new("address", "addresses").field("city"))
            .build()
            .unwrap()
    }

    #[test]
    fn empty_sortable_yields_empty_clause() {
        let schema = schema();
        let root = schema.entity("person").unwrap();
        assert!(OrderClause::build(&schema, root, &Sortable::unsorted())
            .unwrap()
            .terms()
            .is_empty());
    }

    #[test]
    fn keeps_caller_precedence() {
        let schema = schema();
        let root = schema.entity("person").unwrap();
        let sort = Sortable::unsorted()
            .then(SortSpec::desc("address.city"))
            .then(SortSpec::asc("name"));

        let clause = OrderClause::build(&schema, root, &sort).unwrap();
        let columns: Vec<_> = clause
            .terms()
            .iter()
            .map(|term| (term.path.column, term.direction))
            .collect();
        assert_eq!(
            columns,
            vec![("city", SortDirection::Desc), ("name", SortDirection::Asc)]
        );
    }

    #[test]
    fn unknown_nested_field_is_invalid_sort_field() {
        let schema = schema();
        let root = schema.entity("person").unwrap();
        let sort = Sortable::unsorted().then(SortSpec::asc("address.nonexistent"));

        let err = OrderClause::build(&schema, root, &sort).unwrap_err();
        assert!(
            matches!(err, RepoError::InvalidSortField { ref field, .. } if field == "address.nonexistent"),
            "{err}"
        );
    }
}
