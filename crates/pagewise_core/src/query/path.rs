//! Dotted field path resolution against the registered schema.
//!
//! `address.city` on `person` resolves to one relation step
//! (`person.address -> address`) and the terminal column `city`.
//! Splitting is strictly on `.`; there is no escaping or index syntax.

use crate::schema::{EntityDescriptor, RelationDescriptor, Schema};
use std::fmt::{Display, Formatter};

/// One hop across a relation.
#[derive(Debug, Clone, Copy)]
pub struct PathStep<'s> {
    pub source: &'s EntityDescriptor,
    pub relation: &'s RelationDescriptor,
    pub target: &'s EntityDescriptor,
}

/// Resolved navigation from the root entity to a column.
#[derive(Debug, Clone)]
pub struct FieldPath<'s> {
    pub steps: Vec<PathStep<'s>>,
    pub column: &'s str,
}

impl FieldPath<'_> {
    /// Whether any hop can fan out to several rows per root entity.
    pub fn crosses_to_many(&self) -> bool {
        self.steps.iter().any(|step| step.relation.is_to_many())
    }
}

/// Why a path failed to resolve. Mapped to a sort or filter error by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    pub path: String,
    pub reason: String,
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot resolve `{}`: {}", self.path, self.reason)
    }
}

/// Resolves `path` to relation hops plus a terminal field column.
pub fn resolve_field_path<'s>(
    schema: &'s Schema,
    root: &'s EntityDescriptor,
    path: &str,
) -> Result<FieldPath<'s>, PathError> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, hops) = segments
        .split_last()
        .ok_or_else(|| path_error(path, "path is empty".to_string()))?;

    let steps = walk_relations(schema, root, path, hops)?;
    let owner = steps.last().map_or(root, |step| step.target);
    if last.is_empty() {
        return Err(path_error(path, "path contains an empty segment".to_string()));
    }

    match owner.find_column(last) {
        Some(column) => Ok(FieldPath { steps, column }),
        None if owner.find_relation(last).is_some() => Err(path_error(
            path,
            format!(
                "`{last}` is a relation of `{}`; name one of its fields",
                owner.name()
            ),
        )),
        None => Err(path_error(
            path,
            format!("`{last}` is not a field of `{}`", owner.name()),
        )),
    }
}

/// Resolves a path made only of relations, e.g. `pets` or `address.country`.
pub fn resolve_relation_path<'s>(
    schema: &'s Schema,
    root: &'s EntityDescriptor,
    path: &str,
) -> Result<Vec<PathStep<'s>>, PathError> {
    let segments: Vec<&str> = path.split('.').collect();
    walk_relations(schema, root, path, &segments)
}

fn walk_relations<'s>(
    schema: &'s Schema,
    root: &'s EntityDescriptor,
    path: &str,
    segments: &[&str],
) -> Result<Vec<PathStep<'s>>, PathError> {
    let mut steps = Vec::with_capacity(segments.len());
    let mut current = root;

    for segment in segments {
        if segment.is_empty() {
            return Err(path_error(path, "path contains an empty segment".to_string()));
        }
        let relation = current.find_relation(segment).ok_or_else(|| {
            path_error(
                path,
                format!("`{segment}` is not a relation of `{}`", current.name()),
            )
        })?;
        let target = schema.entity(&relation.target).ok_or_else(|| {
            path_error(
                path,
                format!("relation target `{}` is not registered", relation.target),
            )
        })?;
        steps.push(PathStep {
            source: current,
            relation,
            target,
        });
        current = target;
    }

    Ok(steps)
}

fn path_error(path: &str, reason: String) -> PathError {
    PathError {
        path: path.to_string(),
        reason,
    }
}
