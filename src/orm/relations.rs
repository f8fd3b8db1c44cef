//! Relationship resolution
//!
//! References are plain identifiers; nothing is loaded implicitly. The
//! resolver issues explicit, read-only queries to follow them. Dangling
//! references resolve to nothing rather than failing.

use super::error::{QueryError, RepositoryError, Result};
use super::filters::{FilterSpec, Predicate, SortSpec};
use super::mapper::{FieldValue, Record};
use super::object_id::ObjectId;
use super::repository::Repository;
use super::schema::{EntityType, FieldDef, FieldKind, RelationKind};

pub struct RelationshipResolver<'a> {
    repository: &'a Repository,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(repository: &'a Repository) -> Self {
        Self { repository }
    }

    /// Children whose reference `parent_field` equals `parent_id`.
    pub async fn children_by_parent_ref(
        &self,
        child: EntityType,
        parent_field: &str,
        parent_id: ObjectId,
    ) -> Result<Vec<Record>> {
        let def = reference_field(child, parent_field, false)?;
        let filter = FilterSpec::all().with(Predicate::refers(def.name, parent_id));
        self.repository
            .find_records(child, &filter, &SortSpec::natural(), None)
            .await
    }

    /// Holders whose reference list `list_field` contains `member_id`.
    pub async fn members_of_list(
        &self,
        holder: EntityType,
        list_field: &str,
        member_id: ObjectId,
    ) -> Result<Vec<Record>> {
        let def = reference_field(holder, list_field, true)?;
        let filter = FilterSpec::all().with(Predicate::contains(def.name, member_id));
        self.repository
            .find_records(holder, &filter, &SortSpec::natural(), None)
            .await
    }

    /// Resolve a named relation of `owner` for the record `id`. Returns the
    /// target entity type with the related records.
    pub async fn resolve(
        &self,
        owner: EntityType,
        relation: &str,
        id: ObjectId,
    ) -> Result<(EntityType, Vec<Record>)> {
        let def = owner
            .schema()
            .relation(relation)
            .ok_or_else(|| RepositoryError::UnknownRelation {
                entity: owner.collection(),
                relation: relation.to_string(),
            })?;

        let records = match def.kind {
            RelationKind::Children {
                child,
                parent_field,
            } => self.children_by_parent_ref(child, parent_field, id).await?,
            RelationKind::Members { holder, list_field } => {
                self.members_of_list(holder, list_field, id).await?
            }
        };
        Ok((def.kind.target(), records))
    }

    /// Parents with at least one related child whose `text_field` contains
    /// `substring` (case-insensitive).
    ///
    /// `path` is a reference / reference-list field of the parent or one of
    /// its named relations; it decides the child type. A parent matches when
    /// it points at a matching child through `path`, or when a matching child
    /// points back at it through any reference typed to the parent.
    pub async fn reverse_by_nested_text(
        &self,
        parent: EntityType,
        path: &str,
        text_field: &str,
        substring: &str,
    ) -> Result<Vec<Record>> {
        let schema = parent.schema();

        let (child, forward): (EntityType, Vec<&'static FieldDef>) =
            match schema.field(path).and_then(|f| f.kind.referenced_type().map(|t| (f, t))) {
                Some((def, child)) => (child, vec![def]),
                None => {
                    let relation =
                        schema
                            .relation(path)
                            .ok_or_else(|| RepositoryError::UnknownRelation {
                                entity: parent.collection(),
                                relation: path.to_string(),
                            })?;
                    let child = relation.kind.target();
                    (child, schema.fields_referencing(child).collect())
                }
            };

        let text_def = child
            .schema()
            .field(text_field)
            .filter(|def| def.kind == FieldKind::Text)
            .ok_or_else(|| QueryError::UnknownFilterField {
                field: text_field.to_string(),
            })?;

        let children = self
            .repository
            .find_records(
                child,
                &FilterSpec::all().with(Predicate::text_contains(text_def.name, substring)),
                &SortSpec::natural(),
                None,
            )
            .await?;
        if children.is_empty() {
            return Ok(Vec::new());
        }

        let child_ids: Vec<ObjectId> = children.iter().map(|c| c.id).collect();
        let mut options: Vec<Predicate> = forward
            .iter()
            .map(|def| Predicate::Refers {
                field: def.name,
                targets: child_ids.clone(),
                many: matches!(def.kind, FieldKind::ReferenceList(_)),
            })
            .collect();

        let back_ids = back_references(&children, parent);
        if !back_ids.is_empty() {
            options.push(Predicate::IdIn(back_ids));
        }

        self.repository
            .find_records(
                parent,
                &FilterSpec::all().with(Predicate::Any(options)),
                &SortSpec::natural(),
                None,
            )
            .await
    }
}

/// Look up a reference (or reference-list) field by name.
fn reference_field(entity: EntityType, name: &str, list: bool) -> Result<&'static FieldDef> {
    entity
        .schema()
        .field(name)
        .filter(|def| match def.kind {
            FieldKind::Reference(_) => !list,
            FieldKind::ReferenceList(_) => list,
            _ => false,
        })
        .ok_or_else(|| {
            QueryError::UnknownFilterField {
                field: name.to_string(),
            }
            .into()
        })
}

/// Identifiers of `parent` records the children point at, deduplicated in
/// first-seen order.
fn back_references(children: &[Record], parent: EntityType) -> Vec<ObjectId> {
    let child_schema = match children.first() {
        Some(c) => c.entity.schema(),
        None => return Vec::new(),
    };

    let mut ids = Vec::new();
    for child in children {
        for def in child_schema.fields_referencing(parent) {
            match child.get(def.name) {
                Some(FieldValue::Reference(id)) => ids.push(*id),
                Some(FieldValue::ReferenceList(list)) => ids.extend(list.iter().copied()),
                _ => {}
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}
