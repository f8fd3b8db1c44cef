//! Entity schema registry
//!
//! Every entity type is described once, statically, by an [`EntitySchema`]:
//! its collection, its ordered field descriptors, and its named relations.
//! The mapper and the query builder consult these descriptors instead of
//! inspecting payload values at runtime.

use std::fmt;

use super::entities::{
    ASTRONOMER, CELESTIAL_PHENOMENON, EXOPLANET, OBSERVATION, PLANET, SCHEMAS, STAR, TELESCOPE,
};

/// The seven catalogued entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Astronomer,
    Star,
    Planet,
    Exoplanet,
    CelestialPhenomenon,
    Observation,
    Telescope,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        EntityType::Astronomer,
        EntityType::Star,
        EntityType::Planet,
        EntityType::Exoplanet,
        EntityType::CelestialPhenomenon,
        EntityType::Observation,
        EntityType::Telescope,
    ];

    /// Look up the schema for this entity type.
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            EntityType::Astronomer => &ASTRONOMER,
            EntityType::Star => &STAR,
            EntityType::Planet => &PLANET,
            EntityType::Exoplanet => &EXOPLANET,
            EntityType::CelestialPhenomenon => &CELESTIAL_PHENOMENON,
            EntityType::Observation => &OBSERVATION,
            EntityType::Telescope => &TELESCOPE,
        }
    }

    /// Resolve an entity type from its collection (route) name.
    pub fn from_collection(name: &str) -> Option<Self> {
        SCHEMAS.iter().find(|s| s.collection == name).map(|s| s.entity)
    }

    pub fn collection(self) -> &'static str {
        self.schema().collection
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    DateTime,
    /// Identifier of one record of the given type, or null.
    Reference(EntityType),
    /// Ordered identifiers of records of the given type; duplicates allowed.
    ReferenceList(EntityType),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::DateTime => "datetime",
            FieldKind::Reference(_) => "reference",
            FieldKind::ReferenceList(_) => "reference_list",
        }
    }

    /// Entity type pointed at by a reference or reference list.
    pub fn referenced_type(&self) -> Option<EntityType> {
        match self {
            FieldKind::Reference(t) | FieldKind::ReferenceList(t) => Some(*t),
            _ => None,
        }
    }

    /// Numbers and datetimes accept range bounds.
    pub fn is_ordered_scalar(&self) -> bool {
        matches!(self, FieldKind::Number | FieldKind::DateTime)
    }
}

/// Field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDef {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// How a named relation is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Records of `child` whose reference field `parent_field` holds the id.
    Children {
        child: EntityType,
        parent_field: &'static str,
    },
    /// Records of `holder` whose reference list `list_field` contains the id.
    Members {
        holder: EntityType,
        list_field: &'static str,
    },
}

impl RelationKind {
    /// Entity type returned when the relation is resolved.
    pub fn target(&self) -> EntityType {
        match self {
            RelationKind::Children { child, .. } => *child,
            RelationKind::Members { holder, .. } => *holder,
        }
    }

    /// Field on the target type that points back at the owner.
    pub fn back_field(&self) -> &'static str {
        match self {
            RelationKind::Children { parent_field, .. } => parent_field,
            RelationKind::Members { list_field, .. } => list_field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub kind: RelationKind,
}

/// Static description of one entity type.
#[derive(Debug)]
pub struct EntitySchema {
    pub entity: EntityType,
    /// Collection / route name (e.g. `estrelas`).
    pub collection: &'static str,
    /// Key holding the record array in list responses.
    pub list_key: &'static str,
    /// Human label used in response messages (e.g. `Estrela`).
    pub label: &'static str,
    /// Grammatical gender of the label, for message agreement.
    pub feminine: bool,
    pub fields: &'static [FieldDef],
    pub relations: &'static [RelationDef],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Reference / reference-list fields that point at `target`.
    pub fn fields_referencing(
        &self,
        target: EntityType,
    ) -> impl Iterator<Item = &'static FieldDef> {
        self.fields
            .iter()
            .filter(move |f| f.kind.referenced_type() == Some(target))
    }

    fn past_participle(&self, masculine: &'static str, feminine: &'static str) -> String {
        let verb = if self.feminine { feminine } else { masculine };
        format!("{} {} com sucesso", self.label, verb)
    }

    pub fn created_message(&self) -> String {
        self.past_participle("criado", "criada")
    }

    pub fn updated_message(&self) -> String {
        self.past_participle("atualizado", "atualizada")
    }

    pub fn deleted_message(&self) -> String {
        self.past_participle("excluído", "excluída")
    }

    pub fn not_found_message(&self) -> String {
        let verb = if self.feminine {
            "não encontrada"
        } else {
            "não encontrado"
        };
        format!("{} {}", self.label, verb)
    }
}

/// All registered schemas, in declaration order.
pub fn all() -> &'static [&'static EntitySchema] {
    &SCHEMAS
}
