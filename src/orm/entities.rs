//! Entity declarations
//!
//! Field names are the Portuguese names used on the wire and in storage.

use super::schema::{EntitySchema, EntityType, FieldDef, FieldKind, RelationDef, RelationKind};

use FieldKind::{DateTime, Number, Reference, ReferenceList, Text};

pub static ASTRONOMER: EntitySchema = EntitySchema {
    entity: EntityType::Astronomer,
    collection: "astronomos",
    list_key: "astronomos",
    label: "Astrônomo",
    feminine: false,
    fields: &[
        FieldDef::required("nome", Text),
        FieldDef::optional("area_estudo", Text),
        FieldDef::optional("data_nascimento", DateTime),
        FieldDef::optional("observacoes", ReferenceList(EntityType::Observation)),
    ],
    relations: &[RelationDef {
        name: "observacoes",
        kind: RelationKind::Children {
            child: EntityType::Observation,
            parent_field: "astronomo",
        },
    }],
};

pub static STAR: EntitySchema = EntitySchema {
    entity: EntityType::Star,
    collection: "estrelas",
    list_key: "estrelas",
    label: "Estrela",
    feminine: true,
    fields: &[
        FieldDef::required("nome", Text),
        FieldDef::optional("tipo_espectral", Text),
        FieldDef::optional("magnitude", Number),
        FieldDef::optional("distancia", Number),
        FieldDef::optional("luminosidade", Number),
        FieldDef::optional("temperatura", Number),
        FieldDef::optional("idade", Number),
        FieldDef::optional("planetas", ReferenceList(EntityType::Planet)),
        FieldDef::optional("exoplanetas", ReferenceList(EntityType::Exoplanet)),
    ],
    relations: &[
        RelationDef {
            name: "planetas",
            kind: RelationKind::Children {
                child: EntityType::Planet,
                parent_field: "estrela",
            },
        },
        RelationDef {
            name: "exoplanetas",
            kind: RelationKind::Children {
                child: EntityType::Exoplanet,
                parent_field: "estrela",
            },
        },
    ],
};

pub static PLANET: EntitySchema = EntitySchema {
    entity: EntityType::Planet,
    collection: "planetas",
    list_key: "planetas",
    label: "Planeta",
    feminine: false,
    fields: &[
        FieldDef::required("nome", Text),
        FieldDef::optional("tipo", Text),
        FieldDef::optional("periodo_orbital", Number),
        FieldDef::optional("distancia_da_estrela", Number),
        FieldDef::optional("raio", Number),
        FieldDef::optional("massa", Number),
        FieldDef::optional("composicao_atmosferica", Text),
        FieldDef::optional("data_descoberta", DateTime),
        FieldDef::optional("estrela", Reference(EntityType::Star)),
        FieldDef::optional("exoplanetas", ReferenceList(EntityType::Exoplanet)),
    ],
    relations: &[RelationDef {
        name: "exoplanetas",
        kind: RelationKind::Members {
            holder: EntityType::Exoplanet,
            list_field: "planetas",
        },
    }],
};

pub static EXOPLANET: EntitySchema = EntitySchema {
    entity: EntityType::Exoplanet,
    collection: "exoplanetas",
    list_key: "exoplanetas",
    label: "Exoplaneta",
    feminine: false,
    fields: &[
        FieldDef::required("nome", Text),
        FieldDef::optional("estrela", Reference(EntityType::Star)),
        FieldDef::optional("planetas", ReferenceList(EntityType::Planet)),
    ],
    relations: &[RelationDef {
        name: "planetas",
        kind: RelationKind::Members {
            holder: EntityType::Planet,
            list_field: "exoplanetas",
        },
    }],
};

pub static CELESTIAL_PHENOMENON: EntitySchema = EntitySchema {
    entity: EntityType::CelestialPhenomenon,
    collection: "fenomenos",
    list_key: "fenomenos_celestiais",
    label: "Fenômeno celestial",
    feminine: false,
    fields: &[
        FieldDef::required("nome", Text),
        FieldDef::optional("tipo", Text),
        FieldDef::optional("descricao", Text),
        FieldDef::optional("observacoes", ReferenceList(EntityType::Observation)),
    ],
    relations: &[RelationDef {
        name: "observacoes",
        kind: RelationKind::Members {
            holder: EntityType::Observation,
            list_field: "fenomenos",
        },
    }],
};

pub static OBSERVATION: EntitySchema = EntitySchema {
    entity: EntityType::Observation,
    collection: "observacoes",
    list_key: "observacoes",
    label: "Observação",
    feminine: true,
    fields: &[
        FieldDef::required("datahora", DateTime),
        FieldDef::optional("objeto_id", Text),
        FieldDef::optional("observador", Text),
        FieldDef::optional("localizacao", Text),
        FieldDef::optional("propriedades_observadas", Text),
        FieldDef::optional("telescopio", Reference(EntityType::Telescope)),
        FieldDef::optional("astronomo", Reference(EntityType::Astronomer)),
        FieldDef::optional("fenomenos", ReferenceList(EntityType::CelestialPhenomenon)),
    ],
    relations: &[RelationDef {
        name: "fenomenos",
        kind: RelationKind::Members {
            holder: EntityType::CelestialPhenomenon,
            list_field: "observacoes",
        },
    }],
};

pub static TELESCOPE: EntitySchema = EntitySchema {
    entity: EntityType::Telescope,
    collection: "telescopios",
    list_key: "telescopios",
    label: "Telescópio",
    feminine: false,
    fields: &[
        FieldDef::required("nome", Text),
        FieldDef::optional("tipo", Text),
        FieldDef::optional("localizacao", Text),
        FieldDef::optional("diametro", Number),
        FieldDef::optional("data_lancamento", DateTime),
        FieldDef::optional("observacao", Reference(EntityType::Observation)),
    ],
    relations: &[RelationDef {
        name: "observacoes",
        kind: RelationKind::Children {
            child: EntityType::Observation,
            parent_field: "telescopio",
        },
    }],
};

pub static SCHEMAS: [&EntitySchema; 7] = [
    &ASTRONOMER,
    &STAR,
    &PLANET,
    &EXOPLANET,
    &CELESTIAL_PHENOMENON,
    &OBSERVATION,
    &TELESCOPE,
];
