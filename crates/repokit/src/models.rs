use serde::{Deserialize, Serialize};
use uuid::Uuid;

use repokit_core::storage::{Cardinality, Entity, Relation};

const LINK_RELATIONS: &[Relation] = &[Relation {
    name: "category",
    table: "categories",
    local_field: "category_id",
    foreign_field: "id",
    cardinality: Cardinality::One,
    relations: category_relations,
}];

const CATEGORY_RELATIONS: &[Relation] = &[Relation {
    name: "links",
    table: "links",
    local_field: "id",
    foreign_field: "category_id",
    cardinality: Cardinality::Many,
    relations: link_relations,
}];

fn link_relations() -> &'static [Relation] {
    LINK_RELATIONS
}

fn category_relations() -> &'static [Relation] {
    CATEGORY_RELATIONS
}

/// A bookmarked link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: Uuid,
    pub category_id: u32,
    pub description: String,
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Link {
    pub fn new(category_id: u32, organization: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            description: format!("link in category {category_id}"),
            organization: organization.into(),
            category: None,
        }
    }
}

impl Entity for Link {
    const TABLE: &'static str = "links";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn relations() -> &'static [Relation] {
        LINK_RELATIONS
    }
}

/// A link category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Category {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: format!("category {id}"),
            links: Vec::new(),
        }
    }
}

impl Entity for Category {
    const TABLE: &'static str = "categories";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn relations() -> &'static [Relation] {
        CATEGORY_RELATIONS
    }
}
