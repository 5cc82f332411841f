#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use repokit::context::DbContext;
use repokit::repository::DbCommandRepository;
use repokit::storage::{InMemoryStore, SqliteStore};
use repokit_core::storage::{Cardinality, CommandRepository, Entity, Relation, Store};

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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: u32,
    pub category_id: u32,
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub links: Vec<Link>,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSummary {
    pub id: u32,
    pub organization: String,
}

impl From<Link> for LinkSummary {
    fn from(link: Link) -> Self {
        Self {
            id: link.id,
            organization: link.organization,
        }
    }
}

pub fn link(id: u32, category_id: u32) -> Link {
    Link {
        id,
        category_id,
        organization: format!("org {}", id % 3),
        category: None,
    }
}

pub fn category(id: u32) -> Category {
    Category {
        id,
        name: format!("category {id}"),
        links: Vec::new(),
    }
}

pub fn in_memory() -> Arc<DbContext<InMemoryStore>> {
    Arc::new(DbContext::new(Arc::new(InMemoryStore::new())))
}

pub async fn sqlite() -> Arc<DbContext<SqliteStore>> {
    let store = SqliteStore::new_in_memory()
        .await
        .expect("in-memory SQLite should open");
    Arc::new(DbContext::new(Arc::new(store)))
}

/// Stores `count` links, link `i` in category `i`, plus the categories.
/// The tracker is left empty.
pub async fn seed<S: Store + 'static>(context: &Arc<DbContext<S>>, count: u32) {
    let categories = DbCommandRepository::<Category, S>::new(Arc::clone(context));
    let links = DbCommandRepository::<Link, S>::new(Arc::clone(context));

    categories
        .add_range((1..=count).map(category).collect())
        .await
        .expect("categories should stage");
    links
        .add_range((1..=count).map(|id| link(id, id)).collect())
        .await
        .expect("links should stage");
    links.save_changes().await.expect("seed should commit");
    context.clear_tracker().await;
}
