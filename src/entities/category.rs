//! Product categories

use crate::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    /// Lower-cased name; the case-insensitive uniqueness key
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Category, "categories", "category");

impl Category {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        let name = name.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
            description,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.trim().to_string();
        self.slug = slugify(&self.name);
    }
}

pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase()
}
