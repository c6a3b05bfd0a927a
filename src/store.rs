use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::recipe::Recipe;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// 菜谱存储查询层
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// 按 id 查询菜谱及其配料，不存在时返回 `Ok(None)`
    async fn find_recipe(&self, id: &str) -> Result<Option<Recipe>, StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryRecipeStore {
    recipes: Arc<RwLock<HashMap<String, Recipe>>>,
}

impl InMemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 数组文件加载初始数据
    pub async fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Loading recipe seed data from {:?}", path);

        let content = tokio::fs::read(path).await?;
        let recipes: Vec<Recipe> = serde_json::from_slice(&content)?;

        let store = Self::new();
        for recipe in recipes {
            store.insert(recipe).await;
        }
        info!("Loaded {} recipes", store.len().await);
        Ok(store)
    }

    /// 插入或替换菜谱
    pub async fn insert(&self, recipe: Recipe) {
        debug!("Storing recipe: {}", recipe.id);
        self.recipes.write().await.insert(recipe.id.clone(), recipe);
    }

    pub async fn len(&self) -> usize {
        self.recipes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.recipes.read().await.is_empty()
    }
}

#[async_trait]
impl RecipeStore for InMemoryRecipeStore {
    async fn find_recipe(&self, id: &str) -> Result<Option<Recipe>, StoreError> {
        let recipe = self.recipes.read().await.get(id).cloned();
        debug!("Recipe lookup for {}: {}", id, if recipe.is_some() { "hit" } else { "miss" });
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::Ingredient;
    use std::io::Write;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryRecipeStore::new();
        assert!(store.is_empty().await);

        store
            .insert(Recipe::new("r1", "Soup", "u1").with_ingredient(Ingredient::new("i1", "Water")))
            .await;

        let found = store.find_recipe("r1").await.unwrap().unwrap();
        assert_eq!(found.name, "Soup");
        assert_eq!(found.ingredients.len(), 1);
        assert!(store.find_recipe("missing").await.unwrap().is_none());

        store.insert(Recipe::new("r1", "Stew", "u1")).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.find_recipe("r1").await.unwrap().unwrap().name, "Stew");
    }

    #[tokio::test]
    async fn test_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "r1", "name": "Soup", "totalTime": "30 min", "instructions": "Boil.",
                  "userId": "u1", "updatedAt": "2024-01-01T00:00:00Z",
                  "ingredients": [{{"id": "i1", "name": "Water", "amount": "1 l"}}]}},
                {{"id": "r2", "name": "Toast", "userId": "u2"}}
            ]"#
        )
        .unwrap();

        let store = InMemoryRecipeStore::from_seed_file(file.path()).await.unwrap();
        assert_eq!(store.len().await, 2);

        let soup = store.find_recipe("r1").await.unwrap().unwrap();
        assert_eq!(soup.total_time, "30 min");
        assert!(soup.image_url.is_empty());
        assert_eq!(soup.meal_plan_multiplier, None);
        assert_eq!(soup.ingredients[0].amount.as_deref(), Some("1 l"));

        let toast = store.find_recipe("r2").await.unwrap().unwrap();
        assert!(toast.ingredients.is_empty());
    }

    #[tokio::test]
    async fn test_bundled_seed_data() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/recipes.json");
        let store = InMemoryRecipeStore::from_seed_file(path).await.unwrap();
        assert_eq!(store.len().await, 2);
        let soup = store.find_recipe("r1").await.unwrap().unwrap();
        assert_eq!(soup.name, "Soup");
        assert_eq!(soup.meal_plan_multiplier, Some(2));
        assert!(soup.created_at < soup.updated_at);
    }

    #[tokio::test]
    async fn test_seed_file_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = InMemoryRecipeStore::from_seed_file(file.path()).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
