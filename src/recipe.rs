use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::digest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub amount: Option<String>,
}

impl Ingredient {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }
}

/// 单次请求从存储读取的菜谱快照，只读，不在服务端缓存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub total_time: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub image_url: String,
    /// 加入膳食计划时的份数倍数，不在计划中为 `None`
    #[serde(default)]
    pub meal_plan_multiplier: Option<u32>,
    pub user_id: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

// 字段顺序即序列化顺序，不要调整
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalRecipe<'a> {
    id: &'a str,
    name: &'a str,
    total_time: &'a str,
    instructions: &'a str,
    image_url: &'a str,
    meal_plan_multiplier: Option<u32>,
    user_id: &'a str,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
    ingredients: Vec<&'a Ingredient>,
}

impl Recipe {
    pub fn new(id: impl Into<String>, name: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            total_time: String::new(),
            instructions: String::new(),
            image_url: String::new(),
            meal_plan_multiplier: None,
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
            ingredients: Vec::new(),
        }
    }

    pub fn with_total_time(mut self, total_time: impl Into<String>) -> Self {
        self.total_time = total_time.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn with_meal_plan_multiplier(mut self, multiplier: u32) -> Self {
        self.meal_plan_multiplier = Some(multiplier);
        self
    }

    pub fn with_ingredient(mut self, ingredient: Ingredient) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    /// 规范化序列化：固定字段顺序，配料按 id 排序
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut ingredients: Vec<&Ingredient> = self.ingredients.iter().collect();
        ingredients.sort_by(|a, b| a.id.cmp(&b.id));

        serde_json::to_vec(&CanonicalRecipe {
            id: &self.id,
            name: &self.name,
            total_time: &self.total_time,
            instructions: &self.instructions,
            image_url: &self.image_url,
            meal_plan_multiplier: self.meal_plan_multiplier,
            user_id: &self.user_id,
            created_at: &self.created_at,
            updated_at: &self.updated_at,
            ingredients,
        })
    }

    /// 资源 etag = digest(规范化序列化)
    pub fn etag(&self) -> Result<String, serde_json::Error> {
        Ok(digest(&self.canonical_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soup() -> Recipe {
        Recipe::new("r1", "Soup", "u1")
            .with_total_time("30 min")
            .with_instructions("Boil water.")
            .with_image_url("https://example.com/soup.png")
            .with_ingredient(Ingredient::new("i1", "Water").with_amount("1 l"))
            .with_ingredient(Ingredient::new("i2", "Salt"))
    }

    #[test]
    fn test_etag_is_deterministic() {
        let recipe = soup();
        assert_eq!(recipe.etag().unwrap(), recipe.etag().unwrap());
        assert_eq!(recipe.etag().unwrap(), recipe.clone().etag().unwrap());
        assert_eq!(recipe.etag().unwrap().len(), 64);
    }

    #[test]
    fn test_ingredient_order_does_not_change_etag() {
        let recipe = soup();
        let mut reordered = recipe.clone();
        reordered.ingredients.reverse();
        assert_eq!(recipe.etag().unwrap(), reordered.etag().unwrap());
    }

    #[test]
    fn test_any_field_change_changes_etag() {
        let base = soup();
        let base_tag = base.etag().unwrap();

        let mut renamed = base.clone();
        renamed.name = "Stew".into();

        let mut retimed = base.clone();
        retimed.total_time = "45 min".into();

        let mut rewritten = base.clone();
        rewritten.instructions = "Boil water. Add salt.".into();

        let mut amount_changed = base.clone();
        amount_changed.ingredients[1].amount = Some("1 tsp".into());

        let mut ingredient_added = base.clone();
        ingredient_added.ingredients.push(Ingredient::new("i3", "Pepper"));

        let mut new_image = base.clone();
        new_image.image_url = "https://example.com/soup-2.png".into();

        let planned = base.clone().with_meal_plan_multiplier(2);
        let mut replanned = planned.clone();
        replanned.meal_plan_multiplier = Some(4);

        let mut recreated = base.clone();
        recreated.created_at += chrono::Duration::seconds(1);

        for changed in [
            renamed,
            retimed,
            rewritten,
            amount_changed,
            ingredient_added,
            new_image,
            planned.clone(),
            recreated,
        ] {
            assert_ne!(changed.etag().unwrap(), base_tag);
        }
        assert_ne!(replanned.etag().unwrap(), planned.etag().unwrap());
    }

    #[test]
    fn test_canonical_json_shape() {
        let bytes = soup().canonical_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(r#"{"id":"r1","name":"Soup","totalTime":"30 min""#));
        assert!(text.contains(r#""imageUrl":"https://example.com/soup.png","mealPlanMultiplier":null,"userId":"u1""#));
        assert!(text.contains(r#"{"id":"i2","name":"Salt","amount":null}"#));
    }
}
