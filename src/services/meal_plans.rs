// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::current_user;
use crate::error::{ApiResult, AppError};
use crate::models::{GroceryItem, Meal, MealPlan, MealPlanDraft, MealTime};
use crate::store::Store;
use crate::validation::Validator;

#[derive(Debug, Clone, Deserialize)]
pub struct AddMealRequest {
    pub date: NaiveDate,
    #[serde(alias = "mealTime")]
    pub meal_time: MealTime,
    #[serde(alias = "recipeId")]
    pub recipe_id: Uuid,
    pub servings: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddGroceryRequest {
    pub item: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Plans are only visible to their owner and collaborators
async fn load(store: &dyn Store, plan_id: Uuid, user_id: Uuid) -> ApiResult<MealPlan> {
    store
        .get_meal_plan(plan_id)
        .await?
        .filter(|plan| plan.has_access(user_id))
        .ok_or_else(plan_gone)
}

fn plan_gone() -> AppError {
    AppError::not_found("Meal plan not found")
}

pub async fn create_meal_plan(store: &dyn Store, owner_id: Uuid, draft: MealPlanDraft) -> ApiResult<MealPlan> {
    draft.validate()?;
    let owner = current_user(store, owner_id).await?;
    let plan = MealPlan::from_draft(draft, owner.id, Utc::now());
    store.insert_meal_plan(&plan).await?;
    info!("User {} created meal plan {}", owner.id, plan.id);
    Ok(plan)
}

pub async fn list_meal_plans(store: &dyn Store, user_id: Uuid) -> ApiResult<Vec<MealPlan>> {
    Ok(store.list_meal_plans(user_id).await?)
}

pub async fn get_meal_plan(store: &dyn Store, user_id: Uuid, plan_id: Uuid) -> ApiResult<MealPlan> {
    load(store, plan_id, user_id).await
}

pub async fn delete_meal_plan(store: &dyn Store, user_id: Uuid, plan_id: Uuid) -> ApiResult<()> {
    let plan = load(store, plan_id, user_id).await?;
    if plan.owner_id != user_id {
        return Err(AppError::forbidden("Only the owner can delete this meal plan"));
    }
    store.delete_meal_plan(plan.id).await?;
    info!("User {} deleted meal plan {}", user_id, plan.id);
    Ok(())
}

pub async fn add_meal(
    store: &dyn Store,
    user_id: Uuid,
    plan_id: Uuid,
    request: AddMealRequest,
) -> ApiResult<MealPlan> {
    let plan = load(store, plan_id, user_id).await?;

    let mut v = Validator::new();
    v.check(request.servings >= 1, "servings", "Must serve at least 1 person")
        .check(
            plan.covers(request.date),
            "date",
            "Date must fall within the meal plan",
        );
    v.finish()?;

    let recipe = store
        .get_recipe(request.recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    let meal = Meal {
        recipe_id: recipe.id,
        servings: request.servings,
        notes: request.notes,
        completed: false,
    };
    let plan = store
        .add_meal(plan.id, request.date, request.meal_time, meal)
        .await?
        .ok_or_else(plan_gone)?;
    debug!("Added {} to {} on {}", recipe.id, plan.id, request.date);
    Ok(plan)
}

pub async fn add_grocery_item(
    store: &dyn Store,
    user_id: Uuid,
    plan_id: Uuid,
    request: AddGroceryRequest,
) -> ApiResult<MealPlan> {
    let mut v = Validator::new();
    v.check(!request.item.trim().is_empty(), "item", "Item name is required")
        .check(
            request.quantity.is_finite() && request.quantity >= 0.0,
            "quantity",
            "Quantity cannot be negative",
        )
        .check(!request.unit.trim().is_empty(), "unit", "Unit is required");
    v.finish()?;

    let plan = load(store, plan_id, user_id).await?;
    let item = GroceryItem {
        item: request.item.trim().to_string(),
        quantity: request.quantity,
        unit: request.unit.trim().to_string(),
        checked: false,
        category: request.category,
    };
    store.add_grocery_item(plan.id, item).await?.ok_or_else(plan_gone)

}

pub async fn toggle_grocery_item(
    store: &dyn Store,
    user_id: Uuid,
    plan_id: Uuid,
    index: usize,
) -> ApiResult<MealPlan> {
    let plan = load(store, plan_id, user_id).await?;
    if let Some(plan) = store.toggle_grocery_item(plan.id, index).await? {
        return Ok(plan);
    }
    match store.get_meal_plan(plan.id).await? {
        Some(_) => Err(AppError::not_found("Grocery item not found")),
        None => Err(plan_gone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, NewUser, Recipe, RecipeDraft, User};
    use crate::store::MemoryStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser {
                name: name.into(),
                email: format!("{}@example.com", name),
                password_hash: None,
            })
            .await
            .unwrap()
    }

    async fn plan(store: &MemoryStore, owner: Uuid) -> MealPlan {
        create_meal_plan(
            store,
            owner,
            MealPlanDraft {
                title: "May week 1".into(),
                start_date: date(4),
                end_date: date(10),
                notes: None,
                is_template: false,
            },
        )
        .await
        .unwrap()
    }

    fn meal(recipe_id: Uuid, day: u32, servings: i32) -> AddMealRequest {
        AddMealRequest {
            date: date(day),
            meal_time: MealTime::Dinner,
            recipe_id,
            servings,
            notes: None,
        }
    }

    #[tokio::test]
    async fn meals_must_fall_inside_the_plan() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let recipe = Recipe::from_draft(
            RecipeDraft {
                title: "Chili".into(),
                description: None,
                ingredients: vec![],
                steps: vec![],
                media: vec![],
                tags: vec![],
                difficulty: Difficulty::Easy,
                prep_time: 10,
                cook_time: 60,
                servings: 6,
            },
            "chili".into(),
            ana.id,
            Utc::now(),
        );
        store.insert_recipe(&recipe).await.unwrap();
        let week = plan(&store, ana.id).await;

        let err = add_meal(&store, ana.id, week.id, meal(recipe.id, 11, 2)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = add_meal(&store, ana.id, week.id, meal(recipe.id, 5, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = add_meal(&store, ana.id, week.id, meal(recipe.id, 5, 2)).await.unwrap();
        assert_eq!(updated.days.len(), 1);
        assert_eq!(updated.days[0].dinner[0].recipe_id, recipe.id);
    }

    #[tokio::test]
    async fn grocery_list_toggles_by_index() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let week = plan(&store, ana.id).await;

        let negative = AddGroceryRequest {
            item: "Beans".into(),
            quantity: -1.0,
            unit: "can".into(),
            category: None,
        };
        assert!(add_grocery_item(&store, ana.id, week.id, negative).await.is_err());

        let beans = AddGroceryRequest {
            item: "Beans".into(),
            quantity: 2.0,
            unit: "can".into(),
            category: Some("pantry".into()),
        };
        add_grocery_item(&store, ana.id, week.id, beans).await.unwrap();
        let toggled = toggle_grocery_item(&store, ana.id, week.id, 0).await.unwrap();
        assert!(toggled.grocery_list[0].checked);

        let err = toggle_grocery_item(&store, ana.id, week.id, 3).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn plans_are_private_to_their_members() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let ben = user(&store, "ben").await;
        let week = plan(&store, ana.id).await;

        let err = get_meal_plan(&store, ben.id, week.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(list_meal_plans(&store, ben.id).await.unwrap().is_empty());

        delete_meal_plan(&store, ana.id, week.id).await.unwrap();
        assert!(get_meal_plan(&store, ana.id, week.id).await.is_err());
    }

    #[tokio::test]
    async fn grocery_changes_append_to_the_stored_list() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let week = plan(&store, ana.id).await;
        let item = |name: &str| AddGroceryRequest {
            item: name.into(),
            quantity: 1.0,
            unit: "bag".into(),
            category: None,
        };

        add_grocery_item(&store, ana.id, week.id, item("Rice")).await.unwrap();
        add_grocery_item(&store, ana.id, week.id, item("Lentils")).await.unwrap();
        toggle_grocery_item(&store, ana.id, week.id, 1).await.unwrap();

        let saved = store.get_meal_plan(week.id).await.unwrap().unwrap();
        let names: Vec<&str> = saved.grocery_list.iter().map(|g| g.item.as_str()).collect();
        assert_eq!(names, ["Rice", "Lentils"]);
        assert!(!saved.grocery_list[0].checked);
        assert!(saved.grocery_list[1].checked);
        assert!(saved.updated_at >= week.updated_at);

        store.delete_meal_plan(week.id).await.unwrap();
        assert!(store.toggle_grocery_item(week.id, 0).await.unwrap().is_none());
    }
}
