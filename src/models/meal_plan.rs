// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{ValidationIssue, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealTime {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub recipe_id: Uuid,
    pub servings: i32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub breakfast: Vec<Meal>,
    #[serde(default)]
    pub lunch: Vec<Meal>,
    #[serde(default)]
    pub dinner: Vec<Meal>,
    #[serde(default)]
    pub snacks: Vec<Meal>,
}

impl MealDay {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            breakfast: Vec::new(),
            lunch: Vec::new(),
            dinner: Vec::new(),
            snacks: Vec::new(),
        }
    }

    fn slot_mut(&mut self, time: MealTime) -> &mut Vec<Meal> {
        match time {
            MealTime::Breakfast => &mut self.breakfast,
            MealTime::Lunch => &mut self.lunch,
            MealTime::Dinner => &mut self.dinner,
            MealTime::Snacks => &mut self.snacks,
        }
    }

    pub fn meals(&self) -> impl Iterator<Item = &Meal> {
        self.breakfast
            .iter()
            .chain(&self.lunch)
            .chain(&self.dinner)
            .chain(&self.snacks)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub item: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Uuid,
    pub collaborators: Vec<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<MealDay>,
    pub grocery_list: Vec<GroceryItem>,
    pub notes: Option<String>,
    pub is_template: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MealPlanDraft {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_template: bool,
}

impl MealPlanDraft {
    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut v = Validator::new();
        v.length(self.title.trim(), "title", 1, 100, "Title");
        v.check(
            self.end_date >= self.start_date,
            "end_date",
            "End date must be after or equal to start date",
        );
        v.finish()
    }
}

impl MealPlan {
    pub fn from_draft(draft: MealPlanDraft, owner_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            owner_id,
            collaborators: Vec::new(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            days: Vec::new(),
            grocery_list: Vec::new(),
            notes: draft.notes,
            is_template: draft.is_template,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_access(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.collaborators.contains(&user_id)
    }

    /// Append a meal to `date`, creating the day when it is not planned yet
    pub fn add_meal(&mut self, date: NaiveDate, time: MealTime, meal: Meal) {
        match self.days.iter_mut().find(|day| day.date == date) {
            Some(day) => day.slot_mut(time).push(meal),
            None => {
                let mut day = MealDay::new(date);
                day.slot_mut(time).push(meal);
                self.days.push(day);
                self.days.sort_by_key(|d| d.date);
            }
        }
    }

    pub fn add_grocery_item(&mut self, mut item: GroceryItem) {
        item.checked = false;
        self.grocery_list.push(item);
    }

    /// Flip the checked flag; returns the new state
    pub fn toggle_grocery_item(&mut self, index: usize) -> Option<bool> {
        let item = self.grocery_list.get_mut(index)?;
        item.checked = !item.checked;
        Some(item.checked)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}
