// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use diesel::allow_tables_to_appear_in_same_query;
use diesel::table;

table! {
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        password_hash -> Nullable<Text>,
        image -> Nullable<Text>,
        cover_image -> Nullable<Text>,
        bio -> Nullable<Text>,
        followers -> Array<Uuid>,
        following -> Array<Uuid>,
        blocked_users -> Array<Uuid>,
        notification_preferences -> Jsonb,
        privacy_preferences -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    recipes (id) {
        id -> Uuid,
        title -> Varchar,
        slug -> Varchar,
        description -> Nullable<Text>,
        ingredients -> Jsonb,
        steps -> Jsonb,
        media -> Jsonb,
        tags -> Array<Text>,
        difficulty -> Varchar,
        prep_time -> Int4,
        cook_time -> Int4,
        servings -> Int4,
        author_id -> Uuid,
        likes -> Array<Uuid>,
        comments -> Array<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    comments (id) {
        id -> Uuid,
        content -> Text,
        author_id -> Uuid,
        recipe_id -> Uuid,
        parent_id -> Nullable<Uuid>,
        likes -> Array<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    cookbooks (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        owner_id -> Uuid,
        collaborators -> Array<Uuid>,
        recipes -> Array<Uuid>,
        cover_image -> Nullable<Text>,
        is_public -> Bool,
        tags -> Array<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    meal_plans (id) {
        id -> Uuid,
        title -> Varchar,
        owner_id -> Uuid,
        collaborators -> Array<Uuid>,
        start_date -> Date,
        end_date -> Date,
        days -> Jsonb,
        grocery_list -> Jsonb,
        notes -> Nullable<Text>,
        is_template -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    activities (id) {
        id -> Uuid,
        actor_id -> Uuid,
        activity_type -> Varchar,
        recipe_id -> Nullable<Uuid>,
        cookbook_id -> Nullable<Uuid>,
        comment_id -> Nullable<Uuid>,
        target_user_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

table! {
    notifications (id) {
        id -> Uuid,
        recipient_id -> Uuid,
        sender_id -> Uuid,
        notification_type -> Varchar,
        read -> Bool,
        recipe_id -> Nullable<Uuid>,
        comment_id -> Nullable<Uuid>,
        cookbook_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

allow_tables_to_appear_in_same_query!(
    users,
    recipes,
    comments,
    cookbooks,
    meal_plans,
    activities,
    notifications,
);
