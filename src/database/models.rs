// Copyright 2023 Remi Bernotavicius

use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel_derive_newtype::DieselNewType;
use serde::{Deserialize, Serialize};

#[derive(
    DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize,
)]
pub struct UserId(i32);

impl UserId {
    pub fn new(raw: i32) -> Self {
        Self(raw)
    }
}

#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::database::schema::users)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(
    DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize,
)]
pub struct TagId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::database::schema::tags)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(
    DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize,
)]
pub struct IngredientId(i32);

impl IngredientId {
    pub fn new(raw: i32) -> Self {
        Self(raw)
    }
}

#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(
    DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize,
)]
pub struct RecipeId(i32);

impl RecipeId {
    pub fn new(raw: i32) -> Self {
        Self(raw)
    }
}

#[derive(Associations, Queryable, Selectable, Identifiable, Clone)]
#[diesel(belongs_to(User, foreign_key = author_id))]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: chrono::NaiveDateTime,
}

/// Shortened recipe row for places that only show the card, not the body.
#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeHandle {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(
    DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize,
)]
pub struct RecipeIngredientId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Ingredient))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub amount: i32,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Clone)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Tag))]
#[diesel(primary_key(recipe_id, tag_id))]
#[diesel(table_name = crate::database::schema::recipe_tags)]
pub struct RecipeTag {
    pub recipe_id: RecipeId,
    pub tag_id: TagId,
}

#[derive(
    DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize,
)]
pub struct FollowId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::database::schema::follows)]
pub struct Follow {
    pub id: FollowId,
    pub user_id: UserId,
    pub author_id: UserId,
}

#[derive(
    DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize,
)]
pub struct FavoriteId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::database::schema::favorites)]
pub struct Favorite {
    pub id: FavoriteId,
    pub user_id: UserId,
    pub recipe_id: RecipeId,
}

#[derive(
    DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize,
)]
pub struct ShoppingListEntryId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::database::schema::shopping_list)]
pub struct ShoppingListEntry {
    pub id: ShoppingListEntryId,
    pub user_id: UserId,
    pub recipe_id: RecipeId,
}
