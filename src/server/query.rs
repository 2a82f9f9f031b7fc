use super::error::AppError;
use crate::database;
use crate::database::models::{
    Favorite, Follow, Ingredient, IngredientId, Recipe, RecipeHandle, RecipeId, RecipeIngredient,
    ShoppingListEntry, Tag, TagId, User, UserId,
};
use diesel::prelude::{Connection as _, OptionalExtension as _};
use diesel::BoolExpressionMethods as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::{HashMap, HashSet};

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

pub fn create_user(conn: &mut database::Connection, new: NewUser) -> Result<User, AppError> {
    use database::schema::users::dsl::*;
    use diesel::insert_into;

    if new.username.trim().is_empty() {
        return Err(AppError::Validation("username must not be empty".into()));
    }
    if new.email.trim().is_empty() {
        return Err(AppError::Validation("email must not be empty".into()));
    }

    let taken: i64 = users
        .filter(username.eq(&new.username).or(email.eq(&new.email)))
        .count()
        .get_result(conn)?;
    if taken > 0 {
        return Err(AppError::AlreadyExists("user"));
    }

    Ok(insert_into(users)
        .values((
            username.eq(&new.username),
            email.eq(&new.email),
            first_name.eq(&new.first_name),
            last_name.eq(&new.last_name),
        ))
        .returning(User::as_returning())
        .get_result(conn)?)
}

pub fn list_users(conn: &mut database::Connection) -> Result<Vec<User>, AppError> {
    use database::schema::users::dsl::*;

    Ok(users
        .select(User::as_select())
        .order(id.asc())
        .load(conn)?)
}

pub fn get_user(conn: &mut database::Connection, user_id: UserId) -> Result<User, AppError> {
    use database::schema::users::dsl::*;

    users
        .select(User::as_select())
        .filter(id.eq(user_id))
        .get_result(conn)
        .optional()?
        .ok_or(AppError::NotFound("user"))
}

/// The identity header is trusted but not assumed valid; an id with no
/// matching row is treated as unauthenticated rather than a dangling edge.
pub fn ensure_user(conn: &mut database::Connection, current: UserId) -> Result<User, AppError> {
    use database::schema::users::dsl::*;

    users
        .select(User::as_select())
        .filter(id.eq(current))
        .get_result(conn)
        .optional()?
        .ok_or(AppError::Unauthorized)
}

pub fn follow_author(
    conn: &mut database::Connection,
    current: UserId,
    target: UserId,
) -> Result<User, AppError> {
    use database::schema::follows::dsl::*;
    use diesel::insert_into;

    ensure_user(conn, current)?;
    let author = get_user(conn, target)?;
    if current == target {
        return Err(AppError::Validation(
            "cannot subscribe to yourself".into(),
        ));
    }

    let count: i64 = follows
        .filter(user_id.eq(current).and(author_id.eq(target)))
        .count()
        .get_result(conn)?;
    if count > 0 {
        return Err(AppError::AlreadyExists("subscription"));
    }

    insert_into(follows)
        .values((user_id.eq(current), author_id.eq(target)))
        .execute(conn)?;
    Ok(author)
}

pub fn unfollow_author(
    conn: &mut database::Connection,
    current: UserId,
    target: UserId,
) -> Result<(), AppError> {
    use database::schema::follows::dsl::*;
    use diesel::delete;

    ensure_user(conn, current)?;
    get_user(conn, target)?;

    let existing: Option<Follow> = follows
        .select(Follow::as_select())
        .filter(user_id.eq(current).and(author_id.eq(target)))
        .get_result(conn)
        .optional()?;
    let Some(follow) = existing else {
        return Err(AppError::NotFound("subscription"));
    };
    delete(follows.filter(id.eq(follow.id))).execute(conn)?;
    Ok(())
}

pub fn followed_author_ids(
    conn: &mut database::Connection,
    viewer: UserId,
) -> Result<HashSet<UserId>, AppError> {
    use database::schema::follows::dsl::*;

    Ok(follows
        .filter(user_id.eq(viewer))
        .select(author_id)
        .load(conn)?
        .into_iter()
        .collect())
}

/// Authors the user follows, in the order the follows were created.
pub fn followed_authors(
    conn: &mut database::Connection,
    current: UserId,
) -> Result<Vec<User>, AppError> {
    ensure_user(conn, current)?;

    let author_ids: Vec<UserId> = {
        use database::schema::follows::dsl::*;

        follows
            .filter(user_id.eq(current))
            .order(id.asc())
            .select(Follow::as_select())
            .load(conn)?
            .into_iter()
            .map(|f: Follow| f.author_id)
            .collect()
    };

    let mut authors: HashMap<UserId, User> = {
        use database::schema::users::dsl::*;

        users
            .filter(id.eq_any(author_ids.clone()))
            .select(User::as_select())
            .load(conn)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    Ok(author_ids
        .into_iter()
        .filter_map(|a| authors.remove(&a))
        .collect())
}

pub fn list_tags(conn: &mut database::Connection) -> Result<Vec<Tag>, AppError> {
    use database::schema::tags::dsl::*;

    Ok(tags.select(Tag::as_select()).order(id.asc()).load(conn)?)
}

pub fn get_tag(conn: &mut database::Connection, tag_id: TagId) -> Result<Tag, AppError> {
    use database::schema::tags::dsl::*;

    tags.select(Tag::as_select())
        .filter(id.eq(tag_id))
        .get_result(conn)
        .optional()?
        .ok_or(AppError::NotFound("tag"))
}

pub fn list_ingredients(
    conn: &mut database::Connection,
    search: Option<&str>,
) -> Result<Vec<Ingredient>, AppError> {
    use database::schema::ingredients::dsl::*;
    use diesel::expression_methods::TextExpressionMethods as _;

    let mut query = ingredients
        .select(Ingredient::as_select())
        .order(name.asc())
        .into_boxed();
    if let Some(term) = search {
        query = query.filter(name.like(format!("%{term}%")));
    }
    Ok(query.load(conn)?)
}

pub fn get_ingredient(
    conn: &mut database::Connection,
    ingredient_id: IngredientId,
) -> Result<Ingredient, AppError> {
    use database::schema::ingredients::dsl::*;

    ingredients
        .select(Ingredient::as_select())
        .filter(id.eq(ingredient_id))
        .get_result(conn)
        .optional()?
        .ok_or(AppError::NotFound("ingredient"))
}

pub struct NewRecipe {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<(IngredientId, i32)>,
    pub tags: Vec<TagId>,
}

#[derive(Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Option<Vec<(IngredientId, i32)>>,
    pub tags: Option<Vec<TagId>>,
}

fn check_recipe_name(new_name: &str) -> Result<(), AppError> {
    if new_name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    Ok(())
}

fn check_cooking_time(minutes: i32) -> Result<(), AppError> {
    if minutes < 1 {
        return Err(AppError::Validation(
            "cooking_time must be at least 1".into(),
        ));
    }
    Ok(())
}

/// One row per (recipe, ingredient): repeated ids are rejected rather than
/// merged.
fn check_ingredient_entries(entries: &[(IngredientId, i32)]) -> Result<(), AppError> {
    if entries.is_empty() {
        return Err(AppError::Validation(
            "at least one ingredient is required".into(),
        ));
    }
    let mut seen = HashSet::new();
    for &(ingredient, entry_amount) in entries {
        if !seen.insert(ingredient) {
            return Err(AppError::Validation("ingredients must not repeat".into()));
        }
        if entry_amount < 1 {
            return Err(AppError::Validation(
                "ingredient amounts must be at least 1".into(),
            ));
        }
    }
    Ok(())
}

fn verify_ingredients_exist(
    conn: &mut database::Connection,
    entries: &[(IngredientId, i32)],
) -> Result<(), AppError> {
    use database::schema::ingredients::dsl::*;

    let requested: Vec<IngredientId> = entries.iter().map(|e| e.0).collect();
    let found: i64 = ingredients
        .filter(id.eq_any(requested.clone()))
        .count()
        .get_result(conn)?;
    if found as usize != requested.len() {
        return Err(AppError::NotFound("ingredient"));
    }
    Ok(())
}

fn verify_tags_exist(conn: &mut database::Connection, tag_ids: &[TagId]) -> Result<(), AppError> {
    use database::schema::tags::dsl::*;

    let found: i64 = tags
        .filter(id.eq_any(tag_ids.to_vec()))
        .count()
        .get_result(conn)?;
    if found as usize != tag_ids.len() {
        return Err(AppError::NotFound("tag"));
    }
    Ok(())
}

fn replace_recipe_ingredients(
    conn: &mut database::Connection,
    recipe: RecipeId,
    entries: &[(IngredientId, i32)],
) -> Result<(), AppError> {
    use database::schema::recipe_ingredients::dsl::*;
    use diesel::{delete, insert_into};

    verify_ingredients_exist(conn, entries)?;

    delete(recipe_ingredients.filter(recipe_id.eq(recipe))).execute(conn)?;
    let rows: Vec<_> = entries
        .iter()
        .map(|&(ingredient, entry_amount)| {
            (
                recipe_id.eq(recipe),
                ingredient_id.eq(ingredient),
                amount.eq(entry_amount),
            )
        })
        .collect();
    insert_into(recipe_ingredients).values(rows).execute(conn)?;
    Ok(())
}

fn replace_recipe_tags(
    conn: &mut database::Connection,
    recipe: RecipeId,
    new_tags: &[TagId],
) -> Result<(), AppError> {
    use database::schema::recipe_tags::dsl::*;
    use diesel::{delete, insert_into};

    let mut seen = HashSet::new();
    let distinct: Vec<TagId> = new_tags
        .iter()
        .copied()
        .filter(|t| seen.insert(*t))
        .collect();
    verify_tags_exist(conn, &distinct)?;

    delete(recipe_tags.filter(recipe_id.eq(recipe))).execute(conn)?;
    let rows: Vec<_> = distinct
        .into_iter()
        .map(|t| (recipe_id.eq(recipe), tag_id.eq(t)))
        .collect();
    insert_into(recipe_tags).values(rows).execute(conn)?;
    Ok(())
}

pub fn create_recipe(
    conn: &mut database::Connection,
    author: UserId,
    new: NewRecipe,
) -> Result<Recipe, AppError> {
    ensure_user(conn, author)?;
    check_recipe_name(&new.name)?;
    check_cooking_time(new.cooking_time)?;
    check_ingredient_entries(&new.ingredients)?;

    conn.transaction::<_, AppError, _>(|conn| {
        let recipe = {
            use database::schema::recipes::dsl::*;
            use diesel::insert_into;

            insert_into(recipes)
                .values((
                    author_id.eq(author),
                    name.eq(&new.name),
                    image.eq(&new.image),
                    text.eq(&new.text),
                    cooking_time.eq(new.cooking_time),
                    pub_date.eq(now()),
                ))
                .returning(Recipe::as_returning())
                .get_result(conn)?
        };

        replace_recipe_ingredients(conn, recipe.id, &new.ingredients)?;
        replace_recipe_tags(conn, recipe.id, &new.tags)?;
        Ok(recipe)
    })
}

fn edit_recipe_name(
    conn: &mut database::Connection,
    recipe: RecipeId,
    new_name: &str,
) -> Result<(), AppError> {
    use database::schema::recipes::dsl::*;
    use diesel::update;

    update(recipes.filter(id.eq(recipe)))
        .set(name.eq(new_name))
        .execute(conn)?;
    Ok(())
}

fn edit_recipe_image(
    conn: &mut database::Connection,
    recipe: RecipeId,
    new_image: &str,
) -> Result<(), AppError> {
    use database::schema::recipes::dsl::*;
    use diesel::update;

    update(recipes.filter(id.eq(recipe)))
        .set(image.eq(new_image))
        .execute(conn)?;
    Ok(())
}

fn edit_recipe_text(
    conn: &mut database::Connection,
    recipe: RecipeId,
    new_text: &str,
) -> Result<(), AppError> {
    use database::schema::recipes::dsl::*;
    use diesel::update;

    update(recipes.filter(id.eq(recipe)))
        .set(text.eq(new_text))
        .execute(conn)?;
    Ok(())
}

fn edit_recipe_cooking_time(
    conn: &mut database::Connection,
    recipe: RecipeId,
    minutes: i32,
) -> Result<(), AppError> {
    use database::schema::recipes::dsl::*;
    use diesel::update;

    update(recipes.filter(id.eq(recipe)))
        .set(cooking_time.eq(minutes))
        .execute(conn)?;
    Ok(())
}

/// The author column never changes after creation; only the author may edit.
pub fn update_recipe(
    conn: &mut database::Connection,
    editor: UserId,
    recipe: RecipeId,
    changes: RecipeChanges,
) -> Result<Recipe, AppError> {
    ensure_user(conn, editor)?;
    let existing = get_recipe(conn, recipe)?;
    if existing.author_id != editor {
        return Err(AppError::PermissionDenied);
    }

    if let Some(new_name) = &changes.name {
        check_recipe_name(new_name)?;
    }
    if let Some(minutes) = changes.cooking_time {
        check_cooking_time(minutes)?;
    }
    if let Some(entries) = &changes.ingredients {
        check_ingredient_entries(entries)?;
    }

    conn.transaction::<_, AppError, _>(|conn| {
        if let Some(new_name) = &changes.name {
            edit_recipe_name(conn, recipe, new_name)?;
        }
        if let Some(new_image) = &changes.image {
            edit_recipe_image(conn, recipe, new_image)?;
        }
        if let Some(new_text) = &changes.text {
            edit_recipe_text(conn, recipe, new_text)?;
        }
        if let Some(minutes) = changes.cooking_time {
            edit_recipe_cooking_time(conn, recipe, minutes)?;
        }
        if let Some(entries) = &changes.ingredients {
            replace_recipe_ingredients(conn, recipe, entries)?;
        }
        if let Some(new_tags) = &changes.tags {
            replace_recipe_tags(conn, recipe, new_tags)?;
        }
        get_recipe(conn, recipe)
    })
}

pub fn delete_recipe(
    conn: &mut database::Connection,
    editor: UserId,
    recipe: RecipeId,
) -> Result<(), AppError> {
    use database::schema::recipes::dsl::*;
    use diesel::delete;

    ensure_user(conn, editor)?;
    let existing = get_recipe(conn, recipe)?;
    if existing.author_id != editor {
        return Err(AppError::PermissionDenied);
    }

    delete(recipes.filter(id.eq(recipe))).execute(conn)?;
    Ok(())
}

pub fn get_recipe(conn: &mut database::Connection, recipe: RecipeId) -> Result<Recipe, AppError> {
    use database::schema::recipes::dsl::*;

    recipes
        .select(Recipe::as_select())
        .filter(id.eq(recipe))
        .get_result(conn)
        .optional()?
        .ok_or(AppError::NotFound("recipe"))
}

pub fn get_recipe_handle(
    conn: &mut database::Connection,
    recipe: RecipeId,
) -> Result<RecipeHandle, AppError> {
    use database::schema::recipes::dsl::*;

    recipes
        .select(RecipeHandle::as_select())
        .filter(id.eq(recipe))
        .get_result(conn)
        .optional()?
        .ok_or(AppError::NotFound("recipe"))
}

pub fn recipe_handles_by_author(
    conn: &mut database::Connection,
    author: UserId,
) -> Result<Vec<RecipeHandle>, AppError> {
    use database::schema::recipes::dsl::*;

    Ok(recipes
        .select(RecipeHandle::as_select())
        .filter(author_id.eq(author))
        .order(pub_date.desc())
        .load(conn)?)
}

#[derive(Default)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    pub tag: Option<String>,
    pub favorited_by: Option<UserId>,
    pub in_shopping_list_of: Option<UserId>,
}

pub fn list_recipes(
    conn: &mut database::Connection,
    filter: &RecipeFilter,
) -> Result<Vec<Recipe>, AppError> {
    let tagged: Option<Vec<RecipeId>> = match &filter.tag {
        Some(slug_value) => {
            let tag = {
                use database::schema::tags::dsl::*;

                tags.select(Tag::as_select())
                    .filter(slug.eq(slug_value))
                    .get_result(conn)
                    .optional()?
            };
            match tag {
                Some(tag) => {
                    use database::schema::recipe_tags::dsl::*;

                    Some(
                        recipe_tags
                            .filter(tag_id.eq(tag.id))
                            .select(recipe_id)
                            .load(conn)?,
                    )
                }
                None => Some(vec![]),
            }
        }
        None => None,
    };

    let favorited: Option<Vec<RecipeId>> = match filter.favorited_by {
        Some(viewer) => Some(favorite_recipe_ids(conn, viewer)?.into_iter().collect()),
        None => None,
    };
    let listed: Option<Vec<RecipeId>> = match filter.in_shopping_list_of {
        Some(viewer) => Some(
            shopping_list_recipe_ids(conn, viewer)?
                .into_iter()
                .collect(),
        ),
        None => None,
    };

    use database::schema::recipes::dsl::*;

    let mut query = recipes
        .select(Recipe::as_select())
        .order(pub_date.desc())
        .into_boxed();
    if let Some(by_author) = filter.author {
        query = query.filter(author_id.eq(by_author));
    }
    if let Some(ids) = tagged {
        query = query.filter(id.eq_any(ids));
    }
    if let Some(ids) = favorited {
        query = query.filter(id.eq_any(ids));
    }
    if let Some(ids) = listed {
        query = query.filter(id.eq_any(ids));
    }
    Ok(query.load(conn)?)
}

/// Ingredient rows for a batch of recipes, keyed by recipe, in row order.
pub fn recipe_ingredient_rows(
    conn: &mut database::Connection,
    recipe_ids: &[RecipeId],
) -> Result<HashMap<RecipeId, Vec<(RecipeIngredient, Ingredient)>>, AppError> {
    use database::schema::recipe_ingredients::dsl::*;

    let rows: Vec<(RecipeIngredient, Ingredient)> = recipe_ingredients
        .inner_join(database::schema::ingredients::table)
        .filter(recipe_id.eq_any(recipe_ids.to_vec()))
        .order(id.asc())
        .select((RecipeIngredient::as_select(), Ingredient::as_select()))
        .load(conn)?;

    let mut map: HashMap<RecipeId, Vec<(RecipeIngredient, Ingredient)>> = HashMap::new();
    for (row, ingredient) in rows {
        map.entry(row.recipe_id).or_default().push((row, ingredient));
    }
    Ok(map)
}

pub fn recipe_tag_rows(
    conn: &mut database::Connection,
    recipe_ids: &[RecipeId],
) -> Result<HashMap<RecipeId, Vec<Tag>>, AppError> {
    use crate::database::models::RecipeTag;
    use database::schema::recipe_tags::dsl::*;

    let rows: Vec<(RecipeTag, Tag)> = recipe_tags
        .inner_join(database::schema::tags::table)
        .filter(recipe_id.eq_any(recipe_ids.to_vec()))
        .order(tag_id.asc())
        .select((RecipeTag::as_select(), Tag::as_select()))
        .load(conn)?;

    let mut map: HashMap<RecipeId, Vec<Tag>> = HashMap::new();
    for (row, tag) in rows {
        map.entry(row.recipe_id).or_default().push(tag);
    }
    Ok(map)
}

pub fn users_by_ids(
    conn: &mut database::Connection,
    ids_wanted: Vec<UserId>,
) -> Result<HashMap<UserId, User>, AppError> {
    use database::schema::users::dsl::*;

    Ok(users
        .filter(id.eq_any(ids_wanted))
        .select(User::as_select())
        .load(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

pub fn add_favorite(
    conn: &mut database::Connection,
    current: UserId,
    recipe: RecipeId,
) -> Result<RecipeHandle, AppError> {
    use database::schema::favorites::dsl::*;
    use diesel::insert_into;

    ensure_user(conn, current)?;
    let handle = get_recipe_handle(conn, recipe)?;

    let count: i64 = favorites
        .filter(user_id.eq(current).and(recipe_id.eq(recipe)))
        .count()
        .get_result(conn)?;
    if count > 0 {
        return Err(AppError::AlreadyExists("favorite"));
    }

    insert_into(favorites)
        .values((
            user_id.eq(current),
            recipe_id.eq(recipe),
            date_added.eq(now()),
        ))
        .execute(conn)?;
    Ok(handle)
}

pub fn remove_favorite(
    conn: &mut database::Connection,
    current: UserId,
    recipe: RecipeId,
) -> Result<(), AppError> {
    use database::schema::favorites::dsl::*;
    use diesel::delete;

    ensure_user(conn, current)?;
    get_recipe_handle(conn, recipe)?;

    let existing: Option<Favorite> = favorites
        .select(Favorite::as_select())
        .filter(user_id.eq(current).and(recipe_id.eq(recipe)))
        .get_result(conn)
        .optional()?;
    let Some(favorite) = existing else {
        return Err(AppError::NotFound("favorite"));
    };
    delete(favorites.filter(id.eq(favorite.id))).execute(conn)?;
    Ok(())
}

pub fn favorite_recipe_ids(
    conn: &mut database::Connection,
    viewer: UserId,
) -> Result<HashSet<RecipeId>, AppError> {
    use database::schema::favorites::dsl::*;

    Ok(favorites
        .filter(user_id.eq(viewer))
        .select(recipe_id)
        .load(conn)?
        .into_iter()
        .collect())
}

pub fn add_to_shopping_list(
    conn: &mut database::Connection,
    current: UserId,
    recipe: RecipeId,
) -> Result<RecipeHandle, AppError> {
    use database::schema::shopping_list::dsl::*;
    use diesel::insert_into;

    ensure_user(conn, current)?;
    let handle = get_recipe_handle(conn, recipe)?;

    let count: i64 = shopping_list
        .filter(user_id.eq(current).and(recipe_id.eq(recipe)))
        .count()
        .get_result(conn)?;
    if count > 0 {
        return Err(AppError::AlreadyExists("shopping-list entry"));
    }

    insert_into(shopping_list)
        .values((
            user_id.eq(current),
            recipe_id.eq(recipe),
            date_added.eq(now()),
        ))
        .execute(conn)?;
    Ok(handle)
}

pub fn remove_from_shopping_list(
    conn: &mut database::Connection,
    current: UserId,
    recipe: RecipeId,
) -> Result<(), AppError> {
    use database::schema::shopping_list::dsl::*;
    use diesel::delete;

    ensure_user(conn, current)?;
    get_recipe_handle(conn, recipe)?;

    let existing: Option<ShoppingListEntry> = shopping_list
        .select(ShoppingListEntry::as_select())
        .filter(user_id.eq(current).and(recipe_id.eq(recipe)))
        .get_result(conn)
        .optional()?;
    let Some(entry) = existing else {
        return Err(AppError::NotFound("shopping-list entry"));
    };
    delete(shopping_list.filter(id.eq(entry.id))).execute(conn)?;
    Ok(())
}

pub fn shopping_list_recipe_ids(
    conn: &mut database::Connection,
    viewer: UserId,
) -> Result<HashSet<RecipeId>, AppError> {
    use database::schema::shopping_list::dsl::*;

    Ok(shopping_list
        .filter(user_id.eq(viewer))
        .select(recipe_id)
        .load(conn)?
        .into_iter()
        .collect())
}

/// Every (name, unit, amount) row reachable through the user's shopping
/// list, in insertion order so the aggregator's first-seen unit is stable.
pub fn shopping_list_ingredient_rows(
    conn: &mut database::Connection,
    current: UserId,
) -> Result<Vec<(String, String, i32)>, AppError> {
    use database::schema::{ingredients, recipe_ingredients, recipes, shopping_list};

    ensure_user(conn, current)?;

    Ok(shopping_list::table
        .inner_join(recipes::table.inner_join(recipe_ingredients::table.inner_join(ingredients::table)))
        .filter(shopping_list::user_id.eq(current))
        .order((shopping_list::id.asc(), recipe_ingredients::id.asc()))
        .select((
            ingredients::name,
            ingredients::measurement_unit,
            recipe_ingredients::amount,
        ))
        .load(conn)?)
}

#[cfg(test)]
fn seed_user(conn: &mut database::Connection, handle: &str) -> User {
    create_user(
        conn,
        NewUser {
            username: handle.into(),
            email: format!("{handle}@example.com"),
            first_name: "Test".into(),
            last_name: "User".into(),
        },
    )
    .unwrap()
}

#[cfg(test)]
fn seed_ingredient(conn: &mut database::Connection, new_name: &str, unit: &str) -> Ingredient {
    use database::schema::ingredients::dsl::*;
    use diesel::insert_into;

    insert_into(ingredients)
        .values((name.eq(new_name), measurement_unit.eq(unit)))
        .returning(Ingredient::as_returning())
        .get_result(conn)
        .unwrap()
}

#[cfg(test)]
fn seed_tag(conn: &mut database::Connection, new_name: &str, new_slug: &str) -> Tag {
    use database::schema::tags::dsl::*;
    use diesel::insert_into;

    insert_into(tags)
        .values((name.eq(new_name), color.eq("#49B64E"), slug.eq(new_slug)))
        .returning(Tag::as_returning())
        .get_result(conn)
        .unwrap()
}

#[cfg(test)]
fn seed_recipe(
    conn: &mut database::Connection,
    author: UserId,
    recipe_name: &str,
    entries: &[(IngredientId, i32)],
) -> Recipe {
    create_recipe(
        conn,
        author,
        NewRecipe {
            name: recipe_name.into(),
            image: format!("recipes/{recipe_name}.png"),
            text: "mix and cook".into(),
            cooking_time: 30,
            ingredients: entries.to_vec(),
            tags: vec![],
        },
    )
    .unwrap()
}

#[cfg(test)]
fn follow_count(conn: &mut database::Connection) -> i64 {
    use database::schema::follows::dsl::*;

    follows.count().get_result(conn).unwrap()
}

#[cfg(test)]
fn favorite_count(conn: &mut database::Connection) -> i64 {
    use database::schema::favorites::dsl::*;

    favorites.count().get_result(conn).unwrap()
}

#[cfg(test)]
fn shopping_list_count(conn: &mut database::Connection) -> i64 {
    use database::schema::shopping_list::dsl::*;

    shopping_list.count().get_result(conn).unwrap()
}

#[cfg(test)]
fn recipe_ingredient_count(conn: &mut database::Connection) -> i64 {
    use database::schema::recipe_ingredients::dsl::*;

    recipe_ingredients.count().get_result(conn).unwrap()
}

#[test]
fn create_user_duplicate_username() {
    let mut conn = database::test_connection();
    seed_user(&mut conn, "alice");

    let result = create_user(
        &mut conn,
        NewUser {
            username: "alice".into(),
            email: "other@example.com".into(),
            first_name: "Other".into(),
            last_name: "Alice".into(),
        },
    );
    assert!(matches!(result, Err(AppError::AlreadyExists("user"))));
}

#[test]
fn follow_twice_conflicts() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let bob = seed_user(&mut conn, "bob");

    let author = follow_author(&mut conn, alice.id, bob.id).unwrap();
    assert_eq!(author.username, "bob");

    let result = follow_author(&mut conn, alice.id, bob.id);
    assert!(matches!(result, Err(AppError::AlreadyExists("subscription"))));
    assert_eq!(follow_count(&mut conn), 1);
}

#[test]
fn unfollow_missing_not_found() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let bob = seed_user(&mut conn, "bob");

    let result = unfollow_author(&mut conn, alice.id, bob.id);
    assert!(matches!(result, Err(AppError::NotFound("subscription"))));
    assert_eq!(follow_count(&mut conn), 0);
}

#[test]
fn self_follow_rejected() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");

    let result = follow_author(&mut conn, alice.id, alice.id);
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(follow_count(&mut conn), 0);
}

#[test]
fn follow_unknown_author_not_found() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");

    let result = follow_author(&mut conn, alice.id, UserId::new(999));
    assert!(matches!(result, Err(AppError::NotFound("user"))));
}

#[test]
fn followed_authors_in_follow_order() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let bob = seed_user(&mut conn, "bob");
    let carol = seed_user(&mut conn, "carol");

    follow_author(&mut conn, alice.id, carol.id).unwrap();
    follow_author(&mut conn, alice.id, bob.id).unwrap();

    let authors = followed_authors(&mut conn, alice.id).unwrap();
    let names: Vec<_> = authors.iter().map(|a| a.username.as_str()).collect();
    assert_eq!(names, vec!["carol", "bob"]);
}

#[test]
fn favorite_twice_conflicts() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let recipe = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200)]);

    let handle = add_favorite(&mut conn, alice.id, recipe.id).unwrap();
    assert_eq!(handle.name, "bread");

    let result = add_favorite(&mut conn, alice.id, recipe.id);
    assert!(matches!(result, Err(AppError::AlreadyExists("favorite"))));
    assert_eq!(favorite_count(&mut conn), 1);
}

#[test]
fn remove_missing_favorite_not_found() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let recipe = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200)]);

    let result = remove_favorite(&mut conn, alice.id, recipe.id);
    assert!(matches!(result, Err(AppError::NotFound("favorite"))));
}

#[test]
fn favorite_unknown_recipe_not_found() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");

    let result = add_favorite(&mut conn, alice.id, RecipeId::new(999));
    assert!(matches!(result, Err(AppError::NotFound("recipe"))));
}

#[test]
fn shopping_list_toggle_roundtrip() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let recipe = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200)]);

    add_to_shopping_list(&mut conn, alice.id, recipe.id).unwrap();
    let result = add_to_shopping_list(&mut conn, alice.id, recipe.id);
    assert!(matches!(
        result,
        Err(AppError::AlreadyExists("shopping-list entry"))
    ));
    assert_eq!(shopping_list_count(&mut conn), 1);

    remove_from_shopping_list(&mut conn, alice.id, recipe.id).unwrap();
    let result = remove_from_shopping_list(&mut conn, alice.id, recipe.id);
    assert!(matches!(
        result,
        Err(AppError::NotFound("shopping-list entry"))
    ));
    assert_eq!(shopping_list_count(&mut conn), 0);
}

#[test]
fn create_recipe_persists_rows() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let salt = seed_ingredient(&mut conn, "salt", "g");
    let dinner = seed_tag(&mut conn, "Dinner", "dinner");

    let recipe = create_recipe(
        &mut conn,
        alice.id,
        NewRecipe {
            name: "bread".into(),
            image: "recipes/bread.png".into(),
            text: "knead and bake".into(),
            cooking_time: 90,
            ingredients: vec![(flour.id, 500), (salt.id, 10)],
            tags: vec![dinner.id],
        },
    )
    .unwrap();
    assert_eq!(recipe.author_id, alice.id);

    let rows = recipe_ingredient_rows(&mut conn, &[recipe.id]).unwrap();
    let entries: Vec<_> = rows[&recipe.id]
        .iter()
        .map(|(row, i)| (i.name.as_str(), row.amount))
        .collect();
    assert_eq!(entries, vec![("flour", 500), ("salt", 10)]);

    let tag_rows = recipe_tag_rows(&mut conn, &[recipe.id]).unwrap();
    assert_eq!(tag_rows[&recipe.id].len(), 1);
    assert_eq!(tag_rows[&recipe.id][0].slug, "dinner");
}

#[test]
fn create_recipe_duplicate_ingredient_rejected() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let flour = seed_ingredient(&mut conn, "flour", "g");

    let result = create_recipe(
        &mut conn,
        alice.id,
        NewRecipe {
            name: "bread".into(),
            image: String::new(),
            text: String::new(),
            cooking_time: 10,
            ingredients: vec![(flour.id, 100), (flour.id, 200)],
            tags: vec![],
        },
    );
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn create_recipe_unknown_ingredient_not_found() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let flour = seed_ingredient(&mut conn, "flour", "g");

    let result = create_recipe(
        &mut conn,
        alice.id,
        NewRecipe {
            name: "bread".into(),
            image: String::new(),
            text: String::new(),
            cooking_time: 10,
            ingredients: vec![(flour.id, 100), (IngredientId::new(999), 5)],
            tags: vec![],
        },
    );
    assert!(matches!(result, Err(AppError::NotFound("ingredient"))));
}

#[test]
fn update_recipe_by_non_author_denied() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let mallory = seed_user(&mut conn, "mallory");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let recipe = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200)]);

    let result = update_recipe(
        &mut conn,
        mallory.id,
        recipe.id,
        RecipeChanges {
            name: Some("stolen bread".into()),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(AppError::PermissionDenied)));
    assert_eq!(get_recipe(&mut conn, recipe.id).unwrap().name, "bread");
}

#[test]
fn update_recipe_replaces_ingredients() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let salt = seed_ingredient(&mut conn, "salt", "g");
    let recipe = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200)]);

    let updated = update_recipe(
        &mut conn,
        alice.id,
        recipe.id,
        RecipeChanges {
            cooking_time: Some(45),
            ingredients: Some(vec![(salt.id, 5)]),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(updated.cooking_time, 45);
    assert_eq!(updated.name, "bread");

    let rows = recipe_ingredient_rows(&mut conn, &[recipe.id]).unwrap();
    let entries: Vec<_> = rows[&recipe.id]
        .iter()
        .map(|(row, i)| (i.name.as_str(), row.amount))
        .collect();
    assert_eq!(entries, vec![("salt", 5)]);
}

#[test]
fn delete_recipe_cascades() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let bob = seed_user(&mut conn, "bob");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let recipe = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200)]);

    add_favorite(&mut conn, bob.id, recipe.id).unwrap();
    add_to_shopping_list(&mut conn, bob.id, recipe.id).unwrap();

    delete_recipe(&mut conn, alice.id, recipe.id).unwrap();

    assert!(matches!(
        get_recipe(&mut conn, recipe.id),
        Err(AppError::NotFound("recipe"))
    ));
    assert_eq!(recipe_ingredient_count(&mut conn), 0);
    assert_eq!(favorite_count(&mut conn), 0);
    assert_eq!(shopping_list_count(&mut conn), 0);
}

#[test]
fn delete_recipe_by_non_author_denied() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let mallory = seed_user(&mut conn, "mallory");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let recipe = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200)]);

    let result = delete_recipe(&mut conn, mallory.id, recipe.id);
    assert!(matches!(result, Err(AppError::PermissionDenied)));
    assert!(get_recipe(&mut conn, recipe.id).is_ok());
}

#[test]
fn list_recipes_filtering() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let bob = seed_user(&mut conn, "bob");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let dinner = seed_tag(&mut conn, "Dinner", "dinner");

    let bread = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200)]);
    let cake = seed_recipe(&mut conn, bob.id, "cake", &[(flour.id, 300)]);
    update_recipe(
        &mut conn,
        bob.id,
        cake.id,
        RecipeChanges {
            tags: Some(vec![dinner.id]),
            ..Default::default()
        },
    )
    .unwrap();
    add_favorite(&mut conn, alice.id, cake.id).unwrap();

    let all = list_recipes(&mut conn, &RecipeFilter::default()).unwrap();
    assert_eq!(all.len(), 2);

    let by_alice = list_recipes(
        &mut conn,
        &RecipeFilter {
            author: Some(alice.id),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_alice.len(), 1);
    assert_eq!(by_alice[0].id, bread.id);

    let tagged = list_recipes(
        &mut conn,
        &RecipeFilter {
            tag: Some("dinner".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, cake.id);

    let unknown_tag = list_recipes(
        &mut conn,
        &RecipeFilter {
            tag: Some("brunch".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(unknown_tag.is_empty());

    let favorited = list_recipes(
        &mut conn,
        &RecipeFilter {
            favorited_by: Some(alice.id),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(favorited.len(), 1);
    assert_eq!(favorited[0].id, cake.id);
}

#[test]
fn ingredient_search_matches_substring() {
    let mut conn = database::test_connection();
    seed_ingredient(&mut conn, "flour", "g");
    seed_ingredient(&mut conn, "salt", "g");
    seed_ingredient(&mut conn, "sunflower oil", "ml");

    let all = list_ingredients(&mut conn, None).unwrap();
    assert_eq!(all.len(), 3);

    let matches = list_ingredients(&mut conn, Some("flower")).unwrap();
    let names: Vec<_> = matches.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["sunflower oil"]);

    let matches = list_ingredients(&mut conn, Some("flo")).unwrap();
    let names: Vec<_> = matches.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["flour", "sunflower oil"]);
}

#[test]
fn shopping_list_rows_cover_all_listed_recipes() {
    let mut conn = database::test_connection();
    let alice = seed_user(&mut conn, "alice");
    let flour = seed_ingredient(&mut conn, "flour", "g");
    let salt = seed_ingredient(&mut conn, "salt", "g");
    let bread = seed_recipe(&mut conn, alice.id, "bread", &[(flour.id, 200), (salt.id, 5)]);
    let cake = seed_recipe(&mut conn, alice.id, "cake", &[(flour.id, 100)]);

    add_to_shopping_list(&mut conn, alice.id, bread.id).unwrap();
    add_to_shopping_list(&mut conn, alice.id, cake.id).unwrap();

    let rows = shopping_list_ingredient_rows(&mut conn, alice.id).unwrap();
    assert_eq!(
        rows,
        vec![
            ("flour".to_string(), "g".to_string(), 200),
            ("salt".to_string(), "g".to_string(), 5),
            ("flour".to_string(), "g".to_string(), 100),
        ]
    );
}
