// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::Ingredient;
use crate::Result;
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct IngredientSeed {
    name: String,
    measurement_unit: String,
}

fn import_ingredient(conn: &mut database::Connection, seed: IngredientSeed) -> Result<bool> {
    use database::schema::ingredients::dsl::*;

    let seed_name = seed.name.to_lowercase();
    let existing = ingredients
        .select(Ingredient::as_select())
        .filter(name.eq(&seed_name))
        .get_result(conn)
        .optional()?;
    if existing.is_some() {
        return Ok(false);
    }

    diesel::insert_into(ingredients)
        .values((
            name.eq(&seed_name),
            measurement_unit.eq(&seed.measurement_unit),
        ))
        .execute(conn)?;
    Ok(true)
}

pub fn import_ingredients(conn: &mut database::Connection, path: impl AsRef<Path>) -> Result<()> {
    let file = std::fs::File::open(path)?;
    let seeds: Vec<IngredientSeed> = serde_json::from_reader(file)?;

    let total = seeds.len();
    let mut num_imported = 0;
    for seed in seeds {
        if import_ingredient(conn, seed)? {
            num_imported += 1;
        }
    }
    println!("imported {num_imported} of {total} ingredients");
    Ok(())
}

#[test]
fn import_skips_existing_names() {
    let mut conn = database::test_connection();

    let seeds = r#"[
        {"name": "Flour", "measurement_unit": "g"},
        {"name": "flour", "measurement_unit": "g"},
        {"name": "salt", "measurement_unit": "g"}
    ]"#;
    let path = std::env::temp_dir().join("foodgram-ingredient-seeds.json");
    std::fs::write(&path, seeds).unwrap();

    import_ingredients(&mut conn, &path).unwrap();
    import_ingredients(&mut conn, &path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let names: Vec<String> = {
        use database::schema::ingredients::dsl::*;

        ingredients
            .select(name)
            .order(name.asc())
            .load(&mut conn)
            .unwrap()
    };
    assert_eq!(names, vec!["flour", "salt"]);
}
