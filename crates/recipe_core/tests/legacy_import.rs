use recipe_core::cache::memory::MemoryCacheBackend;
use recipe_core::config::CacheTtls;
use recipe_core::db::open_db_in_memory;
use recipe_core::model::recipe::{LegacyRawColumns, RecipeFields};
use recipe_core::repo::recipe_repo::SqliteRecipeRepository;
use recipe_core::{CacheLayer, CacheStore, RecipeService};
use std::sync::Arc;

fn kimchi_stew_raw() -> LegacyRawColumns {
    LegacyRawColumns {
        instructions_raw: Some(r"['Boil water.\n', 'Add   kimchi and tofu']".to_string()),
        ingredients_raw: Some(r#"{"['kimchi || 200g', 'tofu || 1 block', '||']"}"#.to_string()),
        hashtags_raw: Some(r#"{"spicy","stew"}"#.to_string()),
    }
}

#[test]
fn imported_row_reads_back_from_legacy_columns() {
    let mut conn = open_db_in_memory().unwrap();
    let backend = Arc::new(MemoryCacheBackend::new());
    let cache = CacheLayer::new(CacheStore::new(backend.clone()), CacheTtls::default());
    let mut service =
        RecipeService::new(SqliteRecipeRepository::try_new(&mut conn).unwrap(), cache);

    let imported = service
        .import_legacy_recipe(&RecipeFields::new("Kimchi stew", "w-9"), &kimchi_stew_raw())
        .unwrap();

    let steps: Vec<(u32, &str)> = imported
        .steps
        .iter()
        .map(|step| (step.step_index, step.description.as_str()))
        .collect();
    assert_eq!(steps, vec![(1, "Boil water."), (2, "Add kimchi and tofu")]);
    let ingredients: Vec<(Option<i64>, Option<&str>)> = imported
        .ingredients
        .iter()
        .map(|item| (item.ingredient_id, item.ingredient_name.as_deref()))
        .collect();
    assert_eq!(
        ingredients,
        vec![(None, Some("kimchi")), (None, Some("tofu"))]
    );
    let tags: Vec<Option<&str>> = imported.tags.iter().map(|tag| tag.name.as_deref()).collect();
    assert_eq!(tags, vec![Some("spicy"), Some("stew")]);

    assert_eq!(service.get_recipe(imported.id).unwrap(), imported);
    assert!(backend.contains(&format!("recipe:{}", imported.id)));
}

#[test]
fn normalization_promotes_legacy_values_to_child_rows() {
    let mut conn = open_db_in_memory().unwrap();
    let backend = Arc::new(MemoryCacheBackend::new());
    let cache = CacheLayer::new(CacheStore::new(backend.clone()), CacheTtls::default());
    let id = {
        let mut service =
            RecipeService::new(SqliteRecipeRepository::try_new(&mut conn).unwrap(), cache.clone());
        let id = service
            .import_legacy_recipe(&RecipeFields::new("Kimchi stew", "w-9"), &kimchi_stew_raw())
            .unwrap()
            .id;
        service.get_recipe(id).unwrap();

        let normalized = service.normalize_legacy_recipe(id).unwrap();
        assert!(!backend.contains(&format!("recipe:{id}")));
        assert_eq!(normalized.steps.len(), 2);
        assert_eq!(normalized.steps[1].description, "Add kimchi and tofu");
        assert!(normalized
            .ingredients
            .iter()
            .all(|item| item.ingredient_id.is_some()));
        let names: Vec<Option<&str>> = normalized
            .ingredients
            .iter()
            .map(|item| item.ingredient_name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("kimchi"), Some("tofu")]);
        assert!(normalized.tags.iter().all(|tag| tag.tag_id.is_some()));

        assert_eq!(service.get_recipe(id).unwrap(), normalized);
        id
    };

    let raw_left: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM recipes
             WHERE id = ?1
               AND (instructions_raw IS NOT NULL
                    OR ingredients_raw IS NOT NULL
                    OR hashtags_raw IS NOT NULL);",
            [id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(raw_left, 0);
    let steps: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM recipe_step WHERE recipe_id = ?1;",
            [id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(steps, 2);
}

#[test]
fn unparseable_legacy_values_degrade_to_empty_collections() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = RecipeService::new(
        SqliteRecipeRepository::try_new(&mut conn).unwrap(),
        CacheLayer::in_memory(),
    );

    let raw = LegacyRawColumns {
        instructions_raw: None,
        ingredients_raw: Some("just some words".to_string()),
        hashtags_raw: Some("   ".to_string()),
    };
    let view = service
        .import_legacy_recipe(&RecipeFields::new("Plain", "w-1"), &raw)
        .unwrap();

    assert!(view.steps.is_empty());
    assert!(view.ingredients.is_empty());
    assert!(view.tags.is_empty());
}
