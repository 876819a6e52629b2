use recipe_core::cache::backend::CacheBackend;
use recipe_core::cache::memory::MemoryCacheBackend;
use recipe_core::config::CacheTtls;
use recipe_core::db::open_db_in_memory;
use recipe_core::model::board_post::BoardPostInput;
use recipe_core::model::dictionary::IngredientInput;
use recipe_core::model::user::UserInput;
use recipe_core::repo::board_repo::SqliteBoardPostRepository;
use recipe_core::repo::ingredient_repo::SqliteIngredientRepository;
use recipe_core::repo::user_repo::SqliteUserRepository;
use recipe_core::{
    BoardPostService, CacheLayer, CacheStore, IngredientService, Page, ServiceError, UserService,
};
use std::sync::Arc;

fn memory_layer() -> (Arc<MemoryCacheBackend>, CacheLayer) {
    let backend = Arc::new(MemoryCacheBackend::new());
    let layer = CacheLayer::new(CacheStore::new(backend.clone()), CacheTtls::default());
    (backend, layer)
}

fn priced(name: &str, category: &str, price_cents: i64, in_stock: bool) -> IngredientInput {
    let mut input = IngredientInput::named(name);
    input.category = Some(category.to_string());
    input.price_cents = Some(price_cents);
    input.in_stock = in_stock;
    input
}

#[test]
fn ingredient_catalog_queries_and_eviction() {
    let conn = open_db_in_memory().unwrap();
    let (backend, cache) = memory_layer();
    let service =
        IngredientService::new(SqliteIngredientRepository::try_new(&conn).unwrap(), cache);

    let onion = service
        .create_ingredient(&priced("onion", "veg", 120, true))
        .unwrap();
    service
        .create_ingredient(&priced("saffron", "spice", 9_900, false))
        .unwrap();
    service
        .create_ingredient(&priced("carrot", "Veg", 80, true))
        .unwrap();

    let all: Vec<String> = service
        .list_ingredients()
        .unwrap()
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(all, vec!["carrot", "onion", "saffron"]);
    assert!(backend.contains("ingredient:list"));

    assert_eq!(service.list_ingredients_by_category("VEG").unwrap().len(), 2);
    assert_eq!(service.list_in_stock_ingredients().unwrap().len(), 2);
    assert_eq!(service.count_in_stock().unwrap(), 2);
    let cheap = service.list_ingredients_by_price_range(50, 150).unwrap();
    assert_eq!(cheap.len(), 2);
    assert!(matches!(
        service.list_ingredients_by_price_range(200, 100),
        Err(ServiceError::Validation(_))
    ));
    assert_eq!(service.search_ingredients("ARR").unwrap().len(), 1);

    assert_eq!(service.get_ingredient(onion.id).unwrap().name, "onion");
    let mut renamed = priced("red onion", "veg", 150, true);
    renamed.unit = Some("piece".to_string());
    let updated = service.update_ingredient(onion.id, &renamed).unwrap();
    assert_eq!(updated.unit.as_deref(), Some("piece"));
    assert!(!backend.contains("ingredient:list"));
    assert_eq!(service.get_ingredient(onion.id).unwrap().name, "red onion");

    service.delete_ingredient(onion.id).unwrap();
    assert!(service.get_ingredient(onion.id).unwrap_err().is_not_found());
    assert!(service.delete_ingredient(onion.id).unwrap_err().is_not_found());
}

#[test]
fn duplicate_ingredient_name_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let (_backend, cache) = memory_layer();
    let service =
        IngredientService::new(SqliteIngredientRepository::try_new(&conn).unwrap(), cache);

    service.create_ingredient(&IngredientInput::named("garlic")).unwrap();
    match service.create_ingredient(&IngredientInput::named(" garlic ")) {
        Err(ServiceError::Conflict { entity, field, value }) => {
            assert_eq!(entity, "ingredient");
            assert_eq!(field, "name");
            assert_eq!(value, "garlic");
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let mut negative = IngredientInput::named("salt");
    negative.price_cents = Some(-1);
    assert!(matches!(
        service.create_ingredient(&negative),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn user_registration_lookup_and_rename() {
    let conn = open_db_in_memory().unwrap();
    let (backend, cache) = memory_layer();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap(), cache);

    let kim = service
        .register_user(&UserInput::new("kim", "kim@example.com"))
        .unwrap();
    let mut corp = UserInput::new("acme", "ops@acme.example");
    corp.is_corporate = true;
    service.register_user(&corp).unwrap();

    assert!(service.exists_by_username("kim").unwrap());
    assert!(service.exists_by_email("ops@acme.example").unwrap());
    assert_eq!(service.list_users().unwrap().len(), 2);
    let corporate = service.list_corporate_users().unwrap();
    assert_eq!(corporate.len(), 1);
    assert_eq!(corporate[0].username, "acme");

    assert_eq!(service.get_user_by_username("kim").unwrap().id, kim.id);
    assert_eq!(service.get_user(kim.id).unwrap().email, "kim@example.com");
    assert!(backend.contains("user:username:kim"));
    assert!(backend.contains(&format!("user:{}", kim.id)));

    let renamed = service
        .update_user(kim.id, &UserInput::new("kim2", "kim@example.com"))
        .unwrap();
    assert_eq!(renamed.username, "kim2");
    assert!(!backend.contains("user:username:kim"));
    assert!(!backend.contains(&format!("user:{}", kim.id)));
    assert!(!backend.contains("user:list"));
    assert!(service.get_user_by_username("kim").unwrap_err().is_not_found());
    assert_eq!(service.get_user_by_username("kim2").unwrap().id, kim.id);

    service.delete_user(kim.id).unwrap();
    assert!(!backend.contains("user:username:kim2"));
    assert!(service.get_user(kim.id).unwrap_err().is_not_found());
}

#[test]
fn user_conflicts_name_the_taken_field() {
    let conn = open_db_in_memory().unwrap();
    let (_backend, cache) = memory_layer();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap(), cache);
    service
        .register_user(&UserInput::new("lee", "lee@example.com"))
        .unwrap();
    let other = service
        .register_user(&UserInput::new("park", "park@example.com"))
        .unwrap();

    let taken_name = service
        .register_user(&UserInput::new("lee", "new@example.com"))
        .unwrap_err();
    assert!(matches!(
        taken_name,
        ServiceError::Conflict { field: "username", .. }
    ));
    let taken_email = service
        .register_user(&UserInput::new("choi", "lee@example.com"))
        .unwrap_err();
    assert!(matches!(
        taken_email,
        ServiceError::Conflict { field: "email", .. }
    ));
    let update_clash = service
        .update_user(other.id, &UserInput::new("park", "lee@example.com"))
        .unwrap_err();
    assert!(matches!(
        update_clash,
        ServiceError::Conflict { field: "email", .. }
    ));
    assert!(matches!(
        service.register_user(&UserInput::new("choi", "not-an-email")),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn board_posts_pin_first_and_count_views() {
    let conn = open_db_in_memory().unwrap();
    let (backend, cache) = memory_layer();
    let service =
        BoardPostService::new(SqliteBoardPostRepository::try_new(&conn).unwrap(), cache);

    let first = service
        .create_post(&BoardPostInput::new("Hello", "first post", 1))
        .unwrap();
    let mut notice = BoardPostInput::new("Notice", "read me", 2);
    notice.is_pinned = true;
    notice.original_language = Some("en".to_string());
    let pinned = service.create_post(&notice).unwrap();
    service
        .create_post(&BoardPostInput::new("Tips", "knife skills", 1))
        .unwrap();

    assert_eq!(first.original_language, "ko");
    assert_eq!(pinned.original_language, "en");

    let listed = service.list_posts().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].id, pinned.id);
    assert_eq!(service.list_pinned_posts().unwrap().len(), 1);
    assert_eq!(service.list_posts_by_author(1).unwrap().len(), 2);
    assert_eq!(service.count_posts_by_author(1).unwrap(), 2);
    assert_eq!(service.list_posts_page(Page::new(2, 0)).unwrap().len(), 2);
    assert_eq!(service.search_posts("KNIFE").unwrap().len(), 1);

    assert_eq!(service.get_post(first.id).unwrap().view_count, 0);
    service.get_post(first.id).unwrap();
    backend.delete(&format!("board_post:{}", first.id)).unwrap();
    assert_eq!(service.get_post(first.id).unwrap().view_count, 0);
    assert!(backend.contains("board_post:list"));
    service.record_view(first.id).unwrap();
    service.record_view(first.id).unwrap();
    assert!(!backend.contains(&format!("board_post:{}", first.id)));
    assert!(backend.contains("board_post:list"));
    assert_eq!(service.get_post(first.id).unwrap().view_count, 2);
    assert!(service.record_view(999).unwrap_err().is_not_found());

    let mut edited = BoardPostInput::new("Hello again", "edited", 1);
    edited.is_pinned = true;
    let updated = service.update_post(first.id, &edited).unwrap();
    assert_eq!(updated.title, "Hello again");
    assert_eq!(updated.view_count, 2);
    assert!(!backend.contains("board_post:list"));
    assert_eq!(service.list_pinned_posts().unwrap().len(), 2);

    service.delete_post(first.id).unwrap();
    assert!(service.get_post(first.id).unwrap_err().is_not_found());
    assert_eq!(service.list_posts().unwrap().len(), 2);
}
