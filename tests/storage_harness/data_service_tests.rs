//! Macro-generated test suite for the `DataService<T>` contract.
//!
//! # Generated Tests
//!
//! - `test_create_and_get` — create then retrieve
//! - `test_get_nonexistent` — unknown id returns None
//! - `test_list_newest_first` — list ordering
//! - `test_update_existing` / `test_update_nonexistent`
//! - `test_delete_is_idempotent`
//! - `test_search_string_and_bool` — camelCase fields, scalar rendering
//! - `test_unique_email` — duplicate customer email is a conflict

/// Generate a `DataService` conformance suite.
///
/// `$factory` must evaluate to a backend implementing `DataService` for every
/// document type. It is re-evaluated for each test to ensure isolation.
#[macro_export]
macro_rules! data_service_tests {
    ($factory:expr) => {
        mod data_service_contract_tests {
            use super::*;
            use storefront::core::error::ShopError;
            use storefront::core::service::DataService;
            use storefront::entities::{Product, User};
            use uuid::Uuid;

            #[tokio::test]
            async fn test_create_and_get() {
                let service = $factory;
                let lamp = product("Lamp", 19.99, 4, "Lighting");

                let created = DataService::<Product>::create(&service, lamp.clone())
                    .await
                    .unwrap();
                assert_eq!(created.id, lamp.id);

                let fetched = DataService::<Product>::get(&service, &lamp.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(fetched.name, "Lamp");
                assert_eq!(fetched.price, 19.99);
                assert_eq!(fetched.stock, 4);
                assert_eq!(fetched.sku, lamp.sku);
            }

            #[tokio::test]
            async fn test_get_nonexistent() {
                let service = $factory;
                let found = DataService::<Product>::get(&service, &Uuid::new_v4())
                    .await
                    .unwrap();
                assert!(found.is_none());
            }

            #[tokio::test]
            async fn test_list_newest_first() {
                let service = $factory;
                let mut older = product("Older", 1.0, 1, "Misc");
                older.created_at = older.created_at - chrono::Duration::hours(1);
                let newer = product("Newer", 1.0, 1, "Misc");

                DataService::<Product>::create(&service, older).await.unwrap();
                DataService::<Product>::create(&service, newer).await.unwrap();

                let all = DataService::<Product>::list(&service).await.unwrap();
                let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, ["Newer", "Older"]);
            }

            #[tokio::test]
            async fn test_update_existing() {
                let service = $factory;
                let mut lamp = product("Lamp", 10.0, 4, "Lighting");
                DataService::<Product>::create(&service, lamp.clone())
                    .await
                    .unwrap();

                lamp.price = 12.5;
                DataService::<Product>::update(&service, &lamp.id.clone(), lamp.clone())
                    .await
                    .unwrap();

                let fetched = DataService::<Product>::get(&service, &lamp.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(fetched.price, 12.5);
            }

            #[tokio::test]
            async fn test_update_nonexistent() {
                let service = $factory;
                let lamp = product("Lamp", 10.0, 4, "Lighting");
                let err = DataService::<Product>::update(&service, &lamp.id.clone(), lamp)
                    .await
                    .unwrap_err();
                assert!(matches!(ShopError::from(err), ShopError::NotFound { .. }));
            }

            #[tokio::test]
            async fn test_delete_is_idempotent() {
                let service = $factory;
                let lamp = product("Lamp", 10.0, 4, "Lighting");
                DataService::<Product>::create(&service, lamp.clone())
                    .await
                    .unwrap();

                DataService::<Product>::delete(&service, &lamp.id).await.unwrap();
                DataService::<Product>::delete(&service, &lamp.id).await.unwrap();
                assert!(
                    DataService::<Product>::get(&service, &lamp.id)
                        .await
                        .unwrap()
                        .is_none()
                );
            }

            #[tokio::test]
            async fn test_search_string_and_bool() {
                let service = $factory;
                let a = product("A", 1.0, 1, "Lighting");
                let mut b = product("B", 1.0, 1, "Garden");
                b.is_active = false;
                DataService::<Product>::create(&service, a).await.unwrap();
                DataService::<Product>::create(&service, b).await.unwrap();

                let lighting = DataService::<Product>::search(&service, "category", "Lighting")
                    .await
                    .unwrap();
                assert_eq!(lighting.len(), 1);
                assert_eq!(lighting[0].name, "A");

                let inactive = DataService::<Product>::search(&service, "isActive", "false")
                    .await
                    .unwrap();
                assert_eq!(inactive.len(), 1);
                assert_eq!(inactive[0].name, "B");

                let none = DataService::<Product>::search(&service, "category", "Nowhere")
                    .await
                    .unwrap();
                assert!(none.is_empty());
            }

            #[tokio::test]
            async fn test_unique_email() {
                let service = $factory;
                DataService::<User>::create(&service, user("Ann")).await.unwrap();

                let err = DataService::<User>::create(&service, user("Ann"))
                    .await
                    .unwrap_err();
                assert!(matches!(ShopError::from(err), ShopError::Conflict(_)));
            }
        }
    };
}
