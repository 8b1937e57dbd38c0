//! Macro-generated test suite for the `CommerceService` contract.
//!
//! Every backend must keep multi-document operations atomic: a failed call
//! leaves every document it touched unchanged.

/// Generate a `CommerceService` conformance suite.
///
/// `$factory` must evaluate to a fresh backend implementing `CommerceService`
/// and `DataService` for every document type.
#[macro_export]
macro_rules! commerce_service_tests {
    ($factory:expr) => {
        mod commerce_contract_tests {
            use super::*;
            use futures::future::join_all;
            use storefront::core::error::ShopError;
            use storefront::core::service::{CommerceService, DataService};
            use storefront::entities::{
                Category, Order, OrderStatus, PaymentStatus, Product, ProductPatch, Review,
                StatusChange, StatusUpdate,
            };
            use uuid::Uuid;

            async fn seeded<S: DataService<Product>>(service: &S, stock: i64) -> Product {
                let lamp = product("Lamp", 40.0, stock, "Lighting");
                DataService::<Product>::create(service, lamp).await.unwrap()
            }

            async fn stock_of<S: DataService<Product>>(service: &S, id: &Uuid) -> i64 {
                DataService::<Product>::get(service, id)
                    .await
                    .unwrap()
                    .unwrap()
                    .stock
            }

            #[tokio::test]
            async fn test_place_order_prices_and_decrements_stock() {
                let service = $factory;
                let lamp = seeded(&service, 5).await;
                let customer = Uuid::new_v4();

                let order = service
                    .place_order(draft(customer, &[(lamp.id, 2)]), pricing())
                    .await
                    .unwrap();

                assert_eq!(order.user_id, customer);
                assert_eq!(order.order_items.len(), 1);
                assert_eq!(order.order_items[0].name, "Lamp");
                assert_eq!(order.items_price, 80.0);
                assert_eq!(order.shipping_price, 10.0);
                assert_eq!(order.tax_price, 12.0);
                assert_eq!(order.total_price, 102.0);
                assert_eq!(order.order_status, OrderStatus::Pending);
                assert_eq!(stock_of(&service, &lamp.id).await, 3);

                let stored = DataService::<Order>::get(&service, &order.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(stored.total_price, 102.0);
            }

            #[tokio::test]
            async fn test_failed_order_leaves_state_unchanged() {
                let service = $factory;
                let plenty = seeded(&service, 10).await;
                let scarce = seeded(&service, 1).await;

                let err = service
                    .place_order(
                        draft(Uuid::new_v4(), &[(plenty.id, 3), (scarce.id, 2)]),
                        pricing(),
                    )
                    .await
                    .unwrap_err();

                assert!(matches!(err, ShopError::Rule { .. }));
                assert_eq!(stock_of(&service, &plenty.id).await, 10);
                assert_eq!(stock_of(&service, &scarce.id).await, 1);
                assert!(DataService::<Order>::list(&service).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_unknown_product_is_rejected() {
                let service = $factory;
                let err = service
                    .place_order(draft(Uuid::new_v4(), &[(Uuid::new_v4(), 1)]), pricing())
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::Rule { .. }));
                assert!(DataService::<Order>::list(&service).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_oversized_quantities_are_rejected() {
                let service = $factory;
                let lamp = seeded(&service, 3).await;

                let err = service
                    .place_order(
                        draft(Uuid::new_v4(), &[(lamp.id, i64::MAX), (lamp.id, i64::MAX)]),
                        pricing(),
                    )
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::Validation { .. }));
                assert_eq!(stock_of(&service, &lamp.id).await, 3);

                service
                    .place_order(draft(Uuid::new_v4(), &[(lamp.id, 1)]), pricing())
                    .await
                    .unwrap();
                assert_eq!(stock_of(&service, &lamp.id).await, 2);
            }

            #[tokio::test]
            async fn test_last_item_sells_once() {
                let service = $factory;
                let lamp = seeded(&service, 1).await;

                let attempts = (0..5).map(|_| {
                    service.place_order(draft(Uuid::new_v4(), &[(lamp.id, 1)]), pricing())
                });
                let results = join_all(attempts).await;

                let placed = results.iter().filter(|r| r.is_ok()).count();
                assert_eq!(placed, 1);
                for err in results.into_iter().filter_map(|r| r.err()) {
                    assert!(matches!(err, ShopError::Rule { .. } | ShopError::Conflict(_)));
                }
                assert_eq!(stock_of(&service, &lamp.id).await, 0);
                assert_eq!(DataService::<Order>::list(&service).await.unwrap().len(), 1);
            }

            #[tokio::test]
            async fn test_cancel_restores_stock_once() {
                let service = $factory;
                let lamp = seeded(&service, 4).await;
                let customer = Uuid::new_v4();
                let order = service
                    .place_order(draft(customer, &[(lamp.id, 3)]), pricing())
                    .await
                    .unwrap();
                assert_eq!(stock_of(&service, &lamp.id).await, 1);

                let cancelled = service
                    .change_order_status(&order.id, StatusChange::customer_cancel(customer))
                    .await
                    .unwrap();
                assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
                assert!(cancelled.cancelled_at.is_some());
                assert_eq!(stock_of(&service, &lamp.id).await, 4);

                let again = StatusChange::admin(StatusUpdate {
                    order_status: Some(OrderStatus::Cancelled),
                    payment_status: None,
                });
                service.change_order_status(&order.id, again).await.unwrap();
                assert_eq!(stock_of(&service, &lamp.id).await, 4);
            }

            #[tokio::test]
            async fn test_customer_cannot_cancel_shipped_order() {
                let service = $factory;
                let lamp = seeded(&service, 4).await;
                let customer = Uuid::new_v4();
                let order = service
                    .place_order(draft(customer, &[(lamp.id, 1)]), pricing())
                    .await
                    .unwrap();

                let ship = StatusChange::admin(StatusUpdate {
                    order_status: Some(OrderStatus::Shipped),
                    payment_status: Some(PaymentStatus::Completed),
                });
                let shipped = service.change_order_status(&order.id, ship).await.unwrap();
                assert!(shipped.is_paid);

                let err = service
                    .change_order_status(&order.id, StatusChange::customer_cancel(customer))
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::Rule { .. }));
                assert_eq!(stock_of(&service, &lamp.id).await, 3);
            }

            #[tokio::test]
            async fn test_status_change_on_missing_order() {
                let service = $factory;
                let err = service
                    .change_order_status(
                        &Uuid::new_v4(),
                        StatusChange::customer_cancel(Uuid::new_v4()),
                    )
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::NotFound { .. }));
            }

            #[tokio::test]
            async fn test_rename_category_moves_products() {
                let service = $factory;
                let lighting = DataService::<Category>::create(&service, category("Lighting"))
                    .await
                    .unwrap();
                let lamp = seeded(&service, 1).await;
                let chair = DataService::<Product>::create(
                    &service,
                    product("Chair", 80.0, 1, "Furniture"),
                )
                .await
                .unwrap();

                let mut renamed = lighting.clone();
                renamed.rename("Lamps");
                let saved = service.update_category(&lighting.id, renamed).await.unwrap();
                assert_eq!(saved.slug, "lamps");

                let lamp = DataService::<Product>::get(&service, &lamp.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(lamp.category, "Lamps");
                let chair = DataService::<Product>::get(&service, &chair.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(chair.category, "Furniture");
            }

            #[tokio::test]
            async fn test_rename_into_taken_name_conflicts() {
                let service = $factory;
                DataService::<Category>::create(&service, category("Garden"))
                    .await
                    .unwrap();
                let lighting = DataService::<Category>::create(&service, category("Lighting"))
                    .await
                    .unwrap();
                let lamp = seeded(&service, 1).await;

                let mut clash = lighting.clone();
                clash.rename("garden");
                let err = service
                    .update_category(&lighting.id, clash)
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::Conflict(_)));

                let lamp = DataService::<Product>::get(&service, &lamp.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(lamp.category, "Lighting");
            }

            #[tokio::test]
            async fn test_delete_category_in_use_is_refused() {
                let service = $factory;
                let used = DataService::<Category>::create(&service, category("Lighting"))
                    .await
                    .unwrap();
                let unused = DataService::<Category>::create(&service, category("Garden"))
                    .await
                    .unwrap();
                seeded(&service, 1).await;

                let err = service.delete_category(&used.id).await.unwrap_err();
                assert!(matches!(err, ShopError::Rule { .. }));
                assert!(
                    DataService::<Category>::get(&service, &used.id)
                        .await
                        .unwrap()
                        .is_some()
                );

                service.delete_category(&unused.id).await.unwrap();
                assert!(
                    DataService::<Category>::get(&service, &unused.id)
                        .await
                        .unwrap()
                        .is_none()
                );
            }

            #[tokio::test]
            async fn test_reviews_update_rating() {
                let service = $factory;
                let lamp = seeded(&service, 1).await;
                let ann = Uuid::new_v4();

                service
                    .add_review(&lamp.id, Review::new(ann, "Ann".into(), 5, "Bright".into()))
                    .await
                    .unwrap();
                let reviewed = service
                    .add_review(
                        &lamp.id,
                        Review::new(Uuid::new_v4(), "Bob".into(), 4, "Good".into()),
                    )
                    .await
                    .unwrap();
                assert_eq!(reviewed.review_count, 2);
                assert_eq!(reviewed.rating, 4.5);

                let err = service
                    .add_review(&lamp.id, Review::new(ann, "Ann".into(), 1, "Again".into()))
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::Rule { .. }));

                let stored = DataService::<Product>::get(&service, &lamp.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(stored.review_count, 2);
            }

            #[tokio::test]
            async fn test_product_patch_keeps_concurrent_stock_and_reviews() {
                let service = $factory;
                let lamp = seeded(&service, 1).await;
                let stale = DataService::<Product>::get(&service, &lamp.id)
                    .await
                    .unwrap()
                    .unwrap();

                service
                    .place_order(draft(Uuid::new_v4(), &[(lamp.id, 1)]), pricing())
                    .await
                    .unwrap();
                service
                    .add_review(
                        &lamp.id,
                        Review::new(Uuid::new_v4(), "Ann".into(), 4, "Fine".into()),
                    )
                    .await
                    .unwrap();

                let patch = ProductPatch {
                    price: Some(stale.price + 5.0),
                    ..ProductPatch::default()
                };
                let updated = service.update_product(&lamp.id, patch).await.unwrap();
                assert_eq!(updated.price, 45.0);
                assert_eq!(updated.stock, 0);
                assert_eq!(updated.review_count, 1);

                let stored = DataService::<Product>::get(&service, &lamp.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(stored.price, 45.0);
                assert_eq!(stored.stock, 0);
                assert_eq!(stored.rating, 4.0);

                let err = service
                    .place_order(draft(Uuid::new_v4(), &[(lamp.id, 1)]), pricing())
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::Rule { .. }));
                assert_eq!(DataService::<Order>::list(&service).await.unwrap().len(), 1);
            }

            #[tokio::test]
            async fn test_product_patch_on_missing_product() {
                let service = $factory;
                let err = service
                    .update_product(&Uuid::new_v4(), ProductPatch::default())
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::NotFound { .. }));
            }

            #[tokio::test]
            async fn test_review_of_missing_product() {
                let service = $factory;
                let err = service
                    .add_review(
                        &Uuid::new_v4(),
                        Review::new(Uuid::new_v4(), "Ann".into(), 5, "Ghost".into()),
                    )
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::NotFound { .. }));
            }
        }
    };
}
