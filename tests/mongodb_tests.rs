//! Integration tests for the MongoDB backend using the storage test harness.
//!
//! # Requirements
//!
//! - Docker must be running (testcontainers launches a MongoDB container)
//! - Feature flag `mongodb_backend` must be enabled
//!
//! # Running
//!
//! ```sh
//! cargo test --features mongodb_backend --test mongodb_tests
//! ```
//!
//! # Test isolation
//!
//! All tests share a single replica-set container (via `OnceLock`);
//! multi-document transactions need a replica set. Each test gets its own
//! database.

#![cfg(feature = "mongodb_backend")]

#[macro_use]
mod storage_harness;

use mongodb::Client;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use storage_harness::*;
use storefront::storage::MongoStore;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mongo::Mongo;

/// Holds the testcontainer handle (keeps it alive) and the connection URL.
struct MongoTestEnv {
    _container: testcontainers::ContainerAsync<Mongo>,
    connection_url: String,
}

static TEST_ENV: OnceLock<MongoTestEnv> = OnceLock::new();

async fn init_mongo_env() -> &'static MongoTestEnv {
    if let Some(env) = TEST_ENV.get() {
        return env;
    }

    let container = Mongo::repl_set()
        .start()
        .await
        .expect("Failed to start MongoDB container, is Docker running?");

    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(27017).await.unwrap();
    let url = format!("mongodb://{}:{}/?directConnection=true", host, port);

    let env = MongoTestEnv {
        _container: container,
        connection_url: url,
    };

    let _ = TEST_ENV.set(env);
    TEST_ENV.get().unwrap()
}

/// Unique database name per test
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh store on its own database, with unique indexes in place.
async fn mongo_store() -> MongoStore {
    let env = init_mongo_env().await;
    let client = Client::with_uri_str(&env.connection_url)
        .await
        .expect("Failed to connect to MongoDB");
    let db_num = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let database = client.database(&format!("storefront_test_{}", db_num));
    let store = MongoStore::new(client, database);
    store
        .ensure_indexes()
        .await
        .expect("Failed to create indexes");
    store
}

data_service_tests!(mongo_store().await);
commerce_service_tests!(mongo_store().await);
