use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, RateDecision};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let engine = Engine::builder().database(db.clone()).build().unwrap();
    (engine, db)
}

#[tokio::test]
async fn attempts_inside_the_limit_are_allowed() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc::now();

    for _ in 0..3 {
        let decision = engine
            .register_attempt("auth:bob", 3, 900, now)
            .await
            .unwrap();
        assert_eq!(decision, RateDecision::Allowed);
    }

    let decision = engine
        .register_attempt("auth:bob", 3, 900, now)
        .await
        .unwrap();
    assert!(decision.is_limited());
}

#[tokio::test]
async fn window_expiry_resets_the_counter() {
    let (engine, _db) = engine_with_db().await;
    let start = Utc::now();

    for _ in 0..4 {
        engine
            .register_attempt("auth:bob", 3, 900, start)
            .await
            .unwrap();
    }

    let later = start + Duration::seconds(901);
    let decision = engine
        .register_attempt("auth:bob", 3, 900, later)
        .await
        .unwrap();
    assert_eq!(decision, RateDecision::Allowed);
}

#[tokio::test]
async fn clearing_forgets_earlier_attempts() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc::now();

    for _ in 0..4 {
        engine
            .register_attempt("auth:bob", 3, 900, now)
            .await
            .unwrap();
    }
    engine.clear_attempts("auth:bob").await.unwrap();

    let decision = engine
        .register_attempt("auth:bob", 3, 900, now)
        .await
        .unwrap();
    assert_eq!(decision, RateDecision::Allowed);
}

#[tokio::test]
async fn counter_written_by_another_instance_is_continued() {
    let (engine, db) = engine_with_db().await;
    let now = Utc::now();

    // Another server instance already burned three attempts in this window.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO rate_limits (key, window_started_at, count) VALUES (?, ?, ?)",
        vec!["auth:bob".into(), now.into(), 3.into()],
    ))
    .await
    .unwrap();

    let decision = engine
        .register_attempt("auth:bob", 3, 900, now)
        .await
        .unwrap();
    assert!(decision.is_limited());

    // A different key is unaffected.
    let decision = engine
        .register_attempt("auth:sally", 3, 900, now)
        .await
        .unwrap();
    assert_eq!(decision, RateDecision::Allowed);
}
