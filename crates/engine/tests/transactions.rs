use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Statement};

use engine::{
    Actor, CreateTransactionCmd, Engine, EngineError, ShippingAddress, TransactionFilter,
    TransactionSide, TransactionStatus, TransitionCmd, UserRole,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    seed_user(&db, "bob", "buyer", true, true).await;
    seed_user(&db, "sally", "seller", true, true).await;
    seed_user(&db, "ada", "admin", true, true).await;
    seed_product(&db, "prod-1", "sally", 10_000, 1_000, 5).await;

    let engine = Engine::builder().database(db.clone()).build().unwrap();
    (engine, db)
}

async fn seed_user(db: &DatabaseConnection, id: &str, role: &str, active: bool, verified: bool) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (id, email, password, first_name, last_name, role, is_active, is_verified) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            format!("{id}@example.com").into(),
            "password".into(),
            id.into(),
            "Tester".into(),
            role.into(),
            active.into(),
            verified.into(),
        ],
    ))
    .await
    .unwrap();
}

async fn seed_product(
    db: &DatabaseConnection,
    id: &str,
    seller: &str,
    price_cents: i64,
    shipping_cents: i64,
    quantity: i32,
) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO products (id, seller_id, title, price_cents, shipping_cents, quantity_available, is_active) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            seller.into(),
            "Vintage Camera".into(),
            price_cents.into(),
            shipping_cents.into(),
            quantity.into(),
            true.into(),
        ],
    ))
    .await
    .unwrap();
}

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        country: "US".to_string(),
    }
}

fn order(quantity: i32) -> CreateTransactionCmd {
    CreateTransactionCmd {
        buyer_id: "bob".to_string(),
        product_id: "prod-1".to_string(),
        quantity,
        shipping_address: address(),
        buyer_notes: None,
    }
}

async fn stock(db: &DatabaseConnection, id: &str) -> i32 {
    engine::products::Entity::find_by_id(id.to_string())
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .quantity_available
}

#[tokio::test]
async fn create_holds_full_total_in_escrow() {
    let (engine, db) = engine_with_db().await;

    // 100.00 x 2 + 10.00 shipping, 2.5% fee on the subtotal.
    let tx = engine.create_transaction(order(2)).await.unwrap();

    assert_eq!(tx.unit_price_cents, 10_000);
    assert_eq!(tx.shipping_cents, 1_000);
    assert_eq!(tx.platform_fee_cents, 500);
    assert_eq!(tx.total_cents, 21_500);
    assert_eq!(tx.escrow_cents, tx.total_cents);
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(tx.public_id.starts_with("TXN-"));

    assert_eq!(stock(&db, "prod-1").await, 3);
}

#[tokio::test]
async fn create_notifies_the_seller() {
    let (engine, db) = engine_with_db().await;

    let tx = engine.create_transaction(order(1)).await.unwrap();

    let notes = engine::notifications::Entity::find().all(&db).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].user_id, "sally");
    assert_eq!(notes[0].action_ref.as_deref(), Some(tx.public_id.as_str()));
}

#[tokio::test]
async fn create_rejects_non_buyers() {
    let (engine, _db) = engine_with_db().await;

    let mut cmd = order(1);
    cmd.buyer_id = "sally".to_string();
    let err = engine.create_transaction(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn create_rejects_buying_own_product() {
    let (engine, db) = engine_with_db().await;
    seed_product(&db, "prod-bob", "bob", 5_000, 0, 1).await;

    let mut cmd = order(1);
    cmd.product_id = "prod-bob".to_string();
    let err = engine.create_transaction(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn create_rejects_unverified_buyer() {
    let (engine, db) = engine_with_db().await;
    seed_user(&db, "newbie", "buyer", true, false).await;

    let mut cmd = order(1);
    cmd.buyer_id = "newbie".to_string();
    let err = engine.create_transaction(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn insufficient_stock_leaves_stock_unchanged() {
    let (engine, db) = engine_with_db().await;

    let err = engine.create_transaction(order(10)).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(stock(&db, "prod-1").await, 5);
}

#[tokio::test]
async fn stock_can_be_exhausted_exactly_once() {
    let (engine, db) = engine_with_db().await;

    engine.create_transaction(order(5)).await.unwrap();
    assert_eq!(stock(&db, "prod-1").await, 0);

    let err = engine.create_transaction(order(1)).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));
}

#[tokio::test]
async fn rejects_transition_not_in_workflow() {
    let (engine, _db) = engine_with_db().await;
    let tx = engine.create_transaction(order(1)).await.unwrap();

    let err = engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: Actor::new("bob", UserRole::Buyer),
            new_status: TransactionStatus::Delivered,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
}

#[tokio::test]
async fn buyer_cannot_mark_shipped() {
    let (engine, _db) = engine_with_db().await;
    let tx = engine.create_transaction(order(1)).await.unwrap();

    engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: Actor::new("bob", UserRole::Buyer),
            new_status: TransactionStatus::Paid,
            notes: None,
        })
        .await
        .unwrap();

    let err = engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: Actor::new("bob", UserRole::Buyer),
            new_status: TransactionStatus::Shipped,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn outsider_cannot_see_the_transaction() {
    let (engine, db) = engine_with_db().await;
    seed_user(&db, "eve", "buyer", true, true).await;
    let tx = engine.create_transaction(order(1)).await.unwrap();

    let err = engine
        .transaction(&Actor::new("eve", UserRole::Buyer), tx.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn full_workflow_reaches_completed() {
    let (engine, _db) = engine_with_db().await;
    let tx = engine.create_transaction(order(1)).await.unwrap();
    let buyer = Actor::new("bob", UserRole::Buyer);

    let tx2 = engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: buyer.clone(),
            new_status: TransactionStatus::Paid,
            notes: Some("paid via card".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(tx2.status, TransactionStatus::Paid);
    assert_eq!(tx2.buyer_notes.as_deref(), Some("paid via card"));

    let tx3 = engine.add_tracking(tx.id, "sally", "TRACK-42").await.unwrap();
    assert_eq!(tx3.status, TransactionStatus::Shipped);
    assert_eq!(tx3.tracking_number.as_deref(), Some("TRACK-42"));
    assert!(tx3.estimated_delivery_at.is_some());

    let tx4 = engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: buyer,
            new_status: TransactionStatus::Delivered,
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(tx4.status, TransactionStatus::Delivered);
    assert!(tx4.delivered_at.is_some());

    let tx5 = engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: Actor::new("ada", UserRole::Admin),
            new_status: TransactionStatus::Completed,
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(tx5.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn transition_without_notes_keeps_stored_notes() {
    let (engine, _db) = engine_with_db().await;
    let tx = engine.create_transaction(order(1)).await.unwrap();
    let buyer = Actor::new("bob", UserRole::Buyer);

    engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: buyer.clone(),
            new_status: TransactionStatus::Paid,
            notes: Some("paid via card".to_string()),
        })
        .await
        .unwrap();
    engine.add_tracking(tx.id, "sally", "TRACK-9").await.unwrap();

    let delivered = engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: buyer,
            new_status: TransactionStatus::Delivered,
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(delivered.buyer_notes.as_deref(), Some("paid via card"));

    // Whitespace-only notes count as absent, not as a clear.
    let completed = engine
        .transition_transaction(TransitionCmd {
            transaction_id: tx.id,
            actor: Actor::new("ada", UserRole::Admin),
            new_status: TransactionStatus::Completed,
            notes: Some("   ".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(completed.buyer_notes.as_deref(), Some("paid via card"));
    assert!(completed.seller_notes.is_none());
}

#[tokio::test]
async fn tracking_requires_paid_status() {
    let (engine, _db) = engine_with_db().await;
    let tx = engine.create_transaction(order(1)).await.unwrap();

    let err = engine.add_tracking(tx.id, "sally", "TRACK-1").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    // Only the seller may attach tracking at all.
    let err = engine.add_tracking(tx.id, "bob", "TRACK-1").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn listing_is_scoped_to_participants() {
    let (engine, db) = engine_with_db().await;
    seed_user(&db, "eve", "buyer", true, true).await;
    engine.create_transaction(order(1)).await.unwrap();

    let own = engine
        .list_transactions(
            &Actor::new("bob", UserRole::Buyer),
            &TransactionFilter::default(),
            50,
        )
        .await
        .unwrap();
    assert_eq!(own.len(), 1);

    let sold = engine
        .list_transactions(
            &Actor::new("sally", UserRole::Seller),
            &TransactionFilter {
                side: Some(TransactionSide::Seller),
                ..Default::default()
            },
            50,
        )
        .await
        .unwrap();
    assert_eq!(sold.len(), 1);

    let other = engine
        .list_transactions(
            &Actor::new("eve", UserRole::Buyer),
            &TransactionFilter::default(),
            50,
        )
        .await
        .unwrap();
    assert!(other.is_empty());

    let all = engine
        .list_transactions(
            &Actor::new("ada", UserRole::Admin),
            &TransactionFilter {
                status: Some(TransactionStatus::Pending),
                ..Default::default()
            },
            50,
        )
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}
