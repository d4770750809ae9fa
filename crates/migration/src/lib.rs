pub use sea_orm_migration::prelude::*;

mod m20260825_000001_users;
mod m20260825_000002_products;
mod m20260825_000003_transactions;
mod m20260825_000004_disputes;
mod m20260825_000005_notifications;
mod m20260825_000006_rate_limits;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260825_000001_users::Migration),
            Box::new(m20260825_000002_products::Migration),
            Box::new(m20260825_000003_transactions::Migration),
            Box::new(m20260825_000004_disputes::Migration),
            Box::new(m20260825_000005_notifications::Migration),
            Box::new(m20260825_000006_rate_limits::Migration),
        ]
    }
}
