use sea_orm_migration::prelude::*;

use crate::m20260825_000001_users::Users;
use crate::m20260825_000002_products::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Transactions {
    Table,
    Id,
    PublicId,
    BuyerId,
    SellerId,
    ProductId,
    Quantity,
    UnitPriceCents,
    ShippingCents,
    PlatformFeeCents,
    TotalCents,
    EscrowCents,
    Status,
    ShippingAddress,
    TrackingNumber,
    BuyerNotes,
    SellerNotes,
    CreatedAt,
    EstimatedDeliveryAt,
    DeliveredAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::PublicId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Transactions::BuyerId).string().not_null())
                    .col(ColumnDef::new(Transactions::SellerId).string().not_null())
                    .col(ColumnDef::new(Transactions::ProductId).string().not_null())
                    .col(ColumnDef::new(Transactions::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(Transactions::UnitPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::ShippingCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::PlatformFeeCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::TotalCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::EscrowCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::ShippingAddress)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::TrackingNumber).string())
                    .col(ColumnDef::new(Transactions::BuyerNotes).string())
                    .col(ColumnDef::new(Transactions::SellerNotes).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::EstimatedDeliveryAt).timestamp())
                    .col(ColumnDef::new(Transactions::DeliveredAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-buyer_id")
                            .from(Transactions::Table, Transactions::BuyerId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-seller_id")
                            .from(Transactions::Table, Transactions::SellerId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-product_id")
                            .from(Transactions::Table, Transactions::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-buyer_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::BuyerId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-seller_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::SellerId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-status")
                    .table(Transactions::Table)
                    .col(Transactions::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}
