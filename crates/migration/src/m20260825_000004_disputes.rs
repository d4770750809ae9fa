use sea_orm_migration::prelude::*;

use crate::m20260825_000001_users::Users;
use crate::m20260825_000003_transactions::Transactions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Disputes {
    Table,
    Id,
    PublicId,
    TransactionId,
    InitiatorId,
    Kind,
    Title,
    Description,
    Evidence,
    Status,
    AssignedReviewerId,
    Resolution,
    ResolvedAt,
    CreatedAt,
}

#[derive(Iden)]
enum DisputeMessages {
    Table,
    Id,
    DisputeId,
    SenderId,
    Body,
    Attachments,
    FromReviewer,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Disputes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Disputes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Disputes::PublicId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Disputes::TransactionId).string().not_null())
                    .col(ColumnDef::new(Disputes::InitiatorId).string().not_null())
                    .col(ColumnDef::new(Disputes::Kind).string().not_null())
                    .col(ColumnDef::new(Disputes::Title).string().not_null())
                    .col(ColumnDef::new(Disputes::Description).string().not_null())
                    .col(ColumnDef::new(Disputes::Evidence).string().not_null())
                    .col(ColumnDef::new(Disputes::Status).string().not_null())
                    .col(ColumnDef::new(Disputes::AssignedReviewerId).string())
                    .col(ColumnDef::new(Disputes::Resolution).string())
                    .col(ColumnDef::new(Disputes::ResolvedAt).timestamp())
                    .col(ColumnDef::new(Disputes::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-disputes-transaction_id")
                            .from(Disputes::Table, Disputes::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-disputes-initiator_id")
                            .from(Disputes::Table, Disputes::InitiatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-disputes-transaction_id")
                    .table(Disputes::Table)
                    .col(Disputes::TransactionId)
                    .to_owned(),
            )
            .await?;

        // One active dispute per transaction. Partial indexes are not
        // expressible through the schema builder, so raw SQL it is.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"uq-disputes-active-transaction\" \
                 ON \"disputes\" (\"transaction_id\") \
                 WHERE \"status\" IN ('open', 'under_review')",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DisputeMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DisputeMessages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DisputeMessages::DisputeId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DisputeMessages::SenderId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DisputeMessages::Body).string().not_null())
                    .col(
                        ColumnDef::new(DisputeMessages::Attachments)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DisputeMessages::FromReviewer)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DisputeMessages::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-dispute_messages-dispute_id")
                            .from(DisputeMessages::Table, DisputeMessages::DisputeId)
                            .to(Disputes::Table, Disputes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-dispute_messages-dispute_id-created_at")
                    .table(DisputeMessages::Table)
                    .col(DisputeMessages::DisputeId)
                    .col(DisputeMessages::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DisputeMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Disputes::Table).to_owned())
            .await
    }
}
