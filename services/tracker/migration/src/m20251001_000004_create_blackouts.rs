use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Blackouts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Blackouts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Blackouts::LocationId).uuid().not_null())
                    .col(ColumnDef::new(Blackouts::OutageDate).date().not_null())
                    .col(ColumnDef::new(Blackouts::StartTime).string().not_null())
                    .col(ColumnDef::new(Blackouts::EndTime).string().not_null())
                    .col(ColumnDef::new(Blackouts::Reason).text())
                    .col(ColumnDef::new(Blackouts::Address).text())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Blackouts::Table, Blackouts::LocationId)
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Blackouts::Table)
                    .col(Blackouts::LocationId)
                    .col(Blackouts::OutageDate)
                    .name("idx_blackouts_location_id_outage_date")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Blackouts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Blackouts {
    Table,
    Id,
    LocationId,
    OutageDate,
    StartTime,
    EndTime,
    Reason,
    Address,
}

#[derive(Iden)]
enum Locations {
    Table,
    Id,
}
