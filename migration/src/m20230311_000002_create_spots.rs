use sea_orm_migration::{prelude::*, schema::*};

use super::m20230311_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Spot::Table)
                    .if_not_exists()
                    .col(pk_auto(Spot::Id))
                    .col(integer(Spot::OwnerId).not_null())
                    .col(string(Spot::Address).not_null())
                    .col(string(Spot::City).not_null())
                    .col(string(Spot::State).not_null())
                    .col(string(Spot::Country).not_null())
                    .col(double(Spot::Lat).not_null())
                    .col(double(Spot::Lng).not_null())
                    .col(string_len(Spot::Name, 50).not_null())
                    .col(text(Spot::Description).not_null())
                    .col(double(Spot::Price).not_null())
                    .col(
                        timestamp_with_time_zone(Spot::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Spot::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_spot_owner")
                            .from(Spot::Table, Spot::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Spot::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Spot {
    Table,
    Id,
    OwnerId,
    Address,
    City,
    State,
    Country,
    Lat,
    Lng,
    Name,
    Description,
    Price,
    CreatedAt,
    UpdatedAt,
}
