use sea_orm_migration::{prelude::*, schema::*};

use super::m20230311_000002_create_spots::Spot;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SpotImage::Table)
                    .if_not_exists()
                    .col(pk_auto(SpotImage::Id))
                    .col(integer(SpotImage::SpotId).not_null())
                    .col(string(SpotImage::Url).not_null())
                    .col(boolean(SpotImage::Preview).not_null().default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_spot_image_spot")
                            .from(SpotImage::Table, SpotImage::SpotId)
                            .to(Spot::Table, Spot::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SpotImage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SpotImage {
    Table,
    Id,
    SpotId,
    Url,
    Preview,
}
