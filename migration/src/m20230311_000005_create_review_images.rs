use sea_orm_migration::{prelude::*, schema::*};

use super::m20230311_000004_create_reviews::Review;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReviewImage::Table)
                    .if_not_exists()
                    .col(pk_auto(ReviewImage::Id))
                    .col(integer(ReviewImage::ReviewId).not_null())
                    .col(string(ReviewImage::Url).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_image_review")
                            .from(ReviewImage::Table, ReviewImage::ReviewId)
                            .to(Review::Table, Review::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReviewImage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReviewImage {
    Table,
    Id,
    ReviewId,
    Url,
}
