pub use sea_orm_migration::prelude::*;

mod m20230311_000001_create_users;
mod m20230311_000002_create_spots;
mod m20230311_000003_create_spot_images;
mod m20230311_000004_create_reviews;
mod m20230311_000005_create_review_images;
mod m20230311_000006_create_bookings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20230311_000001_create_users::Migration),
            Box::new(m20230311_000002_create_spots::Migration),
            Box::new(m20230311_000003_create_spot_images::Migration),
            Box::new(m20230311_000004_create_reviews::Migration),
            Box::new(m20230311_000005_create_review_images::Migration),
            Box::new(m20230311_000006_create_bookings::Migration),
        ]
    }
}
