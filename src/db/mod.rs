use sea_orm::{ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;

use crate::config::Config;
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::utils::password::hash_password;

pub const DEMO_USERNAME: &str = "Demo-lition";
const DEMO_EMAIL: &str = "demo@user.io";
const DEMO_PASSWORD: &str = "password";

pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    Database::connect(&config.database_url)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))
}

/// Bring the schema up to date.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    migration::Migrator::up(db, None).await?;
    Ok(())
}

/// Seed the demo account used by the frontend's "demo login" if it doesn't exist
pub async fn seed_demo_user(db: &DatabaseConnection) -> AppResult<()> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(DEMO_USERNAME))
        .one(db)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let demo = user::ActiveModel {
        first_name: Set("Demo".to_string()),
        last_name: Set("User".to_string()),
        email: Set(DEMO_EMAIL.to_string()),
        username: Set(DEMO_USERNAME.to_string()),
        password_hash: Set(hash_password(DEMO_PASSWORD)?),
        ..Default::default()
    };

    demo.insert(db).await?;
    tracing::info!("Demo account created: {}", DEMO_USERNAME);
    Ok(())
}
