//! Schema initialization
//!
//! Creates the tables backing the SeaORM entities when they are missing.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

use crate::entity::users;

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut stmt = schema.create_table_from_entity(users::Entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;

    tracing::info!(table = "users", "Schema ensured");
    Ok(())
}
