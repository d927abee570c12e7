use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbErr, EntityName, Schema, Statement,
};
use std::env;
use tracing::{error, info, warn};

use crate::domain::questionnaire::entity::{
    administrator, question, question_option, questionnaire, scale_label, target, validation,
};
use crate::domain::response::entity::{answer, respondent};

/// Connects to MySQL and, when `DB_SCHEMA_UPDATE=true`, creates missing tables
/// and indexes.
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    info!("Successfully connected to the database.");

    let should_update_schema = match env::var("DB_SCHEMA_UPDATE") {
        Ok(raw) => raw.parse::<bool>().unwrap_or_else(|_| {
            warn!(value = %raw, "invalid DB_SCHEMA_UPDATE, expected 'true' or 'false'");
            false
        }),
        Err(_) => false,
    };

    if should_update_schema {
        create_tables(&db).await?;
    } else {
        info!("Skipping database schema synchronization (DB_SCHEMA_UPDATE is not true).");
    }

    Ok(db)
}

async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());
    info!("Starting database schema synchronization...");

    // Parents before children
    create_table_if_not_exists(db, &schema, questionnaire::Entity).await?;
    create_table_if_not_exists(db, &schema, administrator::Entity).await?;
    create_table_if_not_exists(db, &schema, target::Entity).await?;
    create_table_if_not_exists(db, &schema, question::Entity).await?;
    create_table_if_not_exists(db, &schema, question_option::Entity).await?;
    create_table_if_not_exists(db, &schema, scale_label::Entity).await?;
    create_table_if_not_exists(db, &schema, validation::Entity).await?;
    create_table_if_not_exists(db, &schema, respondent::Entity).await?;
    create_table_if_not_exists(db, &schema, answer::Entity).await?;

    // One live response per respondent. NULL keys never collide.
    create_index_if_not_exists(
        db,
        "uq_respondent_live",
        "respondent",
        &["questionnaire_id", "live_respondent"],
        true,
    )
    .await?;
    create_index_if_not_exists(
        db,
        "idx_question_questionnaire",
        "question",
        &["questionnaire_id", "deleted_at"],
        false,
    )
    .await?;
    create_index_if_not_exists(db, "idx_respondent_user", "respondent", &["user_id"], false)
        .await?;

    info!("Database schema synchronization completed.");
    Ok(())
}

fn is_already_exists(err: &DbErr) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("duplicate") || message.contains("exists")
}

async fn create_index_if_not_exists(
    db: &DatabaseConnection,
    index_name: &str,
    table_name: &str,
    columns: &[&str],
    unique: bool,
) -> Result<(), DbErr> {
    let sql = format!(
        "CREATE {}INDEX {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        index_name,
        table_name,
        columns.join(", ")
    );
    let stmt = Statement::from_string(db.get_database_backend(), sql);

    match db.execute(stmt).await {
        Ok(_) => {
            info!(index = index_name, "index created");
            Ok(())
        }
        Err(e) if is_already_exists(&e) => Ok(()),
        Err(e) => {
            error!("Failed to create index {}: {}", index_name, e);
            Err(e)
        }
    }
}

async fn create_table_if_not_exists<E>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr>
where
    E: sea_orm::EntityTrait,
{
    let table = entity.table_name().to_string();
    let backend = db.get_database_backend();
    let create_stmt: Statement =
        backend.build(schema.create_table_from_entity(entity).if_not_exists());

    db.execute(create_stmt).await.map(|_| ()).map_err(|e| {
        error!("Failed to create table {}: {}", table, e);
        e
    })
}
