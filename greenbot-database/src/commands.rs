use crate::Database;

/// One stored command definition.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CommandRow {
    pub id: i32,
    /// Trigger aliases separated by `|`.
    pub command: String,
    pub level: i32,
    /// Raw declarative action description.
    pub action_json: String,
    pub description: Option<String>,
}

/// Load every enabled command, oldest first.
pub async fn enabled_commands(db: &Database) -> Result<Vec<CommandRow>, sqlx::Error> {
    sqlx::query_as::<_, CommandRow>(
        "SELECT id, command, level, action_json, description \
         FROM command \
         WHERE enabled \
         ORDER BY id",
    )
    .fetch_all(db.pool())
    .await
}
