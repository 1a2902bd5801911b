//! Business logic writing and reading one row in `PostgreSQL`.

use sqlx::{Connection, PgConnection, Row};
use tracing::{debug, instrument};

use crate::error::{CallError, CallResult, Service};

const TEST_VALUE: &str = "this is a test";
const INSERT_NAME: &str = "INSERT INTO testdb (name) VALUES ($1)";
const SELECT_NAME: &str = "SELECT name FROM testdb";

/// Insert `"this is a test"` into `testdb` and return the first `name` read back.
///
/// # Errors
///
/// See [`insert_and_read_back`].
pub async fn db_client_call(connection_string: &str) -> CallResult<String> {
    insert_and_read_back(connection_string, TEST_VALUE).await
}

/// Insert `value` into `testdb`, then return the first `name` selected.
///
/// The connection is closed before returning, on success or failure.
///
/// # Errors
///
/// - [`CallError::Connection`] when the database cannot be reached.
/// - [`CallError::NoData`] when the select returns zero rows.
/// - [`CallError::Driver`] when a statement or the close fails.
#[instrument(level = "debug", skip_all)]
pub async fn insert_and_read_back(connection_string: &str, value: &str) -> CallResult<String> {
    let mut connection = connect(connection_string).await?;
    let outcome = insert_then_select(&mut connection, value).await;
    finish(connection, outcome).await
}

/// Return the first `name` in `testdb` without writing anything.
///
/// # Errors
///
/// - [`CallError::Connection`] when the database cannot be reached.
/// - [`CallError::NoData`] when the table is empty.
/// - [`CallError::Driver`] when the query or the close fails.
#[instrument(level = "debug", skip_all)]
pub async fn read_first_name(connection_string: &str) -> CallResult<String> {
    let mut connection = connect(connection_string).await?;
    let outcome = select_first_name(&mut connection).await;
    finish(connection, outcome).await
}

async fn connect(connection_string: &str) -> CallResult<PgConnection> {
    PgConnection::connect(connection_string)
        .await
        .map_err(|err| CallError::connection(Service::Database, err))
}

async fn insert_then_select(connection: &mut PgConnection, value: &str) -> CallResult<String> {
    let inserted = sqlx::query(INSERT_NAME)
        .bind(value)
        .execute(&mut *connection)
        .await
        .map_err(|err| CallError::driver("insert name", err))?;
    debug!(rows = inserted.rows_affected(), "inserted test record");
    select_first_name(connection).await
}

async fn select_first_name(connection: &mut PgConnection) -> CallResult<String> {
    let row = sqlx::query(SELECT_NAME)
        .fetch_optional(&mut *connection)
        .await
        .map_err(|err| CallError::driver("select name", err))?
        .ok_or(CallError::NoData {
            operation: "select name",
        })?;
    row.try_get::<String, _>("name")
        .map_err(|err| CallError::driver("decode name", err))
}

// The work error wins; a close failure only surfaces on success.
async fn finish(connection: PgConnection, outcome: CallResult<String>) -> CallResult<String> {
    let closed = connection
        .close()
        .await
        .map_err(|err| CallError::driver("close connection", err));
    let value = outcome?;
    closed?;
    Ok(value)
}
