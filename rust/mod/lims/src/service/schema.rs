use labtrack_core::ServiceError;
use labtrack_sql::SQLStore;

/// SQL DDL statements to initialize the LIMS database schema.
///
/// Each table stores the full JSON document in a `data` TEXT column,
/// with indexed columns extracted for efficient filtering and uniqueness.
/// `tests.batched` and `tests.batch_id` are both indexed because the
/// eligibility query matches on their disjunction.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS test_methods (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        name TEXT UNIQUE,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS samples (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        name TEXT,
        project_id TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS tests (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        test_method_id TEXT,
        sample_id TEXT,
        batched INTEGER DEFAULT 0,
        batch_id TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS batches (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        test_method_id TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS pipets (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        calibration_due TEXT,
        adjustable INTEGER,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS batch_pipets (
        batch_id TEXT NOT NULL,
        pipet_id TEXT NOT NULL,
        PRIMARY KEY (batch_id, pipet_id)
    )",
    "CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        user_id TEXT,
        received INTEGER DEFAULT 0,
        completed INTEGER DEFAULT 0,
        reported INTEGER DEFAULT 0,
        invoiced INTEGER DEFAULT 0,
        paid INTEGER DEFAULT 0,
        create_at TEXT,
        update_at TEXT
    )",
    // Indexes
    "CREATE INDEX IF NOT EXISTS idx_tests_method ON tests(test_method_id)",
    "CREATE INDEX IF NOT EXISTS idx_tests_batch ON tests(batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_tests_batched ON tests(batched)",
    "CREATE INDEX IF NOT EXISTS idx_tests_sample ON tests(sample_id)",
    "CREATE INDEX IF NOT EXISTS idx_batches_method ON batches(test_method_id)",
    "CREATE INDEX IF NOT EXISTS idx_samples_project ON samples(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_batch_pipets_pipet ON batch_pipets(pipet_id)",
    "CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id)",
];

pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(format!("schema init failed: {}", e)))?;
    }
    Ok(())
}
