//! Event log migrations, embedded at compile time
//!
//! Applied by `MigrationService::with_migrations` against logs.duckdb. The
//! bootstrap file must stay first.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
