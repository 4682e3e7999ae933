use populatr_core::connect::DatabasePool;
use populatr_core::dialect::Dialect;
use populatr_core::schema::types::*;
use sqlx::sqlite::SqlitePoolOptions;

/// Authors and the books that reference them.
pub const AUTHORS_BOOKS_DDL: &str = r#"
CREATE TABLE authors (
    id INTEGER PRIMARY KEY,
    name VARCHAR(40) NOT NULL,
    born DATE
);
CREATE TABLE books (
    id INTEGER PRIMARY KEY,
    author_id INTEGER NOT NULL REFERENCES authors(id),
    title VARCHAR(80) NOT NULL,
    price NUMERIC(5,2),
    in_print BOOLEAN
);
"#;

/// A table with a NOT NULL column of a type nothing can generate, next to a
/// table that is fine.
pub const UNSUPPORTED_DDL: &str = r#"
CREATE TABLE places (
    id INTEGER PRIMARY KEY,
    shape GEOMETRY NOT NULL
);
CREATE TABLE tags (
    id INTEGER PRIMARY KEY,
    label VARCHAR(20) NOT NULL
);
"#;

/// Two tables that reference each other.
pub const CYCLIC_DDL: &str = r#"
CREATE TABLE teams (
    id INTEGER PRIMARY KEY,
    captain_id INTEGER REFERENCES players(id)
);
CREATE TABLE players (
    id INTEGER PRIMARY KEY,
    team_id INTEGER REFERENCES teams(id)
);
"#;

/// Open a single-connection in-memory SQLite database and run `ddl` on it.
pub async fn sqlite_pool(ddl: &str) -> DatabasePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory sqlite");
    sqlx::raw_sql(ddl)
        .execute(&pool)
        .await
        .expect("fixture DDL failed");
    DatabasePool::from(pool)
}

fn table(name: &str, columns: Vec<ColumnMetadata>) -> TableMetadata {
    let mut table = TableMetadata::new(name.to_string());
    for (i, mut column) in columns.into_iter().enumerate() {
        column.ordinal_position = i as u32 + 1;
        table.push_column(column);
    }
    table
}

fn schema_of(dialect: Dialect, tables: Vec<TableMetadata>) -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(dialect);
    for t in tables {
        schema.tables.insert(t.name.clone(), t);
    }
    schema
}

/// `books.author_id -> authors.id`, with `books` listed first.
pub fn authors_books_schema() -> DatabaseSchema {
    let books = table(
        "books",
        vec![
            ColumnMetadata::from_raw("id", "integer").not_null(),
            ColumnMetadata::from_raw("author_id", "integer")
                .not_null()
                .references("authors", "id"),
            ColumnMetadata::from_raw("title", "character varying")
                .not_null()
                .with_max_length(80),
            ColumnMetadata::from_raw("price", "numeric").with_precision(5, 2),
        ],
    );
    let authors = table(
        "authors",
        vec![
            ColumnMetadata::from_raw("id", "integer").not_null(),
            ColumnMetadata::from_raw("name", "character varying")
                .not_null()
                .with_max_length(40),
            ColumnMetadata::from_raw("born", "date"),
        ],
    );
    schema_of(Dialect::PostgreSQL, vec![books, authors])
}

/// `categories.parent_id -> categories.id`, nullable.
pub fn self_referencing_schema() -> DatabaseSchema {
    let categories = table(
        "categories",
        vec![
            ColumnMetadata::from_raw("id", "bigint").not_null(),
            ColumnMetadata::from_raw("parent_id", "bigint").references("categories", "id"),
            ColumnMetadata::from_raw("name", "character varying").with_max_length(30),
        ],
    );
    schema_of(Dialect::PostgreSQL, vec![categories])
}

/// `places.shape` is a NOT NULL geometry; `places.note` is a nullable one.
pub fn unsupported_type_schema() -> DatabaseSchema {
    let places = table(
        "places",
        vec![
            ColumnMetadata::from_raw("id", "integer").not_null(),
            ColumnMetadata::from_raw("shape", "geometry").not_null(),
        ],
    );
    let notes = table(
        "notes",
        vec![
            ColumnMetadata::from_raw("id", "integer").not_null(),
            ColumnMetadata::from_raw("area", "geometry"),
            ColumnMetadata::from_raw("place_id", "integer").references("places", "id"),
        ],
    );
    schema_of(Dialect::PostgreSQL, vec![places, notes])
}

/// `teams` and `players` reference each other; `leagues` stands apart.
pub fn cyclic_schema() -> DatabaseSchema {
    let teams = table(
        "teams",
        vec![
            ColumnMetadata::from_raw("id", "integer").not_null(),
            ColumnMetadata::from_raw("captain_id", "integer").references("players", "id"),
        ],
    );
    let players = table(
        "players",
        vec![
            ColumnMetadata::from_raw("id", "integer").not_null(),
            ColumnMetadata::from_raw("team_id", "integer").references("teams", "id"),
        ],
    );
    let leagues = table(
        "leagues",
        vec![ColumnMetadata::from_raw("id", "integer").not_null()],
    );
    schema_of(Dialect::PostgreSQL, vec![teams, players, leagues])
}
