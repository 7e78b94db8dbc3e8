//! Schema bootstrap statements, executed in order inside one transaction.

pub(super) const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS task (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL CHECK (length(trim(title)) > 0),
        description TEXT,
        status TEXT NOT NULL DEFAULT 'TODO'
            CHECK (status IN ('TODO', 'IN_PROGRESS', 'DONE')),
        priority TEXT NOT NULL DEFAULT 'MEDIUM'
            CHECK (priority IN ('LOW', 'MEDIUM', 'HIGH')),
        due_date TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS category (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        color TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS task_category_link (
        task_id INTEGER NOT NULL REFERENCES task(id) ON DELETE CASCADE,
        category_id INTEGER NOT NULL REFERENCES category(id) ON DELETE CASCADE,
        PRIMARY KEY (task_id, category_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_task_status ON task(status)",
    "CREATE INDEX IF NOT EXISTS idx_task_category_link_category ON task_category_link(category_id)",
];
