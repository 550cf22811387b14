//! SQLite schema
//!
//! Idempotent DDL applied on every open. Child tables cascade when their
//! prompt row is deleted; env vars outlive their prompt and are unlinked
//! instead.

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    primary_category TEXT NOT NULL,
    directory TEXT NOT NULL UNIQUE,       -- filesystem directory name, the external key
    one_line_description TEXT,
    description TEXT,
    content_hash TEXT,                    -- hash of prompt.md for change detection
    tags TEXT,                            -- comma-separated
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS subcategories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    FOREIGN KEY (prompt_id) REFERENCES prompts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS variables (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    value TEXT,                           -- direct value, 'Env: NAME', or 'Fragment: cat/name'
    optional_for_user BOOLEAN DEFAULT 0,
    FOREIGN KEY (prompt_id) REFERENCES prompts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS fragments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    variable TEXT NOT NULL,               -- the prompt variable the fragment feeds
    FOREIGN KEY (prompt_id) REFERENCES prompts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS env_vars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT,
    value TEXT,
    scope TEXT NOT NULL DEFAULT 'global',
    prompt_id INTEGER,
    is_secret BOOLEAN DEFAULT 0,
    FOREIGN KEY (prompt_id) REFERENCES prompts(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS prompt_executions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_id INTEGER NOT NULL,
    execution_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (prompt_id) REFERENCES prompts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS favorite_prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_id INTEGER NOT NULL UNIQUE,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (prompt_id) REFERENCES prompts(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_prompts_directory ON prompts(directory);
CREATE INDEX IF NOT EXISTS idx_prompts_category ON prompts(primary_category);
CREATE INDEX IF NOT EXISTS idx_subcategories_prompt_id ON subcategories(prompt_id);
CREATE INDEX IF NOT EXISTS idx_variables_prompt_id ON variables(prompt_id);
CREATE INDEX IF NOT EXISTS idx_variables_name ON variables(name);
CREATE INDEX IF NOT EXISTS idx_fragments_prompt_id ON fragments(prompt_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_env_vars_name ON env_vars(UPPER(name));
CREATE INDEX IF NOT EXISTS idx_executions_prompt_id ON prompt_executions(prompt_id);
CREATE INDEX IF NOT EXISTS idx_executions_time ON prompt_executions(execution_time);
CREATE UNIQUE INDEX IF NOT EXISTS idx_favorites_prompt_id ON favorite_prompts(prompt_id);
";
