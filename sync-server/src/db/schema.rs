/// SQL schema for the Sync database
/// Creates all tables with proper constraints, foreign keys, and indexes
///
/// Timestamps are fixed-width RFC 3339 strings (microsecond precision, `Z`
/// suffix) so that text ordering matches chronological ordering.
pub const SCHEMA: &str = r#"
-- Users table
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Groups table (owner is fixed at creation)
CREATE TABLE IF NOT EXISTS user_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    owner_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_groups_created_at ON user_groups(created_at DESC, id DESC);

-- Group membership edges
CREATE TABLE IF NOT EXISTS group_memberships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    group_id INTEGER NOT NULL,
    role TEXT NOT NULL DEFAULT 'member' CHECK(role IN ('admin', 'member')),
    date_joined TEXT NOT NULL,
    UNIQUE (user_id, group_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (group_id) REFERENCES user_groups(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_memberships_group ON group_memberships(group_id, date_joined DESC);

-- Posts table
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author_id INTEGER NOT NULL,
    group_id INTEGER,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    likes_count INTEGER NOT NULL DEFAULT 0 CHECK(likes_count >= 0),
    FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (group_id) REFERENCES user_groups(id) ON DELETE CASCADE
);

-- Create index on (created_at, id) for the shared timeline ordering
CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);
CREATE INDEX IF NOT EXISTS idx_posts_group ON posts(group_id);

-- Comments table
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL,
    author_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at DESC);

-- Likes table (at most one per user and post)
CREATE TABLE IF NOT EXISTS likes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    post_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, post_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_likes_post ON likes(post_id, created_at DESC);

-- Follows table (one-way relationships)
CREATE TABLE IF NOT EXISTS follows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    follower_id INTEGER NOT NULL,
    followed_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (follower_id, followed_id),
    FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (followed_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Indexes for efficient follow lookups
CREATE INDEX IF NOT EXISTS idx_follows_follower ON follows(follower_id);
CREATE INDEX IF NOT EXISTS idx_follows_followed ON follows(followed_id);

-- Sessions table for authentication
CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
"#;

/// Test data for development and testing
/// - 3 users (alice, bob, charlie)
/// - alice follows bob, charlie follows alice
/// - "Rustaceans" group owned by alice, bob is a member
/// - 5 posts (one of them inside the group), one comment, one like
pub const TEST_DATA: &str = r#"
INSERT OR IGNORE INTO users (id, username, email, created_at) VALUES
    (1, 'alice', 'alice@example.com', '2024-01-01T00:00:00.000000Z'),
    (2, 'bob', 'bob@example.com', '2024-01-02T00:00:00.000000Z'),
    (3, 'charlie', 'charlie@example.com', '2024-01-03T00:00:00.000000Z');

INSERT OR IGNORE INTO follows (id, follower_id, followed_id, created_at) VALUES
    (1, 1, 2, '2024-01-04T00:00:00.000000Z'),
    (2, 3, 1, '2024-01-05T00:00:00.000000Z');

INSERT OR IGNORE INTO user_groups (id, name, description, owner_id, created_at) VALUES
    (1, 'Rustaceans', 'Talk about Rust', 1, '2024-01-06T00:00:00.000000Z');

INSERT OR IGNORE INTO group_memberships (id, user_id, group_id, role, date_joined) VALUES
    (1, 1, 1, 'admin', '2024-01-06T00:00:00.000000Z'),
    (2, 2, 1, 'member', '2024-01-07T00:00:00.000000Z');

INSERT OR IGNORE INTO posts (id, author_id, group_id, title, content, created_at, updated_at, likes_count) VALUES
    (1, 1, NULL, 'Hello', 'First post from alice', '2024-01-10T10:00:00.000000Z', '2024-01-10T10:00:00.000000Z', 1),
    (2, 2, NULL, 'Terminal colors', 'Any tips for color schemes?', '2024-01-10T08:00:00.000000Z', '2024-01-10T08:00:00.000000Z', 0),
    (3, 2, 1, 'Group kickoff', 'Welcome to the group', '2024-01-09T12:00:00.000000Z', '2024-01-09T12:00:00.000000Z', 0),
    (4, 3, NULL, 'SQLite tips', 'Use WAL mode', '2024-01-09T09:00:00.000000Z', '2024-01-09T09:00:00.000000Z', 0),
    (5, 1, NULL, 'Second thoughts', 'Borrow checker is my friend', '2024-01-08T09:00:00.000000Z', '2024-01-08T09:00:00.000000Z', 0);

INSERT OR IGNORE INTO comments (id, post_id, author_id, content, created_at, updated_at) VALUES
    (1, 1, 3, 'Welcome!', '2024-01-10T11:00:00.000000Z', '2024-01-10T11:00:00.000000Z');

INSERT OR IGNORE INTO likes (id, user_id, post_id, created_at) VALUES
    (1, 2, 1, '2024-01-10T12:00:00.000000Z');
"#;
