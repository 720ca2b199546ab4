use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Discussion, Engagement, Event, EventChanges, EventId, NewEvent, Reply, UserIdentity};

const EVENT_COLUMNS: &str = "id, title, date, time, end_time, location, category, description, \
                             organizer, image, created_by, comments, created_at";

fn membership_table(kind: Engagement) -> &'static str {
    match kind {
        Engagement::Like => "event_likes",
        Engagement::Attend => "event_attendees",
    }
}

// Calendar database over an SQLx connection pool
pub struct CalendarDatabase {
    pub pool: SqlitePool,
}

impl CalendarDatabase {
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid database url {}: {}", database_url, e))
            })?
            .create_if_missing(true);

        // Every connection to an in-memory database is a separate database,
        // so keep exactly one and never recycle it
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to {}: {}", database_url, e))
            })?;

        info!("Connected to calendar database at {}", database_url);
        Ok(Self { pool })
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        let db = Self::new("sqlite::memory:").await?;
        db.init().await?;
        Ok(db)
    }

    pub async fn init(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL DEFAULT '',
                end_time TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                organizer TEXT NOT NULL DEFAULT '',
                image TEXT NOT NULL DEFAULT '',
                created_by TEXT NOT NULL,
                comments INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create events table: {}", e)))?;

        for table in [membership_table(Engagement::Like), membership_table(Engagement::Attend)] {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    event_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (event_id, user_id)
                )",
                table
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create {} table: {}", table, e)))?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS discussions (
                id INTEGER PRIMARY KEY,
                event_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                user_initials TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create discussions table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS discussion_replies (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id INTEGER NOT NULL,
                discussion_id INTEGER NOT NULL,
                user_name TEXT NOT NULL,
                user_initials TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create replies table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_discussions_event ON discussions(event_id, created_at)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_replies_discussion ON discussion_replies(discussion_id, seq)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn list_events(&self) -> AppResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM events ORDER BY date ASC, created_at ASC",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut likes = self.all_members(Engagement::Like).await?;
        let mut attendees = self.all_members(Engagement::Attend).await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let liked_by = likes.remove(&id).unwrap_or_default();
            let attending_users = attendees.remove(&id).unwrap_or_default();
            events.push(event_from_row(&row, liked_by, attending_users)?);
        }

        Ok(events)
    }

    pub async fn get_event(&self, id: &str) -> AppResult<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let liked_by = self.members_of(id, Engagement::Like).await?;
                let attending_users = self.members_of(id, Engagement::Attend).await?;
                Ok(Some(event_from_row(&row, liked_by, attending_users)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn insert_event(&self, new: NewEvent) -> AppResult<Event> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO events (id, title, date, time, end_time, location, category, description, \
             organizer, image, created_by, comments, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&new.title)
        .bind(new.date)
        .bind(&new.time)
        .bind(&new.end_time)
        .bind(&new.location)
        .bind(&new.category)
        .bind(&new.description)
        .bind(&new.organizer)
        .bind(&new.image)
        .bind(&new.created_by)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert event: {}", e)))?;

        let mut event = Event::from_new(EventId::new(id), new);
        event.created_at = Some(now);
        debug!("Inserted event {}", event.id);
        Ok(event)
    }

    pub async fn update_event(&self, id: &str, changes: &EventChanges) -> AppResult<Option<Event>> {
        let mut event = match self.get_event(id).await? {
            Some(event) => event,
            None => return Ok(None),
        };
        event.apply_changes(changes);

        sqlx::query(
            "UPDATE events SET title = ?, date = ?, time = ?, end_time = ?, location = ?, \
             category = ?, description = ?, organizer = ?, image = ? WHERE id = ?",
        )
        .bind(&event.title)
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.end_time)
        .bind(&event.location)
        .bind(&event.category)
        .bind(&event.description)
        .bind(&event.organizer)
        .bind(&event.image)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Some(event))
    }

    /// Removes the event together with its memberships and discussions.
    /// Returns false when no such event exists.
    pub async fn delete_event(&self, id: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Ok(false);
        }

        for kind in [Engagement::Like, Engagement::Attend] {
            sqlx::query(&format!("DELETE FROM {} WHERE event_id = ?", membership_table(kind)))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "DELETE FROM discussion_replies WHERE discussion_id IN \
             (SELECT id FROM discussions WHERE event_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM discussions WHERE event_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Flips (or settles to `desired`) a user's membership in one transaction.
    /// The delete-else-insert pair is a compare-and-set on the membership row,
    /// so concurrent toggles never lose an update to a stale counter. The
    /// first statement is a write: a deferred transaction that reads first
    /// cannot upgrade its lock while another connection writes.
    #[instrument(skip(self))]
    pub async fn toggle_membership(
        &self,
        id: &str,
        kind: Engagement,
        user_id: &str,
        desired: Option<bool>,
    ) -> AppResult<Option<Event>> {
        let table = membership_table(kind);
        let insert = format!(
            "INSERT OR IGNORE INTO {} (event_id, user_id, created_at) VALUES (?, ?, ?)",
            table
        );
        let delete = format!("DELETE FROM {} WHERE event_id = ? AND user_id = ?", table);

        let mut tx = self.pool.begin().await?;

        match desired {
            Some(true) => {
                sqlx::query(&insert)
                    .bind(id)
                    .bind(user_id)
                    .bind(Utc::now())
                    .execute(&mut *tx)
                    .await?;
            }
            Some(false) => {
                sqlx::query(&delete).bind(id).bind(user_id).execute(&mut *tx).await?;
            }
            None => {
                let removed = sqlx::query(&delete)
                    .bind(id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                if removed == 0 {
                    sqlx::query(&insert)
                        .bind(id)
                        .bind(user_id)
                        .bind(Utc::now())
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        // Membership rows for an unknown event are rolled back with the transaction
        let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        self.get_event(id).await
    }

    pub async fn increment_comments(&self, id: &str) -> AppResult<Option<Event>> {
        let updated = sqlx::query("UPDATE events SET comments = comments + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Ok(None);
        }
        self.get_event(id).await
    }

    async fn members_of(&self, id: &str, kind: Engagement) -> AppResult<BTreeSet<String>> {
        let users = sqlx::query_scalar::<_, String>(&format!(
            "SELECT user_id FROM {} WHERE event_id = ?",
            membership_table(kind)
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users.into_iter().collect())
    }

    async fn all_members(&self, kind: Engagement) -> AppResult<HashMap<String, BTreeSet<String>>> {
        let rows = sqlx::query(&format!(
            "SELECT event_id, user_id FROM {}",
            membership_table(kind)
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<String, BTreeSet<String>> = HashMap::new();
        for row in rows {
            let event_id: String = row.try_get("event_id")?;
            let user_id: String = row.try_get("user_id")?;
            members.entry(event_id).or_default().insert(user_id);
        }
        Ok(members)
    }

    // ---------------------------------------------------------------------
    // Discussions
    // ---------------------------------------------------------------------

    pub async fn list_discussions(&self, event_id: &str) -> AppResult<Vec<Discussion>> {
        let rows = sqlx::query(
            "SELECT id, event_id, user_name, user_initials, content, timestamp \
             FROM discussions WHERE event_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let mut discussions = Vec::with_capacity(rows.len());
        for row in rows {
            let mut discussion = discussion_from_row(&row)?;
            discussion.replies = self.replies_of(discussion.id).await?;
            discussions.push(discussion);
        }
        Ok(discussions)
    }

    pub async fn get_discussion(&self, id: i64) -> AppResult<Option<Discussion>> {
        let row = sqlx::query(
            "SELECT id, event_id, user_name, user_initials, content, timestamp \
             FROM discussions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut discussion = discussion_from_row(&row)?;
                discussion.replies = self.replies_of(id).await?;
                Ok(Some(discussion))
            }
            None => Ok(None),
        }
    }

    pub async fn insert_discussion(&self, discussion: &Discussion) -> AppResult<Discussion> {
        sqlx::query(
            "INSERT INTO discussions (id, event_id, user_name, user_initials, content, timestamp, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(discussion.id)
        .bind(discussion.event_id.as_str())
        .bind(&discussion.user.name)
        .bind(&discussion.user.initials)
        .bind(&discussion.content)
        .bind(discussion.timestamp)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::BadRequest(format!("Discussion {} already exists", discussion.id))
            }
            _ => AppError::DatabaseError(format!("Failed to insert discussion: {}", e)),
        })?;

        Ok(Discussion {
            replies: Vec::new(),
            ..discussion.clone()
        })
    }

    /// Appends a reply; None when the discussion does not exist.
    pub async fn append_reply(&self, discussion_id: i64, reply: &Reply) -> AppResult<Option<Discussion>> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM discussions WHERE id = ?")
            .bind(discussion_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO discussion_replies (id, discussion_id, user_name, user_initials, content, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(reply.id)
        .bind(discussion_id)
        .bind(&reply.user.name)
        .bind(&reply.user.initials)
        .bind(&reply.content)
        .bind(reply.timestamp)
        .execute(&self.pool)
        .await?;

        self.get_discussion(discussion_id).await
    }

    async fn replies_of(&self, discussion_id: i64) -> AppResult<Vec<Reply>> {
        let rows = sqlx::query(
            "SELECT id, user_name, user_initials, content, timestamp \
             FROM discussion_replies WHERE discussion_id = ? ORDER BY seq ASC",
        )
        .bind(discussion_id)
        .fetch_all(&self.pool)
        .await?;

        let mut replies = Vec::with_capacity(rows.len());
        for row in rows {
            replies.push(Reply {
                id: row.try_get("id")?,
                user: UserIdentity {
                    name: row.try_get("user_name")?,
                    initials: row.try_get("user_initials")?,
                },
                content: row.try_get("content")?,
                timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
            });
        }
        Ok(replies)
    }
}

fn event_from_row(
    row: &SqliteRow,
    liked_by: BTreeSet<String>,
    attending_users: BTreeSet<String>,
) -> AppResult<Event> {
    let id: String = row.try_get("id")?;
    let comments: i64 = row.try_get("comments")?;

    Ok(Event {
        id: EventId::new(id),
        title: row.try_get("title")?,
        date: row.try_get::<NaiveDate, _>("date")?,
        time: row.try_get("time")?,
        end_time: row.try_get("end_time")?,
        location: row.try_get("location")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        organizer: row.try_get("organizer")?,
        image: row.try_get("image")?,
        created_by: row.try_get("created_by")?,
        likes: liked_by.len() as u32,
        liked_by,
        comments: comments.max(0) as u32,
        attendees: attending_users.len() as u32,
        attending_users,
        created_at: Some(row.try_get::<DateTime<Utc>, _>("created_at")?),
    })
}

fn discussion_from_row(row: &SqliteRow) -> AppResult<Discussion> {
    let event_id: String = row.try_get("event_id")?;

    Ok(Discussion {
        id: row.try_get("id")?,
        event_id: EventId::new(event_id),
        user: UserIdentity {
            name: row.try_get("user_name")?,
            initials: row.try_get("user_initials")?,
        },
        content: row.try_get("content")?,
        timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
        replies: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_event(title: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            time: "5:00 PM".to_string(),
            end_time: "7:00 PM".to_string(),
            location: "CULC".to_string(),
            category: "Academic".to_string(),
            description: "Study jam".to_string(),
            organizer: "SGA".to_string(),
            image: String::new(),
            created_by: "owner".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_events() {
        let db = CalendarDatabase::new_in_memory().await.unwrap();
        let created = db.insert_event(new_event("Study Jam")).await.unwrap();

        let events = db.list_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, created.id);
        assert_eq!(events[0].title, "Study Jam");
        assert_eq!(events[0].created_by, "owner");
        assert!(events[0].created_at.is_some());
    }

    #[tokio::test]
    async fn test_toggle_membership_derives_counts_from_set() {
        let db = CalendarDatabase::new_in_memory().await.unwrap();
        let event = db.insert_event(new_event("Study Jam")).await.unwrap();
        let id = event.id.as_str();

        let liked = db.toggle_membership(id, Engagement::Like, "u1", None).await.unwrap().unwrap();
        assert_eq!(liked.likes, 1);
        assert!(liked.liked_by.contains("u1"));

        let liked = db.toggle_membership(id, Engagement::Like, "u2", None).await.unwrap().unwrap();
        assert_eq!(liked.likes, 2);

        let unliked = db.toggle_membership(id, Engagement::Like, "u1", None).await.unwrap().unwrap();
        assert_eq!(unliked.likes, 1);
        assert!(!unliked.liked_by.contains("u1"));

        let attending = db
            .toggle_membership(id, Engagement::Attend, "u3", Some(true))
            .await
            .unwrap()
            .unwrap();
        let attending = db
            .toggle_membership(attending.id.as_str(), Engagement::Attend, "u3", Some(true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attending.attendees, 1);
        assert_eq!(attending.likes, 1);
    }

    #[tokio::test]
    async fn test_missing_event_is_none() {
        let db = CalendarDatabase::new_in_memory().await.unwrap();

        assert!(db.get_event("nope").await.unwrap().is_none());
        assert!(db.increment_comments("nope").await.unwrap().is_none());
        assert!(db
            .toggle_membership("nope", Engagement::Like, "u1", None)
            .await
            .unwrap()
            .is_none());
        assert!(!db.delete_event("nope").await.unwrap());

        let stray: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event_likes")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(stray, 0);
    }

    #[tokio::test]
    async fn test_replies_keep_insertion_order() {
        let db = CalendarDatabase::new_in_memory().await.unwrap();
        let event = db.insert_event(new_event("Study Jam")).await.unwrap();
        let author = UserIdentity::from_name("Caroline Tran");
        let now = Utc::now();

        db.insert_discussion(&Discussion {
            id: 10,
            event_id: event.id.clone(),
            user: author.clone(),
            content: "Who's going?".to_string(),
            timestamp: now,
            replies: Vec::new(),
        })
        .await
        .unwrap();

        for (id, text) in [(30, "me"), (20, "me too"), (40, "same")] {
            db.append_reply(
                10,
                &Reply {
                    id,
                    user: author.clone(),
                    content: text.to_string(),
                    timestamp: now,
                },
            )
            .await
            .unwrap()
            .unwrap();
        }

        let discussions = db.list_discussions(event.id.as_str()).await.unwrap();
        let texts: Vec<&str> = discussions[0].replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(texts, vec!["me", "me too", "same"]);
    }
}
