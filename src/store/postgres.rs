//! PostgreSQL implementation of [`CampusStore`].

use rocket_db_pools::sqlx::{self, PgPool, Row, postgres::PgRow};
use serde_json::json;
use uuid::Uuid;

use crate::models::{
    Account, CategoryRecord, CourseRecord, LessonRecord, NewUserAccount, UserType,
};
use crate::store::{
    CampusStore, LessonWrite, StoreError, StoreResult, WriteMode, order_index_exhausted,
};

const ACCOUNT_COLUMNS: &str = r#"
    u.id, u.email, u.token_version, u.disabled,
    p.full_name, p.user_type, cred.password_hash
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    let user_type: Option<String> = row.try_get("user_type")?;
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        user_type: user_type.as_deref().and_then(UserType::parse),
        token_version: row.try_get("token_version")?,
        disabled: row.try_get("disabled")?,
        password_hash: row.try_get("password_hash")?,
    })
}

#[rocket::async_trait]
impl CampusStore for PgStore {
    async fn find_account(&self, user_id: Uuid) -> StoreResult<Option<Account>> {
        let sql = format!(
            r#"SELECT {ACCOUNT_COLUMNS}
               FROM users u
               LEFT JOIN profiles p ON p.id = u.id
               LEFT JOIN local_user_credentials cred ON cred.user_id = u.id
               WHERE u.id = $1"#
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose().map_err(StoreError::from)
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let sql = format!(
            r#"SELECT {ACCOUNT_COLUMNS}
               FROM users u
               LEFT JOIN profiles p ON p.id = u.id
               LEFT JOIN local_user_credentials cred ON cred.user_id = u.id
               WHERE lower(u.email) = lower($1)"#
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose().map_err(StoreError::from)
    }

    async fn category_exists(&self, id: Uuid) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn course_exists(&self, id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn profile_type(&self, id: Uuid) -> StoreResult<Option<UserType>> {
        let user_type: Option<String> =
            sqlx::query_scalar("SELECT user_type FROM profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user_type.as_deref().and_then(UserType::parse))
    }

    async fn write_category(&self, record: &CategoryRecord, mode: WriteMode) -> StoreResult<Uuid> {
        let sql = match mode {
            WriteMode::Insert => {
                r#"INSERT INTO categories (id, name, description, icon, color)
                   VALUES ($1, $2, $3, $4, $5)
                   RETURNING id"#
            }
            WriteMode::Upsert => {
                r#"INSERT INTO categories (id, name, description, icon, color)
                   VALUES ($1, $2, $3, $4, $5)
                   ON CONFLICT (id) DO UPDATE SET
                       name = EXCLUDED.name,
                       description = EXCLUDED.description,
                       icon = EXCLUDED.icon,
                       color = EXCLUDED.color
                   RETURNING id"#
            }
        };

        let id: Uuid = sqlx::query_scalar(sql)
            .bind(record.id)
            .bind(&record.name)
            .bind(&record.description)
            .bind(&record.icon)
            .bind(&record.color)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn write_course(&self, record: &CourseRecord, mode: WriteMode) -> StoreResult<Uuid> {
        let insert = r#"INSERT INTO courses (
                id, title, description, instructor_id, category_id, level, status,
                price, duration_hours, thumbnail_url, requirements, what_you_learn
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#;
        let sql = match mode {
            WriteMode::Insert => format!("{insert} RETURNING id"),
            WriteMode::Upsert => format!(
                r#"{insert}
                ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    instructor_id = EXCLUDED.instructor_id,
                    category_id = EXCLUDED.category_id,
                    level = EXCLUDED.level,
                    status = EXCLUDED.status,
                    price = EXCLUDED.price,
                    duration_hours = EXCLUDED.duration_hours,
                    thumbnail_url = EXCLUDED.thumbnail_url,
                    requirements = EXCLUDED.requirements,
                    what_you_learn = EXCLUDED.what_you_learn,
                    updated_at = NOW()
                RETURNING id"#
            ),
        };

        let id: Uuid = sqlx::query_scalar(&sql)
            .bind(record.id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(record.instructor_id)
            .bind(record.category_id)
            .bind(record.level.as_str())
            .bind(record.status.as_str())
            .bind(record.price)
            .bind(record.duration_hours)
            .bind(&record.thumbnail_url)
            .bind(json!(record.requirements))
            .bind(json!(record.what_you_learn))
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn write_lesson(&self, record: &LessonRecord, mode: WriteMode) -> StoreResult<LessonWrite> {
        let mut tx = self.pool.begin().await?;

        // Serializes index assignment per course for the rest of the transaction.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
                .bind(record.course_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::Rejected(format!(
                "course {} does not exist",
                record.course_id
            )));
        }

        let next_index: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(order_index), 0)::BIGINT + 1 FROM lessons WHERE course_id = $1",
        )
        .bind(record.course_id)
        .fetch_one(&mut *tx)
        .await?;
        let next_index = i32::try_from(next_index).ok();
        if record.order_index.is_none() && next_index.is_none() && mode == WriteMode::Insert {
            return Err(order_index_exhausted());
        }

        let insert = r#"INSERT INTO lessons (
                id, course_id, title, description, content, video_url,
                duration_minutes, order_index, is_free
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#;
        let sql = match mode {
            WriteMode::Insert => format!("{insert} RETURNING id, order_index"),
            WriteMode::Upsert => format!(
                r#"{insert}
                ON CONFLICT (id) DO UPDATE SET
                    course_id = EXCLUDED.course_id,
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    content = EXCLUDED.content,
                    video_url = EXCLUDED.video_url,
                    duration_minutes = EXCLUDED.duration_minutes,
                    order_index = CASE
                        WHEN $10 OR lessons.course_id <> EXCLUDED.course_id THEN EXCLUDED.order_index
                        ELSE lessons.order_index
                    END,
                    is_free = EXCLUDED.is_free,
                    updated_at = NOW()
                RETURNING id, order_index"#
            ),
        };

        let mut query = sqlx::query(&sql)
            .bind(record.id)
            .bind(record.course_id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.content)
            .bind(&record.video_url)
            .bind(record.duration_minutes)
            .bind(record.order_index.or(next_index))
            .bind(record.is_free);
        if mode == WriteMode::Upsert {
            query = query.bind(record.order_index.is_some());
        }

        let row = query.fetch_one(&mut *tx).await?;
        let written = LessonWrite {
            id: row.try_get("id")?,
            order_index: row.try_get("order_index")?,
        };

        tx.commit().await?;
        Ok(written)
    }

    async fn create_user_account(&self, account: &NewUserAccount) -> StoreResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))")
                .bind(&account.email)
                .fetch_one(&mut *tx)
                .await?;
        if taken {
            return Err(StoreError::Rejected(format!(
                "a user with email '{}' already exists",
                account.email
            )));
        }

        let user_id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO users (id, email, raw_user_meta, email_confirmed_at)
               VALUES ($1, $2, $3, NOW())
               RETURNING id"#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.metadata)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO local_user_credentials (user_id, password_hash) VALUES ($1, $2)")
            .bind(user_id)
            .bind(&account.password_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO profiles (id, email, full_name, user_type, bio)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE SET
                   email = EXCLUDED.email,
                   full_name = EXCLUDED.full_name,
                   user_type = EXCLUDED.user_type,
                   bio = EXCLUDED.bio,
                   updated_at = NOW()"#,
        )
        .bind(user_id)
        .bind(&account.email)
        .bind(&account.full_name)
        .bind(account.user_type.as_str())
        .bind(&account.bio)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user_id)
    }
}
