//! In-process store with the same constraint behaviour as the Postgres schema.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    Account, CategoryRecord, CourseRecord, LessonRecord, NewUserAccount, UserType,
};
use crate::store::{
    CampusStore, LessonWrite, StoreError, StoreResult, WriteMode, order_index_exhausted,
};

#[derive(Debug, Clone)]
pub struct StoredLesson {
    pub record: LessonRecord,
    pub order_index: i32,
}

#[derive(Debug, Clone)]
struct StoredIdentity {
    email: String,
    metadata: Value,
    password_hash: Option<String>,
    token_version: i32,
    disabled: bool,
}

#[derive(Debug, Clone)]
pub struct StoredProfile {
    pub email: String,
    pub full_name: Option<String>,
    pub user_type: UserType,
    pub bio: Option<String>,
}

#[derive(Default)]
struct Tables {
    categories: Vec<CategoryRecord>,
    courses: Vec<CourseRecord>,
    lessons: Vec<StoredLesson>,
    identities: HashMap<Uuid, StoredIdentity>,
    profiles: HashMap<Uuid, StoredProfile>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    /// Seed an account with a profile. Returns the new identity id.
    pub async fn insert_account(
        &self,
        email: &str,
        password_hash: Option<String>,
        user_type: UserType,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let mut tables = self.tables.lock().await;
        tables.identities.insert(
            id,
            StoredIdentity {
                email: email.to_string(),
                metadata: Value::Null,
                password_hash,
                token_version: 0,
                disabled: false,
            },
        );
        tables.profiles.insert(
            id,
            StoredProfile {
                email: email.to_string(),
                full_name: None,
                user_type,
                bio: None,
            },
        );
        id
    }

    pub async fn disable_account(&self, id: Uuid) {
        if let Some(identity) = self.tables.lock().await.identities.get_mut(&id) {
            identity.disabled = true;
        }
    }

    pub async fn categories(&self) -> Vec<CategoryRecord> {
        self.tables.lock().await.categories.clone()
    }

    pub async fn courses(&self) -> Vec<CourseRecord> {
        self.tables.lock().await.courses.clone()
    }

    pub async fn lessons(&self) -> Vec<StoredLesson> {
        self.tables.lock().await.lessons.clone()
    }

    pub async fn profile(&self, id: Uuid) -> Option<StoredProfile> {
        self.tables.lock().await.profiles.get(&id).cloned()
    }

    pub async fn identity_metadata(&self, id: Uuid) -> Option<Value> {
        self.tables
            .lock()
            .await
            .identities
            .get(&id)
            .map(|identity| identity.metadata.clone())
    }

    pub async fn account_id_by_email(&self, email: &str) -> Option<Uuid> {
        self.tables
            .lock()
            .await
            .identities
            .iter()
            .find(|(_, identity)| identity.email.eq_ignore_ascii_case(email))
            .map(|(id, _)| *id)
    }
}

impl Tables {
    fn account(&self, id: Uuid) -> Option<Account> {
        let identity = self.identities.get(&id)?;
        let profile = self.profiles.get(&id);
        Some(Account {
            id,
            email: identity.email.clone(),
            full_name: profile.and_then(|p| p.full_name.clone()),
            user_type: profile.map(|p| p.user_type),
            token_version: identity.token_version,
            disabled: identity.disabled,
            password_hash: identity.password_hash.clone(),
        })
    }
}

fn upsert_by_id<T>(
    rows: &mut Vec<T>,
    item: T,
    id_of: impl Fn(&T) -> Uuid,
    mode: WriteMode,
) -> StoreResult<()> {
    let id = id_of(&item);
    match (rows.iter().position(|existing| id_of(existing) == id), mode) {
        (Some(position), WriteMode::Upsert) => rows[position] = item,
        (Some(_), WriteMode::Insert) => {
            return Err(StoreError::Rejected(
                "duplicate value violates unique constraint pkey".to_string(),
            ));
        }
        (None, _) => rows.push(item),
    }
    Ok(())
}

#[rocket::async_trait]
impl CampusStore for MemoryStore {
    async fn find_account(&self, user_id: Uuid) -> StoreResult<Option<Account>> {
        self.check_available()?;
        Ok(self.tables.lock().await.account(user_id))
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let id = tables
            .identities
            .iter()
            .find(|(_, identity)| identity.email.eq_ignore_ascii_case(email))
            .map(|(id, _)| *id);
        Ok(id.and_then(|id| tables.account(id)))
    }

    async fn category_exists(&self, id: Uuid) -> StoreResult<bool> {
        self.check_available()?;
        Ok(self.tables.lock().await.categories.iter().any(|c| c.id == id))
    }

    async fn course_exists(&self, id: Uuid) -> StoreResult<bool> {
        self.check_available()?;
        Ok(self.tables.lock().await.courses.iter().any(|c| c.id == id))
    }

    async fn profile_type(&self, id: Uuid) -> StoreResult<Option<UserType>> {
        self.check_available()?;
        Ok(self.tables.lock().await.profiles.get(&id).map(|p| p.user_type))
    }

    async fn write_category(&self, record: &CategoryRecord, mode: WriteMode) -> StoreResult<Uuid> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        upsert_by_id(&mut tables.categories, record.clone(), |c| c.id, mode)?;
        Ok(record.id)
    }

    async fn write_course(&self, record: &CourseRecord, mode: WriteMode) -> StoreResult<Uuid> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        if !tables.profiles.contains_key(&record.instructor_id) {
            return Err(StoreError::Rejected(
                "referenced record does not exist (courses_instructor_id_fkey)".to_string(),
            ));
        }
        if let Some(category_id) = record.category_id {
            if !tables.categories.iter().any(|c| c.id == category_id) {
                return Err(StoreError::Rejected(
                    "referenced record does not exist (courses_category_id_fkey)".to_string(),
                ));
            }
        }
        upsert_by_id(&mut tables.courses, record.clone(), |c| c.id, mode)?;
        Ok(record.id)
    }

    async fn write_lesson(&self, record: &LessonRecord, mode: WriteMode) -> StoreResult<LessonWrite> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        if !tables.courses.iter().any(|c| c.id == record.course_id) {
            return Err(StoreError::Rejected(format!(
                "course {} does not exist",
                record.course_id
            )));
        }

        let next_index = tables
            .lessons
            .iter()
            .filter(|lesson| lesson.record.course_id == record.course_id)
            .map(|lesson| lesson.order_index)
            .max()
            .unwrap_or(0)
            .checked_add(1);

        let position = tables
            .lessons
            .iter()
            .position(|lesson| lesson.record.id == record.id);

        let order_index = match (position, mode) {
            (Some(position), WriteMode::Upsert) => {
                let stored = &tables.lessons[position];
                // The stored index only means something within its own course.
                let kept = (stored.record.course_id == record.course_id)
                    .then_some(stored.order_index);
                let order_index = record
                    .order_index
                    .or(kept)
                    .or(next_index)
                    .ok_or_else(order_index_exhausted)?;
                tables.lessons[position] = StoredLesson {
                    record: record.clone(),
                    order_index,
                };
                order_index
            }
            (Some(_), WriteMode::Insert) => {
                return Err(StoreError::Rejected(
                    "duplicate value violates unique constraint lessons_pkey".to_string(),
                ));
            }
            (None, _) => {
                let order_index = record
                    .order_index
                    .or(next_index)
                    .ok_or_else(order_index_exhausted)?;
                tables.lessons.push(StoredLesson {
                    record: record.clone(),
                    order_index,
                });
                order_index
            }
        };

        Ok(LessonWrite {
            id: record.id,
            order_index,
        })
    }

    async fn create_user_account(&self, account: &NewUserAccount) -> StoreResult<Uuid> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        if tables
            .identities
            .values()
            .any(|identity| identity.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(StoreError::Rejected(format!(
                "a user with email '{}' already exists",
                account.email
            )));
        }

        let id = Uuid::new_v4();
        tables.identities.insert(
            id,
            StoredIdentity {
                email: account.email.clone(),
                metadata: account.metadata.clone(),
                password_hash: Some(account.password_hash.clone()),
                token_version: 0,
                disabled: false,
            },
        );
        tables.profiles.insert(
            id,
            StoredProfile {
                email: account.email.clone(),
                full_name: account.full_name.clone(),
                user_type: account.user_type,
                bio: account.bio.clone(),
            },
        );
        Ok(id)
    }
}
