use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ===== Enumerations =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl UserType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(UserType::Student),
            "instructor" => Some(UserType::Instructor),
            "admin" => Some(UserType::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Student => "student",
            UserType::Instructor => "instructor",
            UserType::Admin => "admin",
        }
    }

    /// Whether a profile of this type may own courses.
    pub fn can_teach(&self) -> bool {
        matches!(self, UserType::Instructor | UserType::Admin)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(CourseLevel::Beginner),
            "intermediate" => Some(CourseLevel::Intermediate),
            "advanced" => Some(CourseLevel::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(CourseStatus::Draft),
            "published" => Some(CourseStatus::Published),
            "archived" => Some(CourseStatus::Archived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Published => "published",
            CourseStatus::Archived => "archived",
        }
    }
}

// ===== Canonical records written by the importers =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: Uuid,
    pub category_id: Option<Uuid>,
    pub level: CourseLevel,
    pub status: CourseStatus,
    pub price: f64,
    pub duration_hours: i32,
    pub thumbnail_url: Option<String>,
    pub requirements: Vec<String>,
    pub what_you_learn: Vec<String>,
}

/// Lesson as submitted to the store; `order_index` is resolved by the store
/// when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonRecord {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub order_index: Option<i32>,
    pub is_free: bool,
}

/// Identity plus profile for a new account.
#[derive(Debug, Clone)]
pub struct NewUserAccount {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub user_type: UserType,
    pub bio: Option<String>,
    pub metadata: Value,
}

// ===== Accounts =====

/// Account projection used for authentication and authorization.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    /// `None` when the identity has no profile row.
    pub user_type: Option<UserType>,
    pub token_version: i32,
    pub disabled: bool,
    pub password_hash: Option<String>,
}
