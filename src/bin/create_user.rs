use std::io::{self, Write};

use clap::Parser;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;

use campus_api::auth::passwords::PasswordService;
use campus_api::models::{NewUserAccount, UserType};
use campus_api::store::{CampusStore, PgStore};

#[derive(Parser, Debug)]
#[command(name = "create_user", about = "Create a local campus account")]
struct Args {
    /// Email address for the account (case insensitive).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this user.
    #[arg(long)]
    password: String,

    #[arg(long)]
    full_name: Option<String>,

    /// `student`, `instructor` or `admin`.
    #[arg(long, default_value = "admin")]
    user_type: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let email = args.email.trim().to_lowercase();

    if !email.contains('@') {
        writeln!(io::stderr(), "error: email must contain '@'")?;
        std::process::exit(1);
    }

    let Some(user_type) = UserType::parse(&args.user_type) else {
        writeln!(
            io::stderr(),
            "error: unsupported user type '{}'. Use student, instructor or admin.",
            args.user_type
        )?;
        std::process::exit(1);
    };

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    let store = PgStore::new(pool);

    let password_service = PasswordService::new()
        .map_err(|err| io::Error::other(format!("argon2 init failed: {err}")))?;
    let password_hash = password_service
        .hash_password(&args.password)
        .map_err(|err| io::Error::other(format!("password hash failed: {err}")))?;

    let account = NewUserAccount {
        email: email.clone(),
        password_hash,
        metadata: json!({ "full_name": args.full_name }),
        full_name: args.full_name,
        user_type,
        bio: None,
    };

    match store.create_user_account(&account).await {
        Ok(user_id) => {
            println!("Created {} user '{email}' with id {user_id}", user_type.as_str());
            Ok(())
        }
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(1);
        }
    }
}
