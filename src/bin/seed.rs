//! Reset the database and fill it with sample books, users and a loan
//!
//! Run with `cargo run --bin seed`.

use anyhow::Context;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;

use library_api::{
    config::AppConfig,
    models::{CreateBook, CreateLoan},
    repository::Repository,
    services::users::hash_password,
};

const BOOKS: [(&str, &str, i32, &str); 4] = [
    ("المقدمة", "ابن خلدون", 1377, "978-9-876-54321-0"),
    ("قواعد العشق الأربعون", "إليف شافاق", 2009, "978-0-123-45678-9"),
    ("الهويات القاتلة", "أمين معلوف", 2018, "978-9-876-54421-0"),
    ("Atomic Habits", "James Clear", 2018, "978-0-525-57499-3"),
];

const USERS: [(&str, &str, &str); 3] = [
    ("محمد أحمد", "mohamed.ahmed@example.com", "password123"),
    ("فاطمة علي", "fatima.ali@example.com", "securepassword"),
    ("Omar Ali", "omar.ali@example.com", "password123"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let repository = Repository::new(pool);

    tracing::info!("Seeding database...");
    repository.reset().await?;

    let mut books = Vec::with_capacity(BOOKS.len());
    for (title, author, year, isbn) in BOOKS {
        let book = CreateBook {
            title: title.to_string(),
            author: author.to_string(),
            year,
            isbn: isbn.to_string(),
        };
        books.push(repository.books.create(&book).await?);
    }

    let mut users = Vec::with_capacity(USERS.len());
    for (name, email, password) in USERS {
        let password_hash = hash_password(password)?;
        users.push(repository.users.create(name, email, &password_hash).await?);
    }

    let now = Utc::now();
    let loan = CreateLoan {
        user: users[0].id,
        book: books[1].id,
        borrow_date: Some(now),
        return_date: now + Duration::days(7),
    };
    repository.loans.create(&loan).await?;

    tracing::info!(
        books = books.len(),
        users = users.len(),
        loans = 1,
        "Data seeded successfully"
    );
    Ok(())
}
