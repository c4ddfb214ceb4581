use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_catalog::config::AppConfig;
use course_catalog::db::{self, CourseRepository, DEFAULT_TOP_RATED_LIMIT};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "course_catalog=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let courses = CourseRepository::new(pool);

    let total = courses.count().await?;
    let recent = courses.count_created_last_30_days().await?;
    info!("catalog has {} courses, {} added in the last 30 days", total, recent);

    let categories = courses.list_categories().await?;
    info!(
        "categories: {}",
        categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    for entry in courses.top_rated(DEFAULT_TOP_RATED_LIMIT).await? {
        match entry.avg_rating {
            Some(rating) => info!("top rated: {} ({:.1})", entry.course.title, rating),
            None => info!("top rated: {} (no reviews)", entry.course.title),
        }
    }

    Ok(())
}
