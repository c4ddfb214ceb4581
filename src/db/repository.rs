use chrono::{Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, error, info, warn};

use crate::db::format_timestamp;
use crate::error::{AppError, AppResult};
use crate::models::{
    ActiveEnrollment, Category, Course, CourseFilter, NewCourseRequest, ReviewWithAuthor,
    TopRatedCourse,
};

pub const DEFAULT_TOP_RATED_LIMIT: i64 = 3;

const RECENT_WINDOW_DAYS: i64 = 30;

const COURSE_SELECT: &str = r#"
    SELECT
        c.id,
        c.title,
        c.description,
        c.category_id,
        cat.name AS category,
        c.duration,
        c.price,
        c.image_url,
        c.created_at
    FROM courses c
    JOIN categories cat ON c.category_id = cat.id
"#;

/// Course catalog queries over a shared pool.
#[derive(Clone)]
pub struct CourseRepository {
    db: SqlitePool,
}

impl CourseRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    pub async fn category_id_by_name(&self, name: &str) -> AppResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;
        Ok(id)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name ASC")
                .fetch_all(&self.db)
                .await?;
        Ok(categories)
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!("{COURSE_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(course)
    }

    /// Titles are only unique per category, so this returns the oldest match.
    pub async fn find_by_title(&self, title: &str) -> AppResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "{COURSE_SELECT} WHERE c.title = ? ORDER BY c.id ASC LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(&self.db)
        .await?;
        Ok(course)
    }

    pub async fn list_all(&self) -> AppResult<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(&format!(
            "{COURSE_SELECT} ORDER BY c.created_at DESC, c.id DESC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(courses)
    }

    pub async fn list_filtered(&self, filter: &CourseFilter) -> AppResult<Vec<Course>> {
        let mut query = QueryBuilder::<Sqlite>::new(COURSE_SELECT);
        let mut conditions = 0usize;

        if let Some(name) = filter.category.as_deref().filter(|n| !n.is_empty()) {
            match self.category_id_by_name(name).await? {
                Some(category_id) => {
                    push_condition(&mut query, &mut conditions, "c.category_id = ");
                    query.push_bind(category_id);
                }
                None => debug!("unknown category {:?} in filter, ignoring it", name),
            }
        }
        if let Some(min_price) = filter.min_price {
            push_condition(&mut query, &mut conditions, "c.price >= ");
            query.push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            push_condition(&mut query, &mut conditions, "c.price <= ");
            query.push_bind(max_price);
        }
        if let Some(max_duration) = filter.max_duration {
            push_condition(&mut query, &mut conditions, "c.duration <= ");
            query.push_bind(max_duration);
        }

        query.push(" ORDER BY c.created_at DESC, c.id DESC");
        debug!("filtered course query: {}", query.sql());

        let courses = query
            .build_query_as::<Course>()
            .fetch_all(&self.db)
            .await?;
        Ok(courses)
    }

    /// Courses by average review rating. Unrated courses sort last.
    pub async fn top_rated(&self, limit: i64) -> AppResult<Vec<TopRatedCourse>> {
        if limit < 0 {
            return Err(AppError::validation(vec![
                "Limit must not be negative".to_string(),
            ]));
        }

        let courses = sqlx::query_as::<_, TopRatedCourse>(
            r#"
            SELECT
                c.id,
                c.title,
                c.description,
                c.category_id,
                cat.name AS category,
                c.duration,
                c.price,
                c.image_url,
                c.created_at,
                AVG(r.rating) AS avg_rating
            FROM courses c
            JOIN categories cat ON c.category_id = cat.id
            LEFT JOIN reviews r ON c.id = r.course_id
            GROUP BY c.id
            ORDER BY avg_rating DESC, c.id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(courses)
    }

    pub async fn reviews_for(&self, course_id: i64) -> AppResult<Vec<ReviewWithAuthor>> {
        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            r#"
            SELECT
                r.id,
                r.course_id,
                r.user_id,
                r.rating,
                r.comment,
                r.created_at,
                u.first_name,
                u.last_name
            FROM reviews r
            JOIN users u ON r.user_id = u.id
            WHERE r.course_id = ?
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;
        Ok(reviews)
    }

    pub async fn active_courses_for_user(&self, user_id: i64) -> AppResult<Vec<ActiveEnrollment>> {
        let enrollments = sqlx::query_as::<_, ActiveEnrollment>(
            r#"
            SELECT uc.progress, c.title, c.description, c.image_url
            FROM user_courses uc
            JOIN courses c ON uc.course_id = c.id
            WHERE uc.user_id = ? AND uc.is_completed = 0
            ORDER BY uc.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .inspect_err(|e| error!("failed to fetch active courses for user {}: {}", user_id, e))?;
        Ok(enrollments)
    }

    pub async fn create(&self, req: NewCourseRequest) -> AppResult<Course> {
        let category_id = self.validate(&req).await?;

        if self.find_by_title(&req.title).await?.is_some() {
            warn!("rejected duplicate course title {:?}", req.title);
            return Err(AppError::Conflict(
                "Course with this title already exists".to_string(),
            ));
        }

        let created_at = format_timestamp(Utc::now());
        let id = sqlx::query(
            r#"
            INSERT INTO courses
                (title, description, category_id, duration, price, image_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(category_id)
        .bind(req.duration)
        .bind(req.price)
        .bind(req.image_url())
        .bind(&created_at)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        info!("created course {} ({:?})", id, req.title);

        Ok(self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)?)
    }

    /// Replaces a course's fields. The stored image is kept unless a new one is given.
    pub async fn update(&self, id: i64, req: NewCourseRequest) -> AppResult<Course> {
        let category_id = self.validate(&req).await?;

        if self.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("Course not found".to_string()));
        }

        let clash = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM courses WHERE title = ? AND category_id = ? AND id != ? LIMIT 1",
        )
        .bind(&req.title)
        .bind(category_id)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        if let Some(other) = clash {
            warn!("course {} title {:?} clashes with course {}", id, req.title, other);
            return Err(AppError::Conflict(
                "Course with this title already exists in this category".to_string(),
            ));
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE courses SET ");
        {
            let mut set = query.separated(", ");
            set.push("title = ").push_bind_unseparated(req.title.as_str());
            set.push("description = ").push_bind_unseparated(req.description.as_str());
            set.push("category_id = ").push_bind_unseparated(category_id);
            set.push("duration = ").push_bind_unseparated(req.duration);
            set.push("price = ").push_bind_unseparated(req.price);
            if let Some(image_url) = req.image_url() {
                set.push("image_url = ").push_bind_unseparated(image_url);
            }
        }
        query.push(" WHERE id = ").push_bind(id);
        debug!("course update query: {}", query.sql());

        query.build().execute(&self.db).await?;
        info!("updated course {}", id);

        Ok(self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)?)
    }

    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let removed = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if removed > 0 {
            info!("deleted course {}", id);
        }
        Ok(removed > 0)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn count_created_last_30_days(&self) -> AppResult<i64> {
        let since = format_timestamp(Utc::now() - Duration::days(RECENT_WINDOW_DAYS));
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses WHERE created_at >= ?")
                .bind(since)
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    /// Runs field checks and resolves the category, reporting all problems at once.
    async fn validate(&self, req: &NewCourseRequest) -> AppResult<i64> {
        let mut errors = req.field_errors();

        let category_id = self.category_id_by_name(&req.category).await?;
        if category_id.is_none() {
            errors.push("Invalid category selected".to_string());
        }

        match category_id {
            Some(category_id) if errors.is_empty() => Ok(category_id),
            _ => {
                warn!("rejected course payload: {}", errors.join(", "));
                Err(AppError::validation(errors))
            }
        }
    }
}

fn push_condition(query: &mut QueryBuilder<'_, Sqlite>, conditions: &mut usize, clause: &str) {
    query.push(if *conditions == 0 { " WHERE " } else { " AND " });
    query.push(clause);
    *conditions += 1;
}
