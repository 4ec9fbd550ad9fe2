use chrono::{DateTime, Utc};
use core_types::{NewReview, Review, Ride, User};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::postgres::PgConnection;
use uuid::Uuid;

use super::rides::RideRow;
use super::users::UserRow;
use crate::error::DbError;

const REVIEW_COLUMNS: &str = "id, ride_id, reviewer_id, reviewee_id, rating, comment, created_at";

#[derive(Debug, Clone, FromRow)]
struct ReviewRow {
    id: Uuid,
    ride_id: Uuid,
    reviewer_id: Uuid,
    reviewee_id: Uuid,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            ride_id: row.ride_id,
            reviewer_id: row.reviewer_id,
            reviewee_id: row.reviewee_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// Aggregate of the reviews a user has received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RatingSummary {
    pub count: i64,
    /// Mean rating rounded to two places; `None` when there are no reviews.
    pub average: Option<Decimal>,
}

pub struct ReviewRepository;

impl ReviewRepository {
    /// Inserts a review. A second review by the same reviewer of the same
    /// reviewee for the same ride fails with [`DbError::UniqueViolation`]
    /// (`unique_review_per_ride_pair`); a rating outside 1..=5 fails with
    /// [`DbError::CheckViolation`] (`check_rating_range`).
    pub async fn create(conn: &mut PgConnection, review: &NewReview) -> Result<Review, DbError> {
        let sql = format!(
            "INSERT INTO reviews (ride_id, reviewer_id, reviewee_id, rating, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(review.ride_id)
            .bind(review.reviewer_id)
            .bind(review.reviewee_id)
            .bind(review.rating)
            .bind(review.comment.as_deref())
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(review_id = %row.id, ride_id = %row.ride_id, rating = row.rating, "Review created.");
        Ok(row.into())
    }

    pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Option<Review>, DbError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(Review::from))
    }

    /// Every review left about a ride, oldest first.
    pub async fn get_reviews_for_ride(
        conn: &mut PgConnection,
        ride_id: Uuid,
    ) -> Result<Vec<Review>, DbError> {
        Self::list_where(conn, "ride_id", ride_id, "created_at ASC, id ASC").await
    }

    /// The ride a review is about, or `None` if the review does not exist.
    pub async fn get_ride_for_review(
        conn: &mut PgConnection,
        review_id: Uuid,
    ) -> Result<Option<Ride>, DbError> {
        let row = sqlx::query_as::<_, RideRow>(
            "SELECT r.id, r.driver_id, r.origin, r.destination, r.departure_time,
                    r.seats_total, r.price_share, r.created_at
             FROM rides AS r
             JOIN reviews AS v ON v.ride_id = r.id
             WHERE v.id = $1",
        )
        .bind(review_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Ride::from))
    }

    /// The author of a review.
    pub async fn get_reviewer(conn: &mut PgConnection, review_id: Uuid) -> Result<Option<User>, DbError> {
        Self::user_by_role(conn, "reviewer_id", review_id).await
    }

    /// The user a review is about.
    pub async fn get_reviewee(conn: &mut PgConnection, review_id: Uuid) -> Result<Option<User>, DbError> {
        Self::user_by_role(conn, "reviewee_id", review_id).await
    }

    /// Reviews about `reviewee_id`, newest first.
    pub async fn list_received(
        conn: &mut PgConnection,
        reviewee_id: Uuid,
    ) -> Result<Vec<Review>, DbError> {
        Self::list_where(conn, "reviewee_id", reviewee_id, "created_at DESC, id ASC").await
    }

    /// Reviews written by `reviewer_id`, newest first.
    pub async fn list_written(
        conn: &mut PgConnection,
        reviewer_id: Uuid,
    ) -> Result<Vec<Review>, DbError> {
        Self::list_where(conn, "reviewer_id", reviewer_id, "created_at DESC, id ASC").await
    }

    pub async fn rating_summary(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<RatingSummary, DbError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            "SELECT COUNT(*) AS count, ROUND(AVG(rating), 2) AS average
             FROM reviews
             WHERE reviewee_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(summary)
    }

    // `role` is one of the two user columns, fixed by the callers above.
    async fn user_by_role(
        conn: &mut PgConnection,
        role: &'static str,
        review_id: Uuid,
    ) -> Result<Option<User>, DbError> {
        let sql = format!(
            "SELECT u.id, u.email, u.full_name, u.created_at
             FROM users AS u
             JOIN reviews AS v ON v.{role} = u.id
             WHERE v.id = $1"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(review_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(User::from))
    }

    // `column` and `order` are fixed by the callers above, never user input.
    async fn list_where(
        conn: &mut PgConnection,
        column: &'static str,
        id: Uuid,
        order: &'static str,
    ) -> Result<Vec<Review>, DbError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE {column} = $1 ORDER BY {order}");
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }
}
