//! Reviews cleaner

use super::Cleaned;
use super::normalize::{clean_text, keep_last_by, non_empty, parse_i64, parse_timestamp};
use crate::models::{RawReview, SilverReview};

/// Clean raw reviews
///
/// Rows are ordered by answer timestamp (stable, missing last). The latest
/// review per review id is kept, then the latest review per order id, so
/// every order has at most one review. Scores outside 1..=5 become missing.
pub fn clean_reviews(raw: Vec<RawReview>) -> Cleaned<SilverReview> {
    let total = raw.len();
    let mut rows: Vec<SilverReview> = raw.into_iter().filter_map(clean_review).collect();
    let rejected = total - rows.len();

    rows.sort_by(|a, b| match (a.review_answer_timestamp, b.review_answer_timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    let rows = keep_last_by(rows, |r| r.review_id.clone());
    let rows = keep_last_by(rows, |r| r.order_id.clone());

    Cleaned { rows, rejected }
}

fn clean_review(raw: RawReview) -> Option<SilverReview> {
    Some(SilverReview {
        review_id: non_empty(raw.review_id.as_deref())?.to_string(),
        order_id: non_empty(raw.order_id.as_deref())?.to_string(),
        review_score: parse_i64(raw.review_score.as_deref()).filter(|s| (1..=5).contains(s)),
        review_comment_title: clean_text(raw.review_comment_title.as_deref()),
        review_comment_message: clean_text(raw.review_comment_message.as_deref()),
        review_creation_date: parse_timestamp(raw.review_creation_date.as_deref()),
        review_answer_timestamp: parse_timestamp(raw.review_answer_timestamp.as_deref()),
    })
}
