//! Month-bucketed dashboard figures.
//!
//! Every series covers the last `months` calendar months (UTC), oldest first,
//! including the current month, and is zero-filled. Store failures degrade to
//! empty input rather than errors.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::repo::record::parse_timestamp;
use crate::store::{Direction, Document, DocumentStore, Query, server_timestamp};

pub const MAX_MONTHS: u32 = 60;

/// Whose documents are aggregated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsScope {
    Global,
    Account(String),
}

/// Ownership field per collection for account-scoped figures.
fn owner_field(collection: &str) -> &'static str {
    match collection {
        "files" => "uploadedBy",
        "projectRequests" => "clientId",
        _ => "ownerId",
    }
}

/// Start of the month `months - 1` months before `now`.
pub fn window_start(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let months = months.clamp(1, MAX_MONTHS);
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap_or(now.date_naive());
    first
        .checked_sub_months(Months::new(months - 1))
        .unwrap_or(first)
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// Accumulate `(timestamp, value)` samples into `months` buckets ending with
/// the month of `now`. Samples outside the window are ignored.
pub fn bucket<I>(now: DateTime<Utc>, months: u32, samples: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (DateTime<Utc>, f64)>,
{
    let start = window_start(now, months).date_naive();
    let keys: Vec<NaiveDate> = (0..months.clamp(1, MAX_MONTHS))
        .filter_map(|i| start.checked_add_months(Months::new(i)))
        .collect();

    let mut sums = vec![0.0; keys.len()];
    for (at, value) in samples {
        let key = (at.year(), at.month());
        if let Some(i) = keys.iter().position(|k| (k.year(), k.month()) == key) {
            sums[i] += value;
        }
    }

    keys.iter()
        .zip(sums)
        .map(|(key, sum)| (key.format("%b").to_string(), sum))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenuePoint {
    pub month: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub total_revenue: f64,
    pub total_invoices: u64,
    pub monthly_revenue: Vec<RevenuePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPoint {
    pub month: String,
    pub tasks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGrowth {
    pub total_tasks: u64,
    pub task_growth: Vec<TaskPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadPoint {
    pub month: String,
    pub uploads: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadStats {
    pub file_uploads: Vec<UploadPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatusCounts {
    pub total_projects: u64,
    pub project_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub revenue: MonthlyRevenue,
    pub tasks: TaskGrowth,
    pub files: FileUploadStats,
    pub projects: ProjectStatusCounts,
}

pub struct Analytics {
    store: Arc<dyn DocumentStore>,
    scope: AnalyticsScope,
    now: DateTime<Utc>,
}

impl Analytics {
    pub fn new(store: Arc<dyn DocumentStore>, scope: AnalyticsScope) -> Self {
        Self {
            store,
            scope,
            now: Utc::now(),
        }
    }

    /// Aggregate as if the current time were `now`.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn scoped(&self, collection: &str, query: Query) -> Query {
        match &self.scope {
            AnalyticsScope::Global => query,
            AnalyticsScope::Account(id) => query.where_eq(owner_field(collection), id.clone()),
        }
    }

    /// Documents of `collection` whose `time_field` falls inside the window.
    async fn window(&self, collection: &str, time_field: &str, months: u32, query: Query) -> Vec<Document> {
        let start = server_timestamp(window_start(self.now, months));
        let query = self
            .scoped(collection, query)
            .where_gte(time_field, start)
            .order_by(time_field, Direction::Asc);

        match self.store.query(collection, &query).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!("Error fetching {collection} for analytics: {e}");
                Vec::new()
            }
        }
    }

    pub async fn monthly_revenue(&self, months: u32) -> MonthlyRevenue {
        let query = Query::new().where_eq("status", "paid");
        let documents = self.window("invoices", "createdAt", months, query).await;

        let samples: Vec<(DateTime<Utc>, f64)> = documents
            .iter()
            .filter_map(|doc| {
                let at = parse_timestamp(doc.fields.get("createdAt"))?;
                let amount = doc.fields.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
                Some((at, amount))
            })
            .collect();
        let total_revenue: f64 = samples.iter().map(|(_, amount)| amount).sum();

        MonthlyRevenue {
            total_revenue,
            total_invoices: documents.len() as u64,
            monthly_revenue: bucket(self.now, months, samples)
                .into_iter()
                .map(|(month, revenue)| RevenuePoint { month, revenue })
                .collect(),
        }
    }

    pub async fn monthly_task_completion(&self, months: u32) -> TaskGrowth {
        let query = Query::new().where_eq("status", "done");
        let documents = self.window("tasks", "createdAt", months, query).await;

        TaskGrowth {
            total_tasks: documents.len() as u64,
            task_growth: bucket(self.now, months, counted(&documents, "createdAt"))
                .into_iter()
                .map(|(month, tasks)| TaskPoint {
                    month,
                    tasks: tasks as u64,
                })
                .collect(),
        }
    }

    pub async fn file_upload_stats(&self, months: u32) -> FileUploadStats {
        let documents = self.window("files", "uploadedAt", months, Query::new()).await;

        FileUploadStats {
            file_uploads: bucket(self.now, months, counted(&documents, "uploadedAt"))
                .into_iter()
                .map(|(month, uploads)| UploadPoint {
                    month,
                    uploads: uploads as u64,
                })
                .collect(),
        }
    }

    /// Projects created in the window, counted per status in order of first
    /// appearance.
    pub async fn project_status_counts(&self, months: u32) -> ProjectStatusCounts {
        let documents = self.window("projects", "createdAt", months, Query::new()).await;

        let mut project_status: Vec<StatusCount> = Vec::new();
        for doc in &documents {
            let status = doc
                .fields
                .get("status")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or("unknown");
            match project_status.iter_mut().find(|c| c.status == status) {
                Some(entry) => entry.count += 1,
                None => project_status.push(StatusCount {
                    status: status.to_string(),
                    count: 1,
                }),
            }
        }

        ProjectStatusCounts {
            total_projects: documents.len() as u64,
            project_status,
        }
    }

    pub async fn total_count(&self, collection: &str) -> u64 {
        let result = match &self.scope {
            AnalyticsScope::Global => self.store.count(collection).await,
            AnalyticsScope::Account(_) => self
                .store
                .query(collection, &self.scoped(collection, Query::new()))
                .await
                .map(|documents| documents.len() as u64),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!("Error counting {collection}: {e}");
            0
        })
    }

    /// All four series, fetched concurrently.
    pub async fn overview(&self, months: u32) -> Overview {
        let (revenue, tasks, files, projects) = tokio::join!(
            self.monthly_revenue(months),
            self.monthly_task_completion(months),
            self.file_upload_stats(months),
            self.project_status_counts(months),
        );
        Overview {
            revenue,
            tasks,
            files,
            projects,
        }
    }
}

fn counted<'a>(documents: &'a [Document], field: &'a str) -> impl Iterator<Item = (DateTime<Utc>, f64)> + 'a {
    documents
        .iter()
        .filter_map(move |doc| parse_timestamp(doc.fields.get(field)).map(|at| (at, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn window_starts_at_first_of_month() {
        let start = window_start(at(2024, 3, 15), 6);
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap());
        assert_eq!(
            window_start(at(2024, 3, 15), 1),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn six_buckets_zero_filled_oldest_first() {
        let buckets = bucket(at(2024, 3, 15), 6, Vec::new());
        let labels: Vec<_> = buckets.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(labels, ["Oct", "Nov", "Dec", "Jan", "Feb", "Mar"]);
        assert!(buckets.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn same_month_in_different_years_does_not_collide() {
        let samples = vec![(at(2023, 3, 2), 5.0), (at(2024, 3, 2), 7.0), (at(2024, 1, 9), 1.0)];
        let buckets = bucket(at(2024, 3, 15), 13, samples);
        assert_eq!(buckets.len(), 13);
        assert_eq!(buckets[0], ("Mar".to_string(), 5.0));
        assert_eq!(buckets[10], ("Jan".to_string(), 1.0));
        assert_eq!(buckets[12], ("Mar".to_string(), 7.0));
    }

    #[test]
    fn zero_months_is_treated_as_one() {
        assert_eq!(bucket(at(2024, 3, 15), 0, Vec::new()).len(), 1);
    }
}
