//! Read-side queries over the edition registry. No caching: every call hits
//! SQLite, and the store is never contacted.

use super::{
    ServiceError, ServiceResult,
    edition_registry::{EditionOrder, EditionRegistry},
};
use crate::models::{
    edition::Edition,
    media::{YearMonth, parse_edition_date},
    page::{Page, PageRequest},
};
use chrono::{Local, NaiveDate};

#[derive(Clone)]
pub struct RetrievalService {
    registry: EditionRegistry,
}

impl RetrievalService {
    pub fn new(registry: EditionRegistry) -> Self {
        Self { registry }
    }

    /// Edition for the server's current local calendar date.
    pub async fn today(&self) -> ServiceResult<Edition> {
        self.on(Local::now().date_naive()).await
    }

    pub async fn by_date(&self, raw_date: &str) -> ServiceResult<Edition> {
        self.on(parse_edition_date(raw_date)?).await
    }

    async fn on(&self, date: NaiveDate) -> ServiceResult<Edition> {
        self.registry
            .find_by_date(date)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("no edition published for {date}")))
    }

    /// Most recently first-published edition, independent of its date.
    pub async fn latest(&self) -> ServiceResult<Edition> {
        self.registry
            .find_latest()
            .await?
            .ok_or_else(|| ServiceError::NotFound("no editions published yet".into()))
    }

    /// Editions within a `YYYY-MM` month, newest date first. May be empty.
    pub async fn by_month(&self, raw_month: &str) -> ServiceResult<Vec<Edition>> {
        let month = YearMonth::parse(raw_month)?;
        Ok(self.registry.list_by_month(month).await?)
    }

    /// Reader archive, newest date first.
    pub async fn list_all(&self, page: u32, page_size: u32) -> ServiceResult<Page<Edition>> {
        self.paged(EditionOrder::DateDesc, page, page_size).await
    }

    /// Admin upload history, most recently first-published first.
    pub async fn history(&self, page: u32, page_size: u32) -> ServiceResult<Page<Edition>> {
        self.paged(EditionOrder::UploadedDesc, page, page_size).await
    }

    async fn paged(
        &self,
        order: EditionOrder,
        page: u32,
        page_size: u32,
    ) -> ServiceResult<Page<Edition>> {
        let request = PageRequest::new(page, page_size)?;
        let total = self.registry.count().await?;
        let items = self
            .registry
            .list_page(order, request.offset(), request.limit())
            .await?;
        Ok(Page::new(items, total, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_pool,
        models::{edition::EditionFields, media::MediaType},
    };
    use std::{collections::HashSet, sync::Arc};

    async fn seeded(dates: &[&str]) -> RetrievalService {
        let registry = EditionRegistry::new(Arc::new(test_pool().await));
        for date in dates {
            registry
                .upsert(&EditionFields {
                    date: date.parse().unwrap(),
                    remote_id: format!("blob-{date}"),
                    file_name: format!("{date}.png"),
                    media_type: MediaType::Png,
                    size_bytes: 1,
                    preview_url: format!("memory://blob-{date}"),
                    download_url: format!("memory://blob-{date}?download=1"),
                    published_by: "admin-1".into(),
                })
                .await
                .unwrap();
        }
        RetrievalService::new(registry)
    }

    #[tokio::test]
    async fn unknown_date_is_not_found() {
        let service = seeded(&[]).await;
        let err = service.by_date("2099-01-01").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(matches!(
            service.latest().await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn malformed_date_is_a_validation_error() {
        let service = seeded(&[]).await;
        assert!(matches!(
            service.by_date("01-03-2025").await.unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            service.by_month("2025-3").await.unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn today_resolves_the_local_date() {
        let today = Local::now().date_naive().to_string();
        let service = seeded(&[today.as_str()]).await;
        assert_eq!(service.today().await.unwrap().date.to_string(), today);
    }

    #[tokio::test]
    async fn month_listing_returns_only_that_month() {
        let service = seeded(&["2025-03-01", "2025-03-15", "2025-02-28"]).await;
        let march: Vec<String> = service
            .by_month("2025-03")
            .await
            .unwrap()
            .iter()
            .map(|e| e.date.to_string())
            .collect();
        assert_eq!(march, vec!["2025-03-15", "2025-03-01"]);
        assert!(service.by_month("2024-03").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pages_concatenate_to_the_full_ordering() {
        let dates: Vec<String> = (1..=11).map(|d| format!("2025-01-{d:02}")).collect();
        let refs: Vec<&str> = dates.iter().map(String::as_str).collect();
        let service = seeded(&refs).await;

        let mut expected = dates.clone();
        expected.sort_by(|a, b| b.cmp(a));

        for page_size in [1u32, 2, 3, 5, 11, 20] {
            let first = service.list_all(1, page_size).await.unwrap();
            assert_eq!(first.total, 11);
            assert_eq!(first.pages, 11u64.div_ceil(u64::from(page_size)));

            let mut seen = Vec::new();
            for page in 1..=first.pages as u32 {
                let chunk = service.list_all(page, page_size).await.unwrap();
                seen.extend(chunk.items.iter().map(|e| e.date.to_string()));
            }
            assert_eq!(seen, expected, "page_size={page_size}");
            assert_eq!(seen.iter().collect::<HashSet<_>>().len(), seen.len());

            let past_end = service.list_all(first.pages as u32 + 1, page_size).await.unwrap();
            assert!(past_end.items.is_empty());
        }
    }

    #[tokio::test]
    async fn zero_page_or_size_is_rejected() {
        let service = seeded(&["2025-01-01"]).await;
        assert!(matches!(
            service.list_all(0, 10).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            service.history(1, 0).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn history_orders_by_first_publish() {
        let service = seeded(&["2025-01-05", "2025-01-01", "2025-01-03"]).await;
        let history: Vec<String> = service
            .history(1, 10)
            .await
            .unwrap()
            .items
            .iter()
            .map(|e| e.date.to_string())
            .collect();
        assert_eq!(history, vec!["2025-01-03", "2025-01-01", "2025-01-05"]);
    }
}
