//! Helpers for pulling every page out of an offset-paginated API.
//!
//! [`collect_pages`] walks pages one after another until the source runs dry,
//! for listings whose length is unknown. [`fetch_all_pages`] fans the pages out
//! through a [`TaskQueue`](crate::queue::TaskQueue) when the total is known up
//! front, such as the reply count of a topic.

use std::sync::Arc;

use tracing::debug;

use crate::{
    error::TaskError,
    queue::{ResultOrder, TaskQueueBuilder},
};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_ITEMS: usize = 100;

#[async_trait::async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Item: Send + 'static;

    /// Fetch at most `size` items starting at offset `from`.
    async fn fetch_page(&self, from: usize, size: usize) -> anyhow::Result<Vec<Self::Item>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub page_size: usize,
    /// Upper bound on items gathered by [`collect_pages`].
    pub max_items: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl PaginationConfig {
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.page_size == 0 {
            return Err(TaskError::InvalidPagination(
                "page size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Pages needed to cover `max_items`, counting a trailing partial page.
    pub fn max_pages(&self) -> usize {
        self.max_items.div_ceil(self.page_size)
    }
}

/// Fetch pages in sequence, stopping at the first empty page or once
/// [`PaginationConfig::max_pages`] pages have been read. At most `max_items`
/// items are returned.
///
/// A failing page is reported as [`TaskError::TaskFailed`] with the page number
/// as task id.
pub async fn collect_pages<S: PageSource>(
    source: &S,
    config: &PaginationConfig,
) -> Result<Vec<S::Item>, TaskError> {
    config.validate()?;
    let mut items = Vec::new();
    for page in 0..config.max_pages() {
        let from = page * config.page_size;
        let batch = source
            .fetch_page(from, config.page_size)
            .await
            .map_err(|err| TaskError::TaskFailed {
                task_id: page,
                source: err.into(),
            })?;
        if batch.is_empty() {
            debug!(from, "empty page, stop paging");
            break;
        }
        items.extend(batch);
    }
    items.truncate(config.max_items);
    Ok(items)
}

/// Fetch the `total` items of a listing, one task per page, through a bounded
/// queue configured by `builder`. Pages are concatenated in offset order
/// whatever the builder's result order. `config.max_items` is not applied.
pub async fn fetch_all_pages<S: PageSource>(
    source: Arc<S>,
    total: usize,
    config: &PaginationConfig,
    builder: &TaskQueueBuilder,
) -> Result<Vec<S::Item>, TaskError> {
    config.validate()?;
    let mut builder = *builder;
    let mut queue = builder.with_result_order(ResultOrder::Input).build()?;

    let page_size = config.page_size;
    for from in (0..total).step_by(page_size) {
        let source = Arc::clone(&source);
        queue.push_fn(move || {
            let source = Arc::clone(&source);
            async move { source.fetch_page(from, page_size).await }
        });
    }
    debug!(total, pages = queue.len(), "fetching pages");

    let pages = queue.run().await?;
    Ok(pages.into_iter().flatten().collect())
}
