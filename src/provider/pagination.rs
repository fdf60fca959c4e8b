use async_trait::async_trait;
use tracing::debug;

use super::{PrSummary, ProviderError};
use crate::repo::RepoSlug;

/// Largest `per_page` the hosted REST APIs accept.
pub const PAGE_CEILING: usize = 100;

/// One page of open pull requests from a REST listing endpoint.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch 1-based page `page` with `per_page` items.
    async fn fetch_page(
        &self,
        slug: &RepoSlug,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<PrSummary>, ProviderError>;
}

/// Collect at most `limit` pull requests, `ceiling` per request.
///
/// Stops on an empty or short page, or once `limit` items are collected.
/// Every page is cut down to `limit` before either stop check, so a short
/// final page never pushes the result past `limit`. Any page error aborts
/// the whole listing. The page size stays fixed for
/// the whole listing since providers compute offsets as
/// `(page - 1) * per_page`.
pub async fn fetch_bounded<S>(
    source: &S,
    slug: &RepoSlug,
    limit: usize,
    ceiling: usize,
) -> Result<Vec<PrSummary>, ProviderError>
where
    S: PageSource + ?Sized,
{
    let per_page = limit.min(ceiling.max(1));
    let mut collected: Vec<PrSummary> = Vec::new();
    let mut remaining = limit;
    let mut page: u32 = 1;

    while remaining > 0 {
        let items = source.fetch_page(slug, page, per_page).await?;
        let received = items.len();
        debug!(page, per_page, received, "fetched pull request page");

        if received == 0 {
            break;
        }

        collected.extend(items);
        collected.truncate(limit);

        if received < per_page || collected.len() >= limit {
            break;
        }

        remaining = limit - collected.len();
        page += 1;
    }

    Ok(collected)
}
