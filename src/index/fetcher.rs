use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::FetchError;
use crate::index::feed::FeedSource;
use crate::models::{IndexRecord, PackageId};

/// Collect every module published between `since` and `until`.
///
/// Pages are requested with a cursor that starts at `since` and moves to the
/// timestamp of the last record of each page. The walk stops once that
/// timestamp is past `until`; the page that crossed the boundary is kept
/// whole. An empty page, or a page that only repeats records already merged
/// at the cursor, means the feed has nothing newer and also ends the walk.
/// A page that does not move the cursor yet brings new records is a stall.
/// Paths are deduplicated as pages are merged, keeping the order in which
/// they were first seen.
pub async fn fetch_since<F>(
    feed: &F,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<PackageId>, FetchError>
where
    F: FeedSource + ?Sized,
{
    let mut cursor = since;
    let mut seen: HashSet<String> = HashSet::new();
    let mut packages = Vec::new();
    let mut pages = 0usize;

    loop {
        let body = feed.page(cursor).await?;
        let records = parse_page(&body)?;
        pages += 1;

        let Some(next) = records.last().map(|r| r.timestamp) else {
            debug!(%cursor, "index page empty, feed exhausted");
            break;
        };

        let before = packages.len();
        for record in records {
            if seen.insert(record.path.clone()) {
                packages.push(PackageId::new(record.path));
            }
        }
        debug!(
            page = pages,
            new = packages.len() - before,
            total = packages.len(),
            %next,
            "merged index page"
        );

        if next > until {
            break;
        }
        if next <= cursor {
            // The feed's cursor is inclusive: once it reaches the newest
            // record the same records come back and nothing new is merged.
            if packages.len() == before {
                debug!(%cursor, "index page repeats the cursor, feed caught up");
                break;
            }
            return Err(FetchError::FeedStalled { cursor });
        }
        cursor = next;
    }

    info!(
        feed = feed.location(),
        pages,
        packages = packages.len(),
        "fetched module index"
    );
    Ok(packages)
}

/// Parse one page of newline-delimited JSON records. Blank lines are ignored.
fn parse_page(body: &str) -> Result<Vec<IndexRecord>, FetchError> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<IndexRecord>(line).map_err(|source| {
                FetchError::MalformedRecord {
                    line: idx + 1,
                    source,
                }
            })
        })
        .collect()
}
