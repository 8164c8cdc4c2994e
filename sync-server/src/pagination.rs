use rusqlite::{Connection, Row, ToSql};
use sync_types::{Page, PageQuery};

use crate::error::{SocialError, SocialResult};

/// A requested page of an ordered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
}

impl PageWindow {
    pub fn new(query: PageQuery, page_size: u32) -> SocialResult<Self> {
        let page = query.page_number();
        if page == 0 {
            return Err(SocialError::Validation(
                "Page numbers start at 1".to_string(),
            ));
        }
        Ok(Self {
            page,
            page_size: page_size.max(1),
        })
    }

    pub fn first(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Wrap a slice of an ordered set of `count` items
    ///
    /// The first page always exists, even when empty. Any later page past the
    /// end is reported as missing.
    pub fn into_page<T>(self, count: u64, results: Vec<T>) -> SocialResult<Page<T>> {
        if self.page > 1 && self.offset() as u64 >= count {
            return Err(SocialError::NotFound("Invalid page".to_string()));
        }

        let seen = u64::from(self.page) * u64::from(self.page_size);
        Ok(Page {
            count,
            next: (seen < count).then(|| self.page + 1),
            previous: (self.page > 1).then(|| self.page - 1),
            results,
        })
    }
}

/// Shape of a paginated listing query
///
/// `filter` may reference numbered parameters `?1..?N`; the limit and offset
/// are bound after them.
pub(crate) struct ListingQuery<'a> {
    pub select: &'a str,
    pub from: &'a str,
    pub filter: &'a str,
    pub order_by: &'a str,
}

/// Count and slice a listing inside one read transaction so both see the
/// same snapshot
pub(crate) fn fetch_page<T, F>(
    conn: &Connection,
    query: &ListingQuery<'_>,
    params: &[&dyn ToSql],
    window: PageWindow,
    map_row: F,
) -> SocialResult<Page<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let tx = conn.unchecked_transaction()?;

    let count_sql = format!("SELECT COUNT(*) FROM {} {}", query.from, query.filter);
    let count: i64 = tx.query_row(&count_sql, params, |row| row.get(0))?;

    let limit = window.limit();
    let offset = window.offset();
    let mut bound: Vec<&dyn ToSql> = params.to_vec();
    bound.push(&limit);
    bound.push(&offset);

    let select_sql = format!(
        "{} FROM {} {} ORDER BY {} LIMIT ?{} OFFSET ?{}",
        query.select,
        query.from,
        query.filter,
        query.order_by,
        params.len() + 1,
        params.len() + 2,
    );

    let results = {
        let mut stmt = tx.prepare(&select_sql)?;
        let rows = stmt
            .query_map(bound.as_slice(), map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    tx.commit()?;

    window.into_page(count.max(0) as u64, results)
}
