use sync_types::PageQuery;

use crate::config::Pagination;
use crate::db::Database;
use crate::error::SocialResult;
use crate::pagination::PageWindow;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub session_manager: SessionManager,
    pub pagination: Pagination,
}

impl AppState {
    pub fn new(db: Database, pagination: Pagination, session_ttl_days: i64) -> Self {
        let session_manager = SessionManager::new(db.clone(), session_ttl_days);
        Self {
            db,
            session_manager,
            pagination,
        }
    }

    /// Window for post, comment, like, follow and group listings
    pub fn window(&self, query: PageQuery) -> SocialResult<PageWindow> {
        PageWindow::new(query, self.pagination.page_size)
    }

    /// Window for group member listings
    pub fn member_window(&self, query: PageQuery) -> SocialResult<PageWindow> {
        PageWindow::new(query, self.pagination.member_page_size)
    }
}
