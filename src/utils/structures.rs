use serde::Deserialize;

/// `?page=&limit=` as typed by clients. Anything unparsable falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

impl Page {
    /// page >= 1, 1 <= limit <= 50.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Page {
        Page::parse_with_max(page, limit, default_limit, MAX_LIMIT)
    }

    pub fn parse_with_max(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: i64,
        max_limit: i64,
    ) -> Page {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l != 0)
            .unwrap_or(default_limit)
            .clamp(1, max_limit);
        Page { page, limit }
    }

    pub fn from_query(query: &PageQuery) -> Page {
        Page::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_LIMIT)
    }

    /// Saturates for absurd page numbers, which SQLite answers with an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages for `total` rows, never less than 1.
    pub fn pages(&self, total: i64) -> i64 {
        ((total + self.limit - 1) / self.limit).max(1)
    }
}

/// Parses `true`/`false` query flags; anything else means "no filter".
pub fn query_flag(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::trim) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(Page::parse(None, None, 10), Page { page: 1, limit: 10 });
        assert_eq!(
            Page::parse(Some("0"), Some("500"), 10),
            Page { page: 1, limit: 50 }
        );
        assert_eq!(
            Page::parse(Some("abc"), Some("-3"), 10),
            Page { page: 1, limit: 1 }
        );
        assert_eq!(Page::parse(Some("3"), Some("0"), 10).limit, 10);
    }

    #[test]
    fn offset_and_pages() {
        let page = Page::parse(Some("3"), Some("20"), 10);
        assert_eq!(page.offset(), 40);
        assert_eq!(page.pages(0), 1);
        assert_eq!(page.pages(41), 3);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let page = Page::parse(Some("9223372036854775807"), Some("50"), 10);
        assert_eq!(page.offset(), i64::MAX);
    }
}
