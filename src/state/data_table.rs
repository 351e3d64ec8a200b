//! Table state for list screens
//!
//! Filters, a debounced search box, single-column sorting, page math and row
//! selection. [`DataTable::query_args`] turns the whole thing into arguments
//! for the paginated dispatcher call.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde_json::{Map, Value as JsonValue, json};

use crate::graphql::pagination::{DEFAULT_PAGE_SIZE, clamp_limit};
use crate::graphql::{QueryArgs, SortOrder};

use super::debounce::DebouncedValue;

/// Quiet period before a search term is applied.
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct DataTable {
    filters: BTreeMap<String, JsonValue>,
    search: DebouncedValue<String>,
    search_fields: Vec<String>,
    sort: Option<(String, SortOrder)>,
    page: u32,
    limit: u32,
    total: Option<u64>,
    selected: BTreeSet<String>,
}

impl Default for DataTable {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl DataTable {
    pub fn new(limit: u32) -> Self {
        Self {
            filters: BTreeMap::new(),
            search: DebouncedValue::new(String::new(), DEFAULT_SEARCH_DELAY),
            search_fields: Vec::new(),
            sort: None,
            page: 1,
            limit: clamp_limit(limit),
            total: None,
            selected: BTreeSet::new(),
        }
    }

    /// Fields matched by the search term (case-insensitive `contains`).
    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search = DebouncedValue::new(self.search.current().clone(), delay);
        self
    }

    // Filters

    pub fn filters(&self) -> &BTreeMap<String, JsonValue> {
        &self.filters
    }

    pub fn set_filter(&mut self, field: impl Into<String>, value: JsonValue) {
        self.filters.insert(field.into(), value);
        self.page = 1;
    }

    pub fn remove_filter(&mut self, field: &str) {
        if self.filters.remove(field).is_some() {
            self.page = 1;
        }
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.page = 1;
    }

    // Search

    /// Update the search box. The applied term trails by the search delay.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search.set(term.into());
        self.page = 1;
    }

    /// What the user typed.
    pub fn search_input(&self) -> &str {
        self.search.current()
    }

    /// The term currently applied to queries.
    pub fn search(&self) -> String {
        self.search.value()
    }

    pub fn subscribe_search(&self) -> tokio::sync::watch::Receiver<String> {
        self.search.subscribe()
    }

    // Sorting

    pub fn sort(&self) -> Option<(&str, SortOrder)> {
        self.sort.as_ref().map(|(field, order)| (field.as_str(), *order))
    }

    /// Same field flips the order; a new field starts ascending.
    pub fn toggle_sort(&mut self, field: &str) {
        self.sort = match self.sort.take() {
            Some((current, order)) if current == field => Some((current, order.reversed())),
            _ => Some((field.to_string(), SortOrder::Asc)),
        };
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    // Pagination

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Total row count, `None` until the first result reports one.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    /// Forget the total, e.g. while a new filter is loading.
    pub fn clear_total(&mut self) {
        self.total = None;
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total.map(|total| {
            let pages = total.div_ceil(u64::from(self.limit));
            u32::try_from(pages).unwrap_or(u32::MAX)
        })
    }

    /// Derived from the total when known, otherwise optimistically true.
    pub fn can_go_next(&self) -> bool {
        match self.total_pages() {
            Some(pages) => self.page < pages,
            None => true,
        }
    }

    pub fn can_go_prev(&self) -> bool {
        self.page > 1
    }

    pub fn next_page(&mut self) {
        if self.can_go_next() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.can_go_prev() {
            self.page -= 1;
        }
    }

    /// Jump to `page`. Clamped to the page range only once the total is known.
    pub fn go_to_page(&mut self, page: u32) {
        self.page = match self.total_pages() {
            Some(pages) => page.clamp(1, pages.max(1)),
            None => page.max(1),
        };
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.limit = clamp_limit(limit);
        self.page = 1;
    }

    // Selection

    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn toggle_item(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn select_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected.extend(ids.into_iter().map(Into::into));
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Whether every id in `ids` is selected. False for an empty page.
    pub fn all_selected<S: AsRef<str>>(&self, ids: &[S]) -> bool {
        !ids.is_empty() && ids.iter().all(|id| self.selected.contains(id.as_ref()))
    }

    /// Arguments for a paginated read reflecting filters, search, sort and page.
    pub fn query_args(&self) -> QueryArgs {
        let mut filter: Map<String, JsonValue> = self
            .filters
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();

        let term = self.search();
        let term = term.trim();
        if !term.is_empty() && !self.search_fields.is_empty() {
            let clauses: Vec<JsonValue> = self
                .search_fields
                .iter()
                .map(|field| json!({ field.as_str(): { "contains": term, "mode": "insensitive" } }))
                .collect();
            filter.insert("OR".into(), JsonValue::Array(clauses));
        }

        let mut args = QueryArgs::new().page(self.page).limit(self.limit);
        if !filter.is_empty() {
            args = args.filter(JsonValue::Object(filter));
        }
        if let Some((field, order)) = &self.sort {
            args = args.order_by_field(field, *order);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toggle_sort_cycle() {
        let mut table = DataTable::default();
        table.toggle_sort("createdAt");
        assert_eq!(table.sort(), Some(("createdAt", SortOrder::Asc)));
        table.toggle_sort("createdAt");
        assert_eq!(table.sort(), Some(("createdAt", SortOrder::Desc)));
        table.toggle_sort("createdAt");
        assert_eq!(table.sort(), Some(("createdAt", SortOrder::Asc)));
        table.toggle_sort("name");
        assert_eq!(table.sort(), Some(("name", SortOrder::Asc)));
    }

    #[test]
    fn test_pagination_math() {
        let mut table = DataTable::new(10);
        table.set_total(25);
        assert_eq!(table.total_pages(), Some(3));
        assert!(!table.can_go_prev());

        table.next_page();
        table.next_page();
        table.next_page();
        assert_eq!(table.page(), 3);
        assert!(!table.can_go_next());

        table.set_limit(20);
        assert_eq!(table.page(), 1);
        assert_eq!(table.total_pages(), Some(2));

        table.go_to_page(9);
        assert_eq!(table.page(), 2);
    }

    #[test]
    fn test_unknown_total_is_optimistic() {
        let mut table = DataTable::new(10);
        assert_eq!(table.total(), None);
        assert!(table.can_go_next());
        assert!(!table.can_go_prev());

        table.next_page();
        assert_eq!(table.page(), 2);
        table.go_to_page(7);
        assert_eq!(table.page(), 7);
        table.go_to_page(0);
        assert_eq!(table.page(), 1);

        table.set_total(0);
        assert!(!table.can_go_next());
        table.go_to_page(3);
        assert_eq!(table.page(), 1);

        table.clear_total();
        assert!(table.can_go_next());
    }

    #[test]
    fn test_filters_reset_page() {
        let mut table = DataTable::new(10);
        table.set_total(100);
        table.go_to_page(4);
        table.set_filter("status", json!("ACTIVE"));
        assert_eq!(table.page(), 1);
        assert_eq!(table.filters().len(), 1);
        table.clear_filters();
        assert!(table.filters().is_empty());
    }

    #[test]
    fn test_selection() {
        let mut table = DataTable::default();
        let page = ["a", "b"];
        assert!(!table.all_selected::<&str>(&[]));
        assert!(!table.all_selected(&page));

        table.select_all(page);
        assert!(table.all_selected(&page));

        table.toggle_item("a");
        assert!(!table.is_selected("a"));
        assert_eq!(table.selected_count(), 1);

        table.clear_selection();
        assert_eq!(table.selected_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_args_apply_debounced_search() {
        let mut table = DataTable::new(25).with_search_fields(["name", "email"]);
        table.set_filter("role", json!("ADMIN"));
        table.toggle_sort("name");
        table.set_search("ada");

        let args = table.query_args();
        assert_eq!(args.filter, Some(json!({ "role": "ADMIN" })));

        tokio::time::sleep(DEFAULT_SEARCH_DELAY * 2).await;
        let args = table.query_args();
        assert_eq!(args.page, Some(1));
        assert_eq!(args.limit, Some(25));
        assert_eq!(args.order_by, Some(json!({ "name": "asc" })));
        assert_eq!(
            args.filter,
            Some(json!({
                "role": "ADMIN",
                "OR": [
                    { "name": { "contains": "ada", "mode": "insensitive" } },
                    { "email": { "contains": "ada", "mode": "insensitive" } }
                ]
            }))
        );
    }
}
