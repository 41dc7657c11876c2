use serde::Deserialize;

/// One page returned by a paginated source.
///
/// Sources disagree on the key holding the item list: both `items` and `data`
/// are accepted, and `items` wins when a response carries both.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    items: Option<Vec<T>>,
    data: Option<Vec<T>>,
    total_pages: Option<u64>,
}

impl<T> PageData<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Some(items),
            data: None,
            total_pages: None,
        }
    }

    pub fn with_total_pages(mut self, total_pages: u64) -> Self {
        self.total_pages = Some(total_pages);
        self
    }

    pub fn total_pages(&self) -> Option<u64> {
        self.total_pages
    }

    pub fn into_items(self) -> Vec<T> {
        self.items.or(self.data).unwrap_or_default()
    }
}
