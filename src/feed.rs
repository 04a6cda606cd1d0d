//! Feed pagination: slices an ordered id list into fixed-size pages.
//!
//! The engine is agnostic to where the ids came from — global feed,
//! following feed, or one account's posts — it only slices.

use crate::types::{Address, PostId};

pub const POSTS_PER_PAGE: usize = 10;

/// One page of identifiers plus the total page count for the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub ids: Vec<PostId>,
    pub total_pages: usize,
}

/// Slice `ids` into 1-based pages of `page_size`. A page past the end is an
/// empty slice, never an error. A `page` of zero is treated as page 1.
pub fn paginate(ids: &[PostId], page: usize, page_size: usize) -> Page {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_pages = ids.len().div_ceil(page_size);
    let start = (page - 1).saturating_mul(page_size);
    let slice = if start >= ids.len() {
        &[]
    } else {
        &ids[start..(start + page_size).min(ids.len())]
    };
    Page {
        ids: slice.to_vec(),
        total_pages,
    }
}

/// Where a feed's identifier list comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedSource {
    /// All posts, descending by recency.
    Global,
    /// Posts by accounts the given account follows.
    Following(Address),
    /// Posts authored by one account.
    Profile(Address),
}

/// Current source and page of a feed view. Switching the source resets the
/// page to 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedState {
    source: FeedSource,
    page: usize,
}

impl FeedState {
    pub fn new(source: FeedSource) -> Self {
        FeedState { source, page: 1 }
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_source(&mut self, source: FeedSource) {
        if self.source != source {
            self.source = source;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }
}

/// One element of the pagination strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageItem {
    Number(usize),
    Ellipsis,
}

/// The windowed pagination strip: first page, last page, and the current
/// page's neighbors, with ellipsis markers in the gaps. Empty when there is
/// nothing to page through.
pub fn page_controls(current: usize, total: usize) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }
    let mut items = Vec::new();
    for i in 1..=total {
        let near_current = i + 1 >= current && i <= current + 1;
        if i == 1 || i == total || near_current {
            items.push(PageItem::Number(i));
        } else if items.last() != Some(&PageItem::Ellipsis) {
            items.push(PageItem::Ellipsis);
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<PostId> {
        (1..=n).rev().map(PostId).collect()
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(paginate(&ids(0), 1, 10).total_pages, 0);
        assert_eq!(paginate(&ids(10), 1, 10).total_pages, 1);
        assert_eq!(paginate(&ids(11), 1, 10).total_pages, 2);
        assert_eq!(paginate(&ids(25), 1, 10).total_pages, 3);
    }

    #[test]
    fn pages_partition_without_overlap_or_gaps() {
        let all = ids(25);
        let total = paginate(&all, 1, 10).total_pages;
        let mut rebuilt = Vec::new();
        for page in 1..=total {
            rebuilt.extend(paginate(&all, page, 10).ids);
        }
        assert_eq!(rebuilt, all);
    }

    #[test]
    fn page_past_end_is_empty() {
        let all = ids(25);
        let total = paginate(&all, 1, 10).total_pages;
        let past = paginate(&all, total + 1, 10);
        assert!(past.ids.is_empty());
        assert_eq!(past.total_pages, total);
    }

    #[test]
    fn page_zero_is_treated_as_first() {
        assert_eq!(paginate(&ids(5), 0, 10).ids, paginate(&ids(5), 1, 10).ids);
    }

    #[test]
    fn last_partial_page_has_remainder() {
        assert_eq!(paginate(&ids(25), 3, 10).ids.len(), 5);
    }

    #[test]
    fn changing_source_resets_page() {
        let alice: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let mut feed = FeedState::new(FeedSource::Global);
        feed.set_page(4);
        feed.set_source(FeedSource::Profile(alice.clone()));
        assert_eq!(feed.page(), 1);

        // Same source keeps the page.
        feed.set_page(2);
        feed.set_source(FeedSource::Profile(alice));
        assert_eq!(feed.page(), 2);
    }

    #[test]
    fn controls_window_around_current_page() {
        use PageItem::*;
        assert_eq!(page_controls(1, 1), vec![]);
        assert_eq!(page_controls(1, 3), vec![Number(1), Number(2), Number(3)]);
        assert_eq!(
            page_controls(5, 9),
            vec![
                Number(1),
                Ellipsis,
                Number(4),
                Number(5),
                Number(6),
                Ellipsis,
                Number(9)
            ]
        );
        assert_eq!(
            page_controls(1, 5),
            vec![Number(1), Number(2), Ellipsis, Number(5)]
        );
    }
}
