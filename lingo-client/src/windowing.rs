//! Windowed list rendering state.
//!
//! [`WindowedList`] reveals a growing prefix of an in-memory list;
//! [`CursorWindow`] accumulates server pages behind an opaque cursor. Both
//! allow one window growth at a time and drop growth that was started
//! before a reset (tab or filter change).

use std::time::Duration;

/// What a list screen should draw
#[derive(Debug, PartialEq)]
pub enum WindowView<'a, T> {
    /// Nothing to show; render the empty-state message, not a grid
    Empty,
    Items {
        items: &'a [T],
        show_load_more: bool,
    },
}

/// Proof that a window growth was started; hand it back to complete it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadMoreTicket {
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct WindowedList<T> {
    items: Vec<T>,
    page_size: usize,
    /// Requested window; may exceed `items.len()`
    window: usize,
    is_loading_more: bool,
    generation: u64,
}

impl<T> WindowedList<T> {
    pub fn new(page_size: usize) -> Self {
        Self::with_items(Vec::new(), page_size)
    }

    pub fn with_items(items: Vec<T>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            items,
            page_size,
            window: page_size,
            is_loading_more: false,
            generation: 0,
        }
    }

    /// Replaces the backing list and shrinks the window back to one page
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.reset();
    }

    /// Back to the first page; any growth in flight is abandoned
    pub fn reset(&mut self) {
        self.window = self.page_size;
        self.is_loading_more = false;
        self.generation += 1;
        log::trace!(target: "windowing", "window reset to {}", self.window);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of items currently revealed; never exceeds `len()`
    pub fn display_count(&self) -> usize {
        self.window.min(self.items.len())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.display_count() < self.items.len()
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    pub fn visible(&self) -> &[T] {
        &self.items[..self.display_count()]
    }

    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn view(&self) -> WindowView<'_, T> {
        if self.items.is_empty() {
            WindowView::Empty
        } else {
            WindowView::Items {
                items: self.visible(),
                show_load_more: self.has_more(),
            }
        }
    }

    /// Mutable access to the first item matching `pred`, visible or not
    pub fn find_mut<P>(&mut self, mut pred: P) -> Option<&mut T>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter_mut().find(|item| pred(item))
    }

    pub fn retain<P>(&mut self, pred: P)
    where
        P: FnMut(&T) -> bool,
    {
        self.items.retain(pred);
    }

    /// Starts a window growth. Returns `None` while another growth is in
    /// flight or when everything is already shown.
    pub fn begin_load_more(&mut self) -> Option<LoadMoreTicket> {
        if self.is_loading_more || !self.has_more() {
            return None;
        }
        self.is_loading_more = true;
        Some(LoadMoreTicket {
            generation: self.generation,
        })
    }

    /// Finishes a growth. Returns `false` if the list was reset meanwhile.
    pub fn complete_load_more(&mut self, ticket: LoadMoreTicket) -> bool {
        if ticket.generation != self.generation {
            log::trace!(target: "windowing", "dropping stale load-more");
            return false;
        }
        self.window = (self.display_count() + self.page_size).min(self.items.len().max(self.page_size));
        self.is_loading_more = false;
        log::trace!(target: "windowing", "window grown to {}", self.display_count());
        true
    }

    /// Button-click / intersection handler: grows the window by one page
    /// after `debounce`.
    pub async fn load_more(&mut self, debounce: Duration) -> bool {
        let Some(ticket) = self.begin_load_more() else {
            return false;
        };
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
        }
        self.complete_load_more(ticket)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorTicket {
    pub cursor: Option<String>,
    generation: u64,
}

/// Accumulates cursor-paginated server pages
#[derive(Debug, Clone)]
pub struct CursorWindow<T> {
    items: Vec<T>,
    next_cursor: Option<String>,
    exhausted: bool,
    is_loading_more: bool,
    loaded_once: bool,
    generation: u64,
}

impl<T> Default for CursorWindow<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            exhausted: false,
            is_loading_more: false,
            loaded_once: false,
            generation: 0,
        }
    }
}

impl<T> CursorWindow<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded_once
    }

    /// Drops everything fetched so far; a fetch in flight is ignored on arrival
    pub fn reset(&mut self) {
        self.items.clear();
        self.next_cursor = None;
        self.exhausted = false;
        self.is_loading_more = false;
        self.loaded_once = false;
        self.generation += 1;
    }

    pub fn view(&self) -> WindowView<'_, T> {
        if self.items.is_empty() {
            WindowView::Empty
        } else {
            WindowView::Items {
                items: &self.items,
                show_load_more: self.has_more(),
            }
        }
    }

    pub fn find_mut<P>(&mut self, mut pred: P) -> Option<&mut T>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter_mut().find(|item| pred(item))
    }

    pub fn begin_fetch(&mut self) -> Option<CursorTicket> {
        if self.is_loading_more || self.exhausted {
            return None;
        }
        self.is_loading_more = true;
        Some(CursorTicket {
            cursor: self.next_cursor.clone(),
            generation: self.generation,
        })
    }

    /// Appends a fetched page. Returns `false` if the window was reset meanwhile.
    pub fn finish_fetch(&mut self, ticket: CursorTicket, page: Vec<T>, next_cursor: Option<String>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        log::trace!(
            target: "windowing",
            "cursor page of {} items, next={:?}",
            page.len(),
            next_cursor
        );
        self.items.extend(page);
        self.exhausted = next_cursor.is_none();
        self.next_cursor = next_cursor;
        self.is_loading_more = false;
        self.loaded_once = true;
        true
    }

    /// Releases the guard after a failed fetch so the user can retry
    pub fn fail_fetch(&mut self, ticket: CursorTicket) {
        if ticket.generation == self.generation {
            self.is_loading_more = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_list_renders_empty_state() {
        let list: WindowedList<u32> = WindowedList::new(20);
        assert_eq!(list.view(), WindowView::Empty);
        assert_eq!(list.display_count(), 0);
        assert!(!list.has_more());
    }

    #[test]
    fn test_short_list_hides_load_more() {
        let list = WindowedList::with_items(vec![1, 2, 3], 12);
        assert_eq!(
            list.view(),
            WindowView::Items {
                items: &[1, 2, 3],
                show_load_more: false
            }
        );
    }

    #[test]
    fn test_load_more_grows_by_page() {
        let mut list = WindowedList::with_items((0..30).collect::<Vec<_>>(), 12);
        assert_eq!(list.display_count(), 12);

        let ticket = list.begin_load_more().unwrap();
        assert!(list.complete_load_more(ticket));
        assert_eq!(list.display_count(), 24);

        let ticket = list.begin_load_more().unwrap();
        assert!(list.complete_load_more(ticket));
        assert_eq!(list.display_count(), 30);
        assert!(!list.has_more());
        assert!(list.begin_load_more().is_none());
    }

    #[test]
    fn test_concurrent_growth_is_refused() {
        let mut list = WindowedList::with_items((0..50).collect::<Vec<_>>(), 10);
        let ticket = list.begin_load_more().unwrap();
        assert!(list.is_loading_more());
        assert!(list.begin_load_more().is_none());
        list.complete_load_more(ticket);
        assert_eq!(list.display_count(), 20);
    }

    #[test]
    fn test_reset_drops_stale_growth() {
        let mut list = WindowedList::with_items((0..50).collect::<Vec<_>>(), 10);
        let stale = list.begin_load_more().unwrap();
        list.set_items((0..40).collect());
        assert!(!list.complete_load_more(stale));
        assert_eq!(list.display_count(), 10);
        assert!(!list.is_loading_more());
    }

    #[tokio::test]
    async fn test_async_load_more_with_debounce() {
        let mut list = WindowedList::with_items((0..5).collect::<Vec<_>>(), 2);
        assert!(list.load_more(Duration::from_millis(5)).await);
        assert_eq!(list.visible(), &[0, 1, 2, 3]);
        assert!(list.load_more(Duration::ZERO).await);
        assert!(!list.load_more(Duration::ZERO).await);
        assert_eq!(list.display_count(), 5);
    }

    #[test]
    fn test_cursor_window_pages() {
        let mut window: CursorWindow<u32> = CursorWindow::new();
        let first = window.begin_fetch().unwrap();
        assert_eq!(first.cursor, None);
        assert!(window.begin_fetch().is_none());
        assert!(window.finish_fetch(first, vec![1, 2], Some("c2".to_string())));

        let second = window.begin_fetch().unwrap();
        assert_eq!(second.cursor.as_deref(), Some("c2"));
        assert!(window.finish_fetch(second, vec![3], None));
        assert_eq!(window.items(), &[1, 2, 3]);
        assert!(!window.has_more());
        assert!(window.begin_fetch().is_none());
    }

    #[test]
    fn test_cursor_window_reset_ignores_inflight_page() {
        let mut window: CursorWindow<u32> = CursorWindow::new();
        let ticket = window.begin_fetch().unwrap();
        window.reset();
        assert!(!window.finish_fetch(ticket, vec![9], None));
        assert!(window.items().is_empty());
        assert!(window.has_more());
    }

    #[test]
    fn test_cursor_window_failure_allows_retry() {
        let mut window: CursorWindow<u32> = CursorWindow::new();
        let ticket = window.begin_fetch().unwrap();
        window.fail_fetch(ticket);
        assert!(!window.is_loading_more());
        assert!(window.begin_fetch().is_some());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Grow,
        Reset,
        Replace(usize),
        Drop(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => Just(Op::Grow),
            1 => Just(Op::Reset),
            1 => (0usize..80).prop_map(Op::Replace),
            1 => (0usize..10).prop_map(Op::Drop),
        ]
    }

    proptest! {
        #[test]
        fn prop_display_count_within_bounds(
            initial in 0usize..80,
            page_size in 1usize..25,
            ops in proptest::collection::vec(op(), 0..40),
        ) {
            let mut list = WindowedList::with_items((0..initial).collect::<Vec<_>>(), page_size);
            for op in ops {
                match op {
                    Op::Grow => {
                        if let Some(ticket) = list.begin_load_more() {
                            list.complete_load_more(ticket);
                        }
                    }
                    Op::Reset => list.reset(),
                    Op::Replace(n) => list.set_items((0..n).collect()),
                    Op::Drop(k) => list.retain(|v| v % 10 != k),
                }
                prop_assert!(list.display_count() <= list.len());
                let shows_button = matches!(
                    list.view(),
                    WindowView::Items { show_load_more: true, .. }
                );
                prop_assert_eq!(shows_button, list.display_count() < list.len());
                prop_assert_eq!(list.visible().len(), list.display_count());
            }
        }
    }
}
