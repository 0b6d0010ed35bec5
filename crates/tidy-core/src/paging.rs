pub const PAGE_SIZE: usize = 7;

/// Horizontal travel, in pointer units, that turns a swipe into a page flip.
pub const SWIPE_THRESHOLD: f32 = 50.0;

pub fn total_pages(count: usize) -> usize {
  count.div_ceil(PAGE_SIZE).max(1)
}

/// Items on the 1-based `page`; empty past the end.
pub fn page_slice<T>(
  items: &[T],
  page: usize
) -> &[T] {
  let start = page
    .saturating_sub(1)
    .saturating_mul(PAGE_SIZE);
  if start >= items.len() {
    return &[];
  }
  let end =
    (start + PAGE_SIZE).min(items.len());
  &items[start..end]
}

/// Which way the list slid, for picking the slide-in animation.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum SlideDirection {
  #[default]
  Next,
  Prev
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
  current:   usize,
  direction: SlideDirection
}

impl Default for Pager {
  fn default() -> Self {
    Self {
      current:   1,
      direction: SlideDirection::Next
    }
  }
}

impl Pager {
  pub fn current(&self) -> usize {
    self.current
  }

  pub fn direction(&self) -> SlideDirection {
    self.direction
  }

  pub fn reset(&mut self) {
    self.current = 1;
  }

  pub fn next(&mut self, total: usize) -> bool {
    if self.current >= total {
      return false;
    }
    self.current += 1;
    self.direction = SlideDirection::Next;
    true
  }

  pub fn prev(&mut self) -> bool {
    if self.current <= 1 {
      return false;
    }
    self.current -= 1;
    self.direction = SlideDirection::Prev;
    true
  }

  /// Pulls the page back inside `1..=total` after the list shrank.
  pub fn clamp(&mut self, total: usize) {
    self.current =
      self.current.clamp(1, total.max(1));
  }

  /// A leftward drag past the threshold advances, a rightward one retreats.
  pub fn swipe(
    &mut self,
    start_x: f32,
    end_x: f32,
    total: usize
  ) -> Option<SlideDirection> {
    let distance = start_x - end_x;
    let moved = if distance > SWIPE_THRESHOLD
    {
      self.next(total)
    } else if distance < -SWIPE_THRESHOLD {
      self.prev()
    } else {
      false
    };
    moved.then_some(self.direction)
  }
}

#[cfg(test)]
mod tests {
  use super::{
    PAGE_SIZE,
    Pager,
    SlideDirection,
    page_slice,
    total_pages
  };

  #[test]
  fn fifteen_items_make_three_pages() {
    let items: Vec<usize> = (0..15).collect();
    assert_eq!(total_pages(items.len()), 3);
    assert_eq!(
      page_slice(&items, 1).len(),
      PAGE_SIZE
    );
    assert_eq!(
      page_slice(&items, 3),
      [14usize]
    );
    assert!(
      page_slice(&items, 4).is_empty()
    );
  }

  #[test]
  fn empty_list_still_has_one_page() {
    assert_eq!(total_pages(0), 1);
    assert_eq!(total_pages(7), 1);
    assert_eq!(total_pages(8), 2);
  }

  #[test]
  fn swipes_need_to_cross_the_threshold() {
    let mut pager = Pager::default();
    assert_eq!(
      pager.swipe(200.0, 160.0, 3),
      None
    );
    assert_eq!(
      pager.swipe(200.0, 120.0, 3),
      Some(SlideDirection::Next)
    );
    assert_eq!(
      pager.swipe(200.0, 100.0, 3),
      Some(SlideDirection::Next)
    );
    assert_eq!(pager.current(), 3);
    assert_eq!(
      pager.swipe(200.0, 100.0, 3),
      None
    );
    assert_eq!(
      pager.swipe(100.0, 200.0, 3),
      Some(SlideDirection::Prev)
    );
    assert_eq!(pager.current(), 2);
  }

  #[test]
  fn clamp_after_shrink() {
    let mut pager = Pager::default();
    pager.next(3);
    pager.next(3);
    pager.clamp(2);
    assert_eq!(pager.current(), 2);
    pager.reset();
    assert_eq!(pager.current(), 1);
  }
}
