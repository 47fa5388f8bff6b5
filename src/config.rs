/// How the allocator finds the last block when it appends after a grow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TailSearch {
  /// Walk from the head on every grow. O(n).
  #[default]
  Walk,
  /// Use the tail handle the allocator keeps up to date. O(1).
  Cached,
}

/// Allocator settings. Neither option changes which addresses are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  pub tail_search: TailSearch,
  /// Reject releases of unknown or already free addresses with an error
  /// instead of logging and ignoring them.
  pub check_release: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      tail_search: TailSearch::Walk,
      check_release: true,
    }
  }
}

impl Config {
  pub fn with_tail_search(
    mut self,
    tail_search: TailSearch,
  ) -> Self {
    self.tail_search = tail_search;
    self
  }

  pub fn with_check_release(
    mut self,
    check_release: bool,
  ) -> Self {
    self.check_release = check_release;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.tail_search, TailSearch::Walk);
    assert!(config.check_release);
  }

  #[test]
  fn test_builder_setters() {
    let config = Config::default()
      .with_tail_search(TailSearch::Cached)
      .with_check_release(false);

    assert_eq!(config.tail_search, TailSearch::Cached);
    assert!(!config.check_release);
  }
}
