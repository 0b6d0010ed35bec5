//! Host capabilities the session needs but cannot provide itself.

pub trait Clipboard {
  fn write_text(
    &mut self,
    text: &str
  ) -> anyhow::Result<()>;
}

pub trait Haptics {
  /// Short vibration when a drag picks up a card.
  fn pulse(&mut self);
}

pub trait Confirm {
  /// Asks the user a yes/no question before a destructive action.
  fn confirm(&mut self, prompt: &str) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
  fn pulse(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
  fn confirm(
    &mut self,
    _prompt: &str
  ) -> bool {
    true
  }
}
