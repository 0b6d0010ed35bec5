use chrono::{
  DateTime,
  Duration,
  Utc
};

use crate::filter::StatusTab;
use crate::task::TaskId;
use crate::views::ViewMode;

/// Hold time before a press on a card turns into a drag.
pub const LONG_PRESS_MS: i64 = 200;

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressTarget {
  Card,
  /// A button or other interactive control inside the card.
  Control
}

/// Conditions under which a press may begin a drag.
#[derive(Debug, Clone, Copy)]
pub struct DragGate {
  pub view:   ViewMode,
  pub tab:    StatusTab,
  pub target: PressTarget
}

impl DragGate {
  pub fn allows_drag(&self) -> bool {
    self.view == ViewMode::List
      && self.tab == StatusTab::Active
      && self.target == PressTarget::Card
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEffect {
  /// The long press completed; the caller fires the haptic pulse.
  Started(TaskId),
  /// The dragged card is over another task; the store decides whether the
  /// two may trade places.
  Swap {
    source: TaskId,
    target: TaskId
  }
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub enum DragState {
  #[default]
  Idle,
  Pending {
    task:       TaskId,
    started_at: DateTime<Utc>
  },
  Dragging {
    task: TaskId
  }
}

impl DragState {
  pub fn press(
    &self,
    task: &TaskId,
    at: DateTime<Utc>,
    gate: DragGate
  ) -> DragState {
    if !gate.allows_drag() {
      return DragState::Idle;
    }
    DragState::Pending {
      task:       task.clone(),
      started_at: at
    }
  }

  /// Promotes a pending press once it has been held long enough.
  pub fn tick(
    &self,
    now: DateTime<Utc>
  ) -> (DragState, Option<DragEffect>) {
    match self {
      | DragState::Pending {
        task,
        started_at
      } if now - *started_at
        >= Duration::milliseconds(
          LONG_PRESS_MS
        ) =>
      {
        (
          DragState::Dragging {
            task: task.clone()
          },
          Some(DragEffect::Started(
            task.clone()
          ))
        )
      }
      | other => (other.clone(), None)
    }
  }

  /// Pointer movement. Moving before the hold completes abandons the press;
  /// moving while dragging over a different task requests a swap.
  pub fn hover(
    &self,
    over: Option<&TaskId>
  ) -> (DragState, Option<DragEffect>) {
    match self {
      | DragState::Idle
      | DragState::Pending {
        ..
      } => (DragState::Idle, None),
      | DragState::Dragging {
        task
      } => {
        let effect = over
          .filter(|target| *target != task)
          .map(|target| {
            DragEffect::Swap {
              source: task.clone(),
              target: target.clone()
            }
          });
        (self.clone(), effect)
      }
    }
  }

  /// Pointer release or cancel.
  pub fn release(&self) -> DragState {
    DragState::Idle
  }

  /// Page swipes and vertical scrolling are suppressed while dragging.
  pub fn scroll_locked(&self) -> bool {
    matches!(self, DragState::Dragging {
      ..
    })
  }

  pub fn dragged(&self) -> Option<&TaskId> {
    match self {
      | DragState::Dragging {
        task
      } => Some(task),
      | _ => None
    }
  }
}
