// Held-input state.
//
// The embedding shell maps its devices (keys, mouse buttons) onto `Action`s
// and reports press/release edges. The sim samples the held set once per
// tick. One-shot intents (jump, throw, plane toggle) are not tracked here:
// `ClientGame` applies them at the moment they happen.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Holdable inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Boost,
    /// Jump is edge-triggered on press; holding it does nothing more.
    Jump,
    /// Over-the-shoulder aim (pulls the camera in).
    Aim,
}

#[derive(Clone, Debug, Default)]
pub struct InputState {
    held: BTreeSet<Action>,
}

impl InputState {
    /// Record a press. Returns true if the action was not already held.
    pub fn press(&mut self, action: Action) -> bool {
        self.held.insert(action)
    }

    pub fn release(&mut self, action: Action) {
        self.held.remove(&action);
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    /// `held(positive) - held(negative)`, in {-1, 0, 1}.
    pub fn axis(&self, positive: Action, negative: Action) -> f64 {
        f64::from(u8::from(self.is_held(positive))) - f64::from(u8::from(self.is_held(negative)))
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}
