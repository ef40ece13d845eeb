use super::events::RelayEvent;

/// Per-request relay lifecycle: `Idle → Streaming → {Completed | Failed}`.
///
/// Transitions that are not allowed from the current state are ignored and
/// return `None`, which is what guarantees a single terminal event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RelayState {
    #[default]
    Idle,
    Streaming { text: String },
    Completed { text: String },
    Failed { partial: String, error: String },
}

impl RelayState {
    pub fn start(&mut self) -> bool {
        if matches!(self, RelayState::Idle) {
            *self = RelayState::Streaming {
                text: String::new(),
            };
            true
        } else {
            false
        }
    }

    pub fn on_fragment(&mut self, fragment: String) -> Option<RelayEvent> {
        match self {
            RelayState::Streaming { text } => {
                text.push_str(&fragment);
                Some(RelayEvent::Text(fragment))
            }
            _ => None,
        }
    }

    pub fn complete(&mut self) -> Option<RelayEvent> {
        match std::mem::take(self) {
            RelayState::Streaming { text } => {
                *self = RelayState::Completed { text };
                Some(RelayEvent::Done)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Option<RelayEvent> {
        match std::mem::take(self) {
            RelayState::Idle => {
                let error = error.into();
                *self = RelayState::Failed {
                    partial: String::new(),
                    error: error.clone(),
                };
                Some(RelayEvent::Error(error))
            }
            RelayState::Streaming { text } => {
                let error = error.into();
                *self = RelayState::Failed {
                    partial: text,
                    error: error.clone(),
                };
                Some(RelayEvent::Error(error))
            }
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Completed { .. } | RelayState::Failed { .. })
    }

    /// Text relayed so far.
    pub fn text(&self) -> &str {
        match self {
            RelayState::Idle => "",
            RelayState::Streaming { text } | RelayState::Completed { text } => text,
            RelayState::Failed { partial, .. } => partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = RelayState::default();
        assert!(state.start());
        assert_eq!(state.on_fragment("Hel".into()), Some(RelayEvent::Text("Hel".into())));
        assert_eq!(state.on_fragment("lo".into()), Some(RelayEvent::Text("lo".into())));
        assert_eq!(state.complete(), Some(RelayEvent::Done));
        assert_eq!(state, RelayState::Completed { text: "Hello".into() });
    }

    #[test]
    fn test_single_terminal_event() {
        let mut state = RelayState::default();
        state.start();
        state.on_fragment("partial".into());
        assert_eq!(state.fail("boom"), Some(RelayEvent::Error("boom".into())));
        assert_eq!(state.complete(), None);
        assert_eq!(state.fail("again"), None);
        assert_eq!(state.on_fragment("late".into()), None);
        assert_eq!(state.text(), "partial");
        assert!(state.is_terminal());
    }

    #[test]
    fn test_fragments_ignored_before_start() {
        let mut state = RelayState::default();
        assert_eq!(state.on_fragment("x".into()), None);
        assert_eq!(state.complete(), None);
        assert!(!state.is_terminal());
    }
}
