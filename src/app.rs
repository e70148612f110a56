use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::controller::{RaceController, RaceEffects};
use crate::race::{Phase, RaceEvent, RaceState};
use crate::runtime::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<E: RaceEffects> {
    pub controller: RaceController<E>,
}

impl<E: RaceEffects> App<E> {
    pub fn new(controller: RaceController<E>) -> Self {
        Self { controller }
    }

    pub fn race(&self) -> &RaceState {
        self.controller.state()
    }

    /// Routes one runtime event. Redraw ticks and resizes need no state change.
    pub fn handle_event(&mut self, event: AppEvent, now: Instant) -> Flow {
        match event {
            AppEvent::Key(key) => return self.on_key(key, now),
            AppEvent::Countdown(id) => self.controller.on_countdown_tick(id, now),
            AppEvent::QuoteLoaded { request, result } => {
                self.controller.on_quote_loaded(request, result, now)
            }
            AppEvent::Tick | AppEvent::Resize => {}
        }
        Flow::Continue
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('c') if ctrl => return Flow::Quit,
            _ => {}
        }

        let phase = self.race().phase;
        let event = match (phase, key.code) {
            (_, KeyCode::Tab) if phase != Phase::Idle => Some(RaceEvent::Restart),

            (Phase::Idle, KeyCode::Enter | KeyCode::Char('s')) => Some(RaceEvent::Start),
            (Phase::Idle, KeyCode::Char('r')) => Some(RaceEvent::Retry),
            (Phase::CountingDown, KeyCode::Char('r')) => Some(RaceEvent::Restart),

            (Phase::Racing, KeyCode::Char('u')) if ctrl => Some(RaceEvent::InputChanged(String::new())),
            (Phase::Racing, KeyCode::Char(c)) if !ctrl => {
                let mut text = self.race().current_input.clone();
                text.push(c);
                Some(RaceEvent::InputChanged(text))
            }
            (Phase::Racing, KeyCode::Backspace) => {
                let mut text = self.race().current_input.clone();
                text.pop().map(|_| RaceEvent::InputChanged(text))
            }

            (Phase::Finished, KeyCode::Enter | KeyCode::Char('r')) => Some(RaceEvent::Restart),
            _ => None,
        };

        if let Some(event) = event {
            self.controller.dispatch(event, now);
        }
        Flow::Continue
    }
}
