use std::time::{Duration, Instant};

use strum_macros::Display;

use crate::config::DEFAULT_COUNTDOWN_SECS;
use crate::error::QuoteError;
use crate::quote::Quote;

/// How long "Go!" stays up once the race has started.
pub const GO_BANNER: Duration = Duration::from_secs(2);

/// Top-level game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    Idle,
    CountingDown,
    Racing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteStatus {
    Loading,
    Ready(Quote),
    Failed(String),
}

/// Sequence number of a quote request. Only the response to the latest one
/// is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug)]
pub enum RaceEvent {
    Start,
    Tick,
    InputChanged(String),
    Restart,
    /// Fetch a fresh quote without leaving Idle.
    Retry,
    QuoteLoaded {
        request: RequestId,
        result: Result<Quote, QuoteError>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LetterClass {
    Correct,
    Incorrect,
    Untouched,
}

/// Highlight state of one quote word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordMark<'a> {
    Cleared(&'a str),
    Current(Vec<(char, LetterClass)>),
    Pending(&'a str),
}

#[derive(Debug, Clone)]
pub struct RaceState {
    pub phase: Phase,
    pub countdown: u32,
    pub countdown_from: u32,
    pub cleared_word_count: usize,
    pub current_input: String,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
    pub quote: QuoteStatus,
    pub request: RequestId,
}

impl Default for RaceState {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECS)
    }
}

impl RaceState {
    pub fn new(countdown_from: u32) -> Self {
        Self {
            phase: Phase::Idle,
            countdown: countdown_from,
            countdown_from,
            cleared_word_count: 0,
            current_input: String::new(),
            started_at: None,
            ended_at: None,
            quote: QuoteStatus::Loading,
            request: RequestId::default(),
        }
    }

    /// The loaded quote, if any.
    pub fn ready_quote(&self) -> Option<&Quote> {
        match &self.quote {
            QuoteStatus::Ready(quote) => Some(quote),
            _ => None,
        }
    }

    pub fn word_count(&self) -> usize {
        self.ready_quote().map_or(0, Quote::len)
    }

    /// The word the player is expected to type next.
    pub fn current_word(&self) -> Option<&str> {
        self.ready_quote()?.word(self.cleared_word_count)
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.ended_at?.checked_duration_since(self.started_at?)
    }

    /// Total quote words over elapsed minutes, rounded. `None` when the quote
    /// is empty or the race has no measurable duration.
    pub fn wpm(&self) -> Option<u32> {
        let words = self.word_count();
        if words == 0 {
            return None;
        }

        let secs = self.elapsed()?.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }

        let wpm = (words as f64 / secs * 60.0).round();
        wpm.is_finite().then_some(wpm as u32)
    }

    pub fn word_marks(&self) -> Vec<WordMark<'_>> {
        let Some(quote) = self.ready_quote() else {
            return vec![];
        };

        quote
            .words()
            .iter()
            .enumerate()
            .map(|(idx, word)| {
                if idx < self.cleared_word_count {
                    WordMark::Cleared(word)
                } else if idx == self.cleared_word_count && self.phase == Phase::Racing {
                    WordMark::Current(classify_letters(word, &self.current_input))
                } else {
                    WordMark::Pending(word)
                }
            })
            .collect()
    }

    /// Countdown / status line shown above the quote at `now`.
    pub fn banner(&self, now: Instant) -> Option<String> {
        match self.phase {
            Phase::Idle | Phase::Finished => None,
            Phase::CountingDown if self.countdown >= 4 => {
                Some(format!("It's the final countdown! :{}", self.countdown))
            }
            Phase::CountingDown if self.countdown > 0 => {
                Some(format!("Get ready to race! :{}", self.countdown))
            }
            Phase::CountingDown => Some(match self.quote {
                QuoteStatus::Failed(_) => "Could not load a quote".to_string(),
                _ => "Waiting for the quote...".to_string(),
            }),
            Phase::Racing => self
                .started_at
                .and_then(|start| now.checked_duration_since(start))
                .filter(|since| *since < GO_BANNER)
                .map(|_| "Go!".to_string()),
        }
    }

    fn begin_racing_if_ready(&mut self, now: Instant) {
        let playable = self.ready_quote().is_some_and(|q| !q.is_empty());
        if self.phase == Phase::CountingDown && self.countdown == 0 && playable {
            self.phase = Phase::Racing;
            self.cleared_word_count = 0;
            self.current_input.clear();
            self.started_at = Some(now);
            self.ended_at = None;
        }
    }

    fn match_current_word(&mut self, now: Instant) {
        let (cleared, total) = match &self.quote {
            QuoteStatus::Ready(quote) => {
                let cleared = quote.word(self.cleared_word_count).is_some_and(|target| {
                    let candidate = self.current_input.split(' ').next().unwrap_or_default();
                    let is_last = self.cleared_word_count + 1 == quote.len();
                    candidate == target && (self.current_input.ends_with(' ') || is_last)
                });
                (cleared, quote.len())
            }
            _ => return,
        };

        if cleared {
            self.cleared_word_count += 1;
            self.current_input.clear();
        }

        if self.cleared_word_count >= total {
            self.cleared_word_count = total;
            self.phase = Phase::Finished;
            self.ended_at = Some(now);
        }
    }
}

/// Per-letter classification of `target` against what has been typed so far.
pub fn classify_letters(target: &str, input: &str) -> Vec<(char, LetterClass)> {
    let mut typed = input.chars();
    target
        .chars()
        .map(|expected| {
            let class = match typed.next() {
                Some(c) if c == expected => LetterClass::Correct,
                Some(_) => LetterClass::Incorrect,
                None => LetterClass::Untouched,
            };
            (expected, class)
        })
        .collect()
}

/// Applies one event. Events that make no sense in the current phase leave
/// the state untouched.
pub fn reduce(mut state: RaceState, event: RaceEvent, now: Instant) -> RaceState {
    match event {
        RaceEvent::Start => {
            if state.phase == Phase::Idle {
                state.phase = Phase::CountingDown;
                state.countdown = state.countdown_from;
                state.begin_racing_if_ready(now);
            }
        }
        RaceEvent::Tick => {
            if state.phase == Phase::CountingDown && state.countdown > 0 {
                state.countdown -= 1;
                state.begin_racing_if_ready(now);
            }
        }
        RaceEvent::InputChanged(text) => {
            if state.phase == Phase::Racing {
                state.current_input = text;
                state.match_current_word(now);
            }
        }
        RaceEvent::Restart => {
            let request = state.request.next();
            state = RaceState {
                phase: Phase::CountingDown,
                request,
                ..RaceState::new(state.countdown_from)
            };
        }
        RaceEvent::Retry => {
            if state.phase == Phase::Idle {
                state.request = state.request.next();
                state.quote = QuoteStatus::Loading;
            }
        }
        RaceEvent::QuoteLoaded { request, result } => {
            if request == state.request && state.quote == QuoteStatus::Loading {
                state.quote = match result {
                    Ok(quote) if !quote.is_empty() => QuoteStatus::Ready(quote),
                    Ok(_) => QuoteStatus::Failed(QuoteError::Empty.to_string()),
                    Err(err) => QuoteStatus::Failed(err.to_string()),
                };
                state.begin_racing_if_ready(now);
            }
        }
    }

    state
}
