//! Race controller: owns the race state, the one countdown timer and the
//! quote request sequence, and turns reducer transitions into side effects.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::countdown::{CountdownTimer, TimerHandle, TimerId, COUNTDOWN_PERIOD};
use crate::error::QuoteError;
use crate::quote::{Quote, QuoteProvider};
use crate::race::{reduce, Phase, RaceEvent, RaceState, RequestId};
use crate::runtime::AppEvent;

/// Side effects the controller needs from its host.
pub trait RaceEffects {
    fn start_timer(&mut self, id: TimerId) -> Box<dyn TimerHandle>;
    /// Must eventually deliver the outcome back via `RaceController::on_quote_loaded`.
    fn request_quote(&mut self, request: RequestId, category: &str);
}

/// Production effects: timer and fetch threads reporting into the event channel.
pub struct ThreadEffects {
    tx: Sender<AppEvent>,
    provider: Arc<dyn QuoteProvider>,
    period: Duration,
}

impl ThreadEffects {
    pub fn new(tx: Sender<AppEvent>, provider: Arc<dyn QuoteProvider>) -> Self {
        Self {
            tx,
            provider,
            period: COUNTDOWN_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

impl RaceEffects for ThreadEffects {
    fn start_timer(&mut self, id: TimerId) -> Box<dyn TimerHandle> {
        Box::new(CountdownTimer::spawn(id, self.period, self.tx.clone()))
    }

    fn request_quote(&mut self, request: RequestId, category: &str) {
        let tx = self.tx.clone();
        let provider = Arc::clone(&self.provider);
        let category = category.to_owned();

        thread::spawn(move || {
            let result = provider.fetch_quote(&category);
            match &result {
                Ok(quote) => tracing::info!(?request, words = quote.len(), "quote fetched"),
                Err(err) => tracing::warn!(?request, %err, "quote fetch failed"),
            }
            // receiver gone means the app is shutting down
            let _ = tx.send(AppEvent::QuoteLoaded { request, result });
        });
    }
}

/// Effects that only record what was asked of them. Timers never fire on
/// their own; the caller feeds ticks with `on_countdown_tick`.
#[derive(Debug, Default)]
pub struct ManualEffects {
    pub requests: Vec<(RequestId, String)>,
    pub timers_started: Vec<TimerId>,
    live: Arc<AtomicUsize>,
}

impl ManualEffects {
    /// Timers started and not yet cancelled.
    pub fn live_timers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RequestId> {
        self.requests.last().map(|(request, _)| *request)
    }
}

struct ManualTimer {
    id: TimerId,
    live: Arc<AtomicUsize>,
    cancelled: bool,
}

impl TimerHandle for ManualTimer {
    fn id(&self) -> TimerId {
        self.id
    }

    fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ManualTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl RaceEffects for ManualEffects {
    fn start_timer(&mut self, id: TimerId) -> Box<dyn TimerHandle> {
        self.timers_started.push(id);
        self.live.fetch_add(1, Ordering::SeqCst);
        Box::new(ManualTimer {
            id,
            live: Arc::clone(&self.live),
            cancelled: false,
        })
    }

    fn request_quote(&mut self, request: RequestId, category: &str) {
        self.requests.push((request, category.to_owned()));
    }
}

pub struct RaceController<E: RaceEffects> {
    state: RaceState,
    timer: Option<Box<dyn TimerHandle>>,
    last_timer: TimerId,
    category: String,
    effects: E,
}

impl<E: RaceEffects> RaceController<E> {
    /// Creates the controller and immediately requests the first quote.
    pub fn new(countdown_from: u32, category: impl Into<String>, mut effects: E) -> Self {
        let state = RaceState::new(countdown_from);
        let category = category.into();
        effects.request_quote(state.request, &category);

        Self {
            state,
            timer: None,
            last_timer: TimerId::default(),
            category,
            effects,
        }
    }

    pub fn state(&self) -> &RaceState {
        &self.state
    }

    pub fn effects(&self) -> &E {
        &self.effects
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn active_timer(&self) -> Option<TimerId> {
        self.timer.as_ref().map(|t| t.id())
    }

    pub fn dispatch(&mut self, event: RaceEvent, now: Instant) {
        let restarting = matches!(event, RaceEvent::Restart);
        let before_phase = self.state.phase;
        let before_request = self.state.request;

        self.state = reduce(std::mem::take(&mut self.state), event, now);

        if self.state.request != before_request {
            self.effects.request_quote(self.state.request, &self.category);
        }
        self.sync_timer(restarting);

        if self.state.phase != before_phase {
            tracing::info!(from = %before_phase, to = %self.state.phase, "phase changed");
            if self.state.phase == Phase::Finished {
                tracing::info!(wpm = ?self.state.wpm(), elapsed = ?self.state.elapsed(), "race finished");
            }
        }
    }

    /// Ticks from anything but the active timer were queued before it was
    /// cancelled and must not decrement the new countdown.
    pub fn on_countdown_tick(&mut self, id: TimerId, now: Instant) {
        if self.active_timer() != Some(id) {
            tracing::debug!(?id, "dropping tick from inactive timer");
            return;
        }
        self.dispatch(RaceEvent::Tick, now);
    }

    pub fn on_quote_loaded(
        &mut self,
        request: RequestId,
        result: Result<Quote, QuoteError>,
        now: Instant,
    ) {
        if request != self.state.request {
            tracing::debug!(?request, current = ?self.state.request, "dropping stale quote response");
        }
        self.dispatch(RaceEvent::QuoteLoaded { request, result }, now);
    }

    /// Cancel before create: at most one timer exists, and only while the
    /// countdown still has seconds left.
    fn sync_timer(&mut self, restarting: bool) {
        let counting = self.state.phase == Phase::CountingDown && self.state.countdown > 0;

        if !counting || restarting {
            self.cancel_timer();
        }

        if counting && self.timer.is_none() {
            self.last_timer = self.last_timer.next();
            tracing::debug!(id = ?self.last_timer, "starting countdown timer");
            self.timer = Some(self.effects.start_timer(self.last_timer));
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            tracing::debug!(id = ?timer.id(), "cancelling countdown timer");
            timer.cancel();
        }
    }
}

impl<E: RaceEffects> Drop for RaceController<E> {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::QuoteStatus;
    use assert_matches::assert_matches;

    fn controller(countdown: u32) -> RaceController<ManualEffects> {
        RaceController::new(countdown, "wisdom", ManualEffects::default())
    }

    fn load(ctl: &mut RaceController<ManualEffects>, text: &str) {
        let request = ctl.state().request;
        ctl.on_quote_loaded(request, Ok(Quote::from_text(text)), Instant::now());
    }

    fn tick(ctl: &mut RaceController<ManualEffects>) {
        if let Some(id) = ctl.active_timer() {
            ctl.on_countdown_tick(id, Instant::now());
        }
    }

    #[test]
    fn requests_quote_on_creation() {
        let ctl = controller(5);
        assert_eq!(
            ctl.effects().requests,
            vec![(RequestId::default(), "wisdom".to_string())]
        );
        assert_eq!(ctl.active_timer(), None);
    }

    #[test]
    fn start_creates_single_timer() {
        let mut ctl = controller(5);
        ctl.dispatch(RaceEvent::Start, Instant::now());
        assert_eq!(ctl.effects().live_timers(), 1);
        assert!(ctl.active_timer().is_some());

        ctl.dispatch(RaceEvent::Start, Instant::now());
        assert_eq!(ctl.effects().timers_started.len(), 1);
    }

    #[test]
    fn timer_cancelled_once_race_begins() {
        let mut ctl = controller(5);
        load(&mut ctl, "a b");
        ctl.dispatch(RaceEvent::Start, Instant::now());
        for _ in 0..5 {
            tick(&mut ctl);
        }
        assert_eq!(ctl.state().phase, Phase::Racing);
        assert_eq!(ctl.active_timer(), None);
        assert_eq!(ctl.effects().live_timers(), 0);
        assert_eq!(ctl.effects().timers_started.len(), 1);
    }

    #[test]
    fn timer_stops_at_zero_while_quote_is_missing() {
        let mut ctl = controller(2);
        ctl.dispatch(RaceEvent::Start, Instant::now());
        tick(&mut ctl);
        tick(&mut ctl);
        assert_eq!(ctl.state().phase, Phase::CountingDown);
        assert_eq!(ctl.state().countdown, 0);
        assert_eq!(ctl.effects().live_timers(), 0);

        load(&mut ctl, "late");
        assert_eq!(ctl.state().phase, Phase::Racing);
    }

    #[test]
    fn consecutive_restarts_keep_exactly_one_timer() {
        let mut ctl = controller(5);
        ctl.dispatch(RaceEvent::Start, Instant::now());
        for round in 0..10 {
            tick(&mut ctl);
            ctl.dispatch(RaceEvent::Restart, Instant::now());
            assert_eq!(ctl.effects().live_timers(), 1, "round {round}");
            assert_eq!(ctl.state().countdown, 5);
            assert_eq!(ctl.state().cleared_word_count, 0);
        }
        assert_eq!(ctl.effects().timers_started.len(), 11);
    }

    #[test]
    fn restart_after_finish_refetches_and_counts_down() {
        let mut ctl = controller(1);
        load(&mut ctl, "done");
        ctl.dispatch(RaceEvent::Start, Instant::now());
        tick(&mut ctl);
        ctl.dispatch(RaceEvent::InputChanged("done".into()), Instant::now());
        assert_eq!(ctl.state().phase, Phase::Finished);

        ctl.dispatch(RaceEvent::Restart, Instant::now());
        assert_eq!(ctl.state().phase, Phase::CountingDown);
        assert_eq!(ctl.state().quote, QuoteStatus::Loading);
        assert_eq!(ctl.effects().requests.len(), 2);
        assert_eq!(ctl.effects().last_request(), Some(ctl.state().request));
        assert_eq!(ctl.effects().live_timers(), 1);
    }

    #[test]
    fn tick_from_cancelled_timer_is_ignored() {
        let mut ctl = controller(5);
        ctl.dispatch(RaceEvent::Start, Instant::now());
        let old = ctl.active_timer().unwrap();

        ctl.dispatch(RaceEvent::Restart, Instant::now());
        ctl.on_countdown_tick(old, Instant::now());
        assert_eq!(ctl.state().countdown, 5);

        tick(&mut ctl);
        assert_eq!(ctl.state().countdown, 4);
    }

    #[test]
    fn stale_fetch_does_not_overwrite_new_race() {
        let mut ctl = controller(5);
        let first = ctl.state().request;
        ctl.dispatch(RaceEvent::Restart, Instant::now());

        ctl.on_quote_loaded(first, Ok(Quote::from_text("stale words")), Instant::now());
        assert_eq!(ctl.state().quote, QuoteStatus::Loading);

        load(&mut ctl, "fresh words");
        assert_eq!(ctl.state().current_word(), Some("fresh"));
    }

    #[test]
    fn fetch_failure_is_surfaced_and_retryable() {
        let mut ctl = controller(5);
        let request = ctl.state().request;
        ctl.on_quote_loaded(request, Err(QuoteError::Status(500)), Instant::now());
        assert_matches!(ctl.state().quote, QuoteStatus::Failed(_));

        ctl.dispatch(RaceEvent::Restart, Instant::now());
        assert_eq!(ctl.effects().requests.len(), 2);
        load(&mut ctl, "second try");
        assert_matches!(ctl.state().quote, QuoteStatus::Ready(_));
    }

    #[test]
    fn dropping_controller_cancels_timer() {
        let mut ctl = controller(5);
        ctl.dispatch(RaceEvent::Start, Instant::now());
        let live = Arc::clone(&ctl.effects().live);
        drop(ctl);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn thread_effects_deliver_quote_into_channel() {
        use crate::quote::StaticQuoteProvider;
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        let provider: Arc<dyn QuoteProvider> = Arc::new(StaticQuoteProvider::new("from thread"));
        let ctl = RaceController::new(5, "", ThreadEffects::new(tx, provider));

        match rx.recv_timeout(Duration::from_secs(2)) {
            Ok(AppEvent::QuoteLoaded { request, result }) => {
                assert_eq!(request, ctl.state().request);
                assert_eq!(result.unwrap().words(), ["from", "thread"]);
            }
            other => panic!("expected quote, got {other:?}"),
        }
    }
}
