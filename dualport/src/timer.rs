use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::constants;
use crate::error::TimerError;

/// Down-counter decremented once per hardware tick
///
/// Shared between the timer owner, which reloads it, and the tick source,
/// which may run in interrupt context.
#[derive(Debug)]
pub struct Countdown {
    reload: u16,
    remaining: AtomicU16,
}

impl Countdown {
    pub(crate) fn new(reload: u16) -> Self {
        Self {
            reload,
            remaining: AtomicU16::new(0),
        }
    }

    /// Number of ticks loaded on every start
    pub fn reload_value(&self) -> u16 {
        self.reload
    }

    /// Ticks left before expiry, zero when idle or expired
    pub fn remaining(&self) -> u16 {
        self.remaining.load(Ordering::Acquire)
    }

    /// Advance by one tick, returning true on the tick that reaches zero
    ///
    /// An idle countdown stays at zero and never fires again until reloaded.
    pub fn tick(&self) -> bool {
        matches!(
            self.remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |x| x.checked_sub(1)),
            Ok(1)
        )
    }

    fn arm(&self) {
        self.remaining.store(self.reload, Ordering::Release);
    }

    fn disarm(&self) {
        self.remaining.store(0, Ordering::Release);
    }
}

/// Periodic timer hardware driving a [`Countdown`]
///
/// `init` is called once with the fixed tick period. While started, the
/// hardware calls [`Countdown::tick`] every period and raises its expiry
/// notification when that returns true.
pub trait TimerHardware: Send {
    /// Configure the tick period and the countdown to drive
    fn init(&mut self, period: Duration, countdown: Arc<Countdown>) -> Result<(), TimerError>;
    /// Begin ticking
    fn start(&mut self);
    /// Stop ticking
    fn stop(&mut self);
}

/// Single-shot timeout used for RTU inter-frame timing
#[derive(Debug)]
pub struct TimeoutTimer<H> {
    hardware: H,
    countdown: Arc<Countdown>,
}

impl<H> TimeoutTimer<H>
where
    H: TimerHardware,
{
    /// Initialise the hardware with the fixed tick and a countdown of `timeout_ticks`
    pub fn new(mut hardware: H, timeout_ticks: u16) -> Result<Self, TimerError> {
        if timeout_ticks == 0 {
            return Err(TimerError::InvalidTimeout);
        }

        let countdown = Arc::new(Countdown::new(timeout_ticks));
        hardware.init(constants::timer::TICK, countdown.clone())?;

        Ok(Self {
            hardware,
            countdown,
        })
    }

    /// Reload the countdown and start ticking
    pub fn start(&mut self) {
        self.countdown.arm();
        self.hardware.start();
    }

    /// Stop ticking, the pending expiry is discarded
    pub fn stop(&mut self) {
        self.hardware.stop();
        self.countdown.disarm();
    }

    /// Full timeout covered by one start
    pub fn timeout(&self) -> Duration {
        constants::timer::TICK * u32::from(self.countdown.reload_value())
    }

    /// The countdown shared with the hardware
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Access the underlying hardware
    pub fn hardware(&self) -> &H {
        &self.hardware
    }
}

/// [`TimerHardware`] backed by a Tokio interval
///
/// Each start spawns a task on the runtime the timer was created on. The
/// task calls the expiry callback once when the countdown reaches zero and
/// then exits.
pub struct TokioTimer {
    runtime: tokio::runtime::Handle,
    period: Duration,
    countdown: Option<Arc<Countdown>>,
    on_expired: Arc<dyn Fn() + Send + Sync>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl std::fmt::Debug for TokioTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioTimer")
            .field("period", &self.period)
            .field("countdown", &self.countdown)
            .field("running", &self.task.is_some())
            .finish()
    }
}

impl TokioTimer {
    /// Create a timer on the current Tokio runtime
    pub fn new<F>(on_expired: F) -> Result<Self, TimerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        Ok(Self {
            runtime,
            period: constants::timer::TICK,
            countdown: None,
            on_expired: Arc::new(on_expired),
            task: None,
        })
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl TimerHardware for TokioTimer {
    fn init(&mut self, period: Duration, countdown: Arc<Countdown>) -> Result<(), TimerError> {
        if period.is_zero() {
            return Err(TimerError::InvalidTimeout);
        }
        self.period = period;
        self.countdown = Some(countdown);
        Ok(())
    }

    fn start(&mut self) {
        self.cancel();

        let countdown = match &self.countdown {
            Some(x) => x.clone(),
            None => {
                tracing::warn!("timer started before it was initialised");
                return;
            }
        };

        let period = self.period;
        let on_expired = self.on_expired.clone();
        self.task = Some(self.runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            // a late tick still counts, otherwise the timeout stretches under load
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if countdown.tick() {
                    tracing::trace!("timer expired");
                    on_expired();
                    return;
                }
            }
        }));
    }

    fn stop(&mut self) {
        self.cancel();
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTimer;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn countdown_fires_once_on_the_last_tick() {
        let countdown = Countdown::new(3);
        assert!(!countdown.tick());

        countdown.arm();
        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn zero_tick_timeout_is_rejected() {
        assert_eq!(
            TimeoutTimer::new(MockTimer::default(), 0).unwrap_err(),
            TimerError::InvalidTimeout
        );
    }

    #[test]
    fn hardware_is_initialised_with_the_fixed_tick() {
        let timer = TimeoutTimer::new(MockTimer::default(), 35).unwrap();
        assert_eq!(timer.hardware().period, Some(constants::timer::TICK));
        assert_eq!(timer.timeout(), Duration::from_micros(1750));
    }

    #[test]
    fn start_reloads_and_stop_disarms() {
        let mut timer = TimeoutTimer::new(MockTimer::default(), 4).unwrap();
        timer.start();
        assert!(timer.hardware().running);
        assert_eq!(timer.countdown().remaining(), 4);

        assert!(!timer.hardware().tick());
        assert_eq!(timer.countdown().remaining(), 3);

        timer.stop();
        assert!(!timer.hardware().running);
        assert_eq!(timer.countdown().remaining(), 0);

        timer.start();
        assert_eq!(timer.countdown().remaining(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_calls_expiry_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let hardware = {
            let count = count.clone();
            TokioTimer::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };

        let mut timer = TimeoutTimer::new(hardware, 20).unwrap();
        timer.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_tokio_timer_never_expires() {
        let count = Arc::new(AtomicUsize::new(0));
        let hardware = {
            let count = count.clone();
            TokioTimer::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };

        let mut timer = TimeoutTimer::new(hardware, 20).unwrap();
        timer.start();
        timer.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tokio_timer_requires_a_runtime() {
        assert_eq!(
            TokioTimer::new(|| {}).unwrap_err(),
            TimerError::NoRuntime
        );
    }
}
