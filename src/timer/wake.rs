use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::{MetronomeError, MetronomeResult};

/// Default wake-up period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Shortest period the timer thread will run at
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A wake-up signal. Carries no timing information of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse;

/// Repeating wake-up source driven by the controller
pub trait PulseTimer {
    /// Begin pulsing every `interval`, first pulse one interval from now
    fn start(&self, interval: Duration);

    /// Stop pulsing. Idempotent.
    fn stop(&self);

    /// Change the period used for subsequent pulses
    fn set_interval(&self, interval: Duration);
}

#[derive(Debug)]
enum TimerControl {
    Start(Duration),
    Stop,
    SetInterval(Duration),
    Shutdown,
}

/// Repeating timer on its own thread, so UI stalls never delay pulses.
/// Pulses go to exactly one subscriber over a bounded channel.
pub struct WakeTimer {
    control_tx: Sender<TimerControl>,
    thread: Option<JoinHandle<()>>,
}

impl WakeTimer {
    /// Spawn the timer thread. Returns the timer and the pulse receiver.
    pub fn spawn(pulse_capacity: usize) -> MetronomeResult<(Self, Receiver<Pulse>)> {
        let (control_tx, control_rx) = unbounded();
        let (pulse_tx, pulse_rx) = bounded(pulse_capacity.max(1));

        let thread = std::thread::Builder::new()
            .name("wake-timer".into())
            .spawn(move || run(control_rx, pulse_tx))
            .map_err(|e| {
                MetronomeError::EnvironmentUnsupported(format!("cannot spawn timer thread: {}", e))
            })?;

        Ok((
            Self {
                control_tx,
                thread: Some(thread),
            },
            pulse_rx,
        ))
    }

    fn send(&self, msg: TimerControl) {
        if self.control_tx.send(msg).is_err() {
            log::error!("Wake timer thread is gone");
        }
    }
}

impl PulseTimer for WakeTimer {
    fn start(&self, interval: Duration) {
        self.send(TimerControl::Start(interval));
    }

    fn stop(&self) {
        self.send(TimerControl::Stop);
    }

    fn set_interval(&self, interval: Duration) {
        self.send(TimerControl::SetInterval(interval));
    }
}

impl Drop for WakeTimer {
    fn drop(&mut self) {
        let _ = self.control_tx.send(TimerControl::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Deadline after one that just fired. Fixed-rate: built from the previous
/// deadline, not from the wake-up time, unless the thread fell more than a
/// whole interval behind. Then it re-anchors to `now` instead of bursting.
fn next_deadline(prev: Instant, interval: Duration, now: Instant) -> Instant {
    let next = prev + interval;
    if now > next {
        now + interval
    } else {
        next
    }
}

/// Pulse schedule owned by the timer thread
#[derive(Debug)]
struct Cadence {
    interval: Duration,
    /// Last emission (or start), pending deadlines are built from it
    anchor: Instant,
    deadline: Option<Instant>,
}

impl Cadence {
    fn new(now: Instant) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            anchor: now,
            deadline: None,
        }
    }

    fn start(&mut self, interval: Duration, now: Instant) {
        self.interval = interval.max(MIN_INTERVAL);
        self.anchor = now;
        self.deadline = Some(now + self.interval);
    }

    fn stop(&mut self) {
        self.deadline = None;
    }

    /// Re-base a pending deadline on the last emission. Stored only while stopped.
    fn set_interval(&mut self, interval: Duration) {
        self.interval = interval.max(MIN_INTERVAL);
        if self.deadline.is_some() {
            self.deadline = Some(self.anchor + self.interval);
        }
    }

    /// Record that the pending deadline fired at `now`
    fn fired(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline {
            self.anchor = deadline;
            self.deadline = Some(next_deadline(deadline, self.interval, now));
        }
    }
}

/// Timer thread body
fn run(control_rx: Receiver<TimerControl>, pulse_tx: Sender<Pulse>) {
    let mut cadence = Cadence::new(Instant::now());

    loop {
        let msg = match cadence.deadline {
            Some(deadline) => match control_rx.recv_deadline(deadline) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match control_rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => return,
            },
        };

        match msg {
            Some(TimerControl::Start(interval)) => cadence.start(interval, Instant::now()),
            Some(TimerControl::Stop) => cadence.stop(),
            Some(TimerControl::SetInterval(interval)) => cadence.set_interval(interval),
            Some(TimerControl::Shutdown) => return,
            None => {
                match pulse_tx.try_send(Pulse) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => log::trace!("Pulse queue full, dropping pulse"),
                    Err(TrySendError::Disconnected(_)) => return,
                }
                cadence.fired(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATIENCE: Duration = Duration::from_secs(2);

    fn drain(rx: &Receiver<Pulse>) {
        while rx.try_recv().is_ok() {}
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn on_time_wake_keeps_fixed_rate() {
        let d = Instant::now();
        assert_eq!(next_deadline(d, ms(25), d), d + ms(25));
    }

    #[test]
    fn late_wake_does_not_shift_schedule() {
        let d = Instant::now();
        // 10ms late, still inside the next interval
        assert_eq!(next_deadline(d, ms(25), d + ms(10)), d + ms(25));
        // Exactly one interval late is still on schedule
        assert_eq!(next_deadline(d, ms(25), d + ms(25)), d + ms(25));
    }

    #[test]
    fn wake_more_than_an_interval_late_re_anchors() {
        let d = Instant::now();
        let now = d + ms(80);
        assert_eq!(next_deadline(d, ms(25), now), now + ms(25));
    }

    #[test]
    fn cadence_advances_from_previous_deadline() {
        let t0 = Instant::now();
        let mut cadence = Cadence::new(t0);
        cadence.start(ms(25), t0);
        assert_eq!(cadence.deadline, Some(t0 + ms(25)));

        cadence.fired(t0 + ms(27));
        assert_eq!(cadence.anchor, t0 + ms(25));
        assert_eq!(cadence.deadline, Some(t0 + ms(50)));
    }

    #[test]
    fn set_interval_rebases_on_last_emission() {
        let t0 = Instant::now();
        let mut cadence = Cadence::new(t0);
        cadence.start(ms(25), t0);
        cadence.fired(t0 + ms(25));

        // Pending deadline counts from the last pulse, not from when the change arrives
        cadence.set_interval(ms(40));
        assert_eq!(cadence.deadline, Some(t0 + ms(65)));

        cadence.fired(t0 + ms(66));
        assert_eq!(cadence.deadline, Some(t0 + ms(105)));
    }

    #[test]
    fn set_interval_while_stopped_only_stores() {
        let t0 = Instant::now();
        let mut cadence = Cadence::new(t0);
        cadence.set_interval(ms(10));
        assert_eq!(cadence.deadline, None);

        cadence.start(ms(10), t0);
        cadence.stop();
        cadence.set_interval(ms(5));
        assert_eq!(cadence.deadline, None);
        assert_eq!(cadence.interval, ms(5));
    }

    #[test]
    fn interval_has_a_floor() {
        let t0 = Instant::now();
        let mut cadence = Cadence::new(t0);
        cadence.start(Duration::ZERO, t0);
        assert_eq!(cadence.deadline, Some(t0 + MIN_INTERVAL));
    }

    #[test]
    fn silent_until_started() {
        let (_timer, rx) = WakeTimer::spawn(8).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(60)).is_err());
    }

    #[test]
    fn first_pulse_after_one_interval() {
        let (timer, rx) = WakeTimer::spawn(8).unwrap();
        let started = Instant::now();
        timer.start(Duration::from_millis(50));
        rx.recv_timeout(PATIENCE).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn keeps_pulsing_while_running() {
        let (timer, rx) = WakeTimer::spawn(8).unwrap();
        timer.start(Duration::from_millis(5));
        for _ in 0..5 {
            assert_eq!(rx.recv_timeout(PATIENCE), Ok(Pulse));
        }
    }

    #[test]
    fn stop_halts_pulses_and_is_idempotent() {
        let (timer, rx) = WakeTimer::spawn(8).unwrap();
        timer.start(Duration::from_millis(2));
        rx.recv_timeout(PATIENCE).unwrap();

        timer.stop();
        timer.stop();
        std::thread::sleep(Duration::from_millis(30));
        drain(&rx);
        assert!(rx.recv_timeout(Duration::from_millis(60)).is_err());
    }

    #[test]
    fn restart_after_stop() {
        let (timer, rx) = WakeTimer::spawn(8).unwrap();
        timer.start(Duration::from_millis(2));
        rx.recv_timeout(PATIENCE).unwrap();
        timer.stop();
        std::thread::sleep(Duration::from_millis(20));
        drain(&rx);

        timer.start(Duration::from_millis(2));
        assert!(rx.recv_timeout(PATIENCE).is_ok());
    }

    #[test]
    fn set_interval_shortens_period() {
        let (timer, rx) = WakeTimer::spawn(8).unwrap();
        timer.start(Duration::from_secs(10));
        timer.set_interval(Duration::from_millis(5));
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn set_interval_while_stopped_does_not_start() {
        let (timer, rx) = WakeTimer::spawn(8).unwrap();
        timer.set_interval(Duration::from_millis(2));
        assert!(rx.recv_timeout(Duration::from_millis(60)).is_err());
    }

    #[test]
    fn full_queue_drops_pulses() {
        let (timer, rx) = WakeTimer::spawn(1).unwrap();
        timer.start(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn unaffected_by_stalled_subscriber() {
        let (timer, rx) = WakeTimer::spawn(64).unwrap();
        timer.start(Duration::from_millis(5));
        // Subscriber busy for a while; pulses keep accumulating
        std::thread::sleep(Duration::from_millis(100));
        assert!(rx.len() >= 5);
    }
}
