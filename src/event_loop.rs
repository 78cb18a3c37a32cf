use std::io;
use std::time::{Duration, Instant};

use crossterm::event::Event;

use crate::drivers::InputDriver;

pub enum ControlFlow {
    Continue,
    /// Keep running, but wake no later than this instant even when no input
    /// arrives. Used to fire debounce timers on time.
    WaitUntil(Instant),
    Quit,
}

/// A centralized event loop that drives the main UI thread.
///
/// This struct implements the "Message Pump" pattern. It is responsible for:
/// 1. Owning the main execution thread.
/// 2. Polling the input driver for user events (keyboard, mouse, resize).
/// 3. Dispatching those events to a provided handler closure.
///
/// Timers are not owned by the loop. The handler reports its next deadline
/// through [`ControlFlow::WaitUntil`] and the loop shortens its poll so the
/// handler is called again (with `None`) once that deadline passes.
pub struct EventLoop<D> {
    driver: D,
    poll_interval: Duration,
}

impl<D: InputDriver> EventLoop<D> {
    pub fn new(driver: D, poll_interval: Duration) -> Self {
        Self {
            driver,
            poll_interval,
        }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    fn poll_timeout(&self, wake_at: Option<Instant>) -> Duration {
        match wake_at {
            Some(at) => at
                .saturating_duration_since(Instant::now())
                .min(self.poll_interval),
            None => self.poll_interval,
        }
    }

    /// Runs the application loop, taking control of the current thread.
    ///
    /// The `handler` is called with:
    /// - `Some(event)` when an input event occurs.
    /// - `None` when the poll times out without an event (time to fire due
    ///   timers and redraw).
    pub fn run<F>(&mut self, mut handler: F) -> io::Result<()>
    where
        F: FnMut(&mut D, Option<Event>) -> io::Result<ControlFlow>,
    {
        let mut wake_at = None;
        loop {
            match handler(&mut self.driver, None)? {
                ControlFlow::Quit => break,
                ControlFlow::WaitUntil(at) => wake_at = Some(at),
                ControlFlow::Continue => wake_at = None,
            }

            if self.driver.poll(self.poll_timeout(wake_at))? {
                // Drain the event queue so bursts (mouse drags, scrolling)
                // do not fall behind the rendering loop.
                loop {
                    let event = self.driver.read()?;
                    if let ControlFlow::Quit = handler(&mut self.driver, Some(event))? {
                        return Ok(());
                    }
                    if !self.driver.poll(Duration::from_millis(0))? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;

    struct Scripted {
        events: VecDeque<Event>,
        polls: Vec<Duration>,
    }

    impl InputDriver for Scripted {
        fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
            self.polls.push(timeout);
            Ok(!self.events.is_empty())
        }

        fn read(&mut self) -> io::Result<Event> {
            self.events
                .pop_front()
                .ok_or_else(|| io::Error::other("no scripted events left"))
        }
    }

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn drains_events_then_quits() {
        let driver = Scripted {
            events: VecDeque::from(vec![key('a'), key('b'), key('q')]),
            polls: Vec::new(),
        };
        let mut event_loop = EventLoop::new(driver, Duration::from_millis(16));
        let mut seen = Vec::new();
        event_loop
            .run(|_, event| {
                if let Some(Event::Key(k)) = event {
                    seen.push(k.code);
                    if k.code == KeyCode::Char('q') {
                        return Ok(ControlFlow::Quit);
                    }
                }
                Ok(ControlFlow::Continue)
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![KeyCode::Char('a'), KeyCode::Char('b'), KeyCode::Char('q')]
        );
    }

    #[test]
    fn deadline_shortens_the_poll() {
        let driver = Scripted {
            events: VecDeque::new(),
            polls: Vec::new(),
        };
        let mut event_loop = EventLoop::new(driver, Duration::from_secs(10));
        let mut idle_calls = 0;
        event_loop
            .run(|_, _| {
                idle_calls += 1;
                if idle_calls > 1 {
                    return Ok(ControlFlow::Quit);
                }
                Ok(ControlFlow::WaitUntil(Instant::now()))
            })
            .unwrap();
        let polls = &event_loop.driver().polls;
        assert_eq!(polls.len(), 1);
        assert!(polls[0] < Duration::from_secs(1));
    }
}
