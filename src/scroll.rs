//! # Scroll Intent Sampler
//!
//! Converts raw continuous wheel/trackpad input into throttled, magnitude
//! filtered impulses in the shared state. The host pushes every wheel event
//! into a channel as it arrives; the sampler drains it once per frame and
//! writes at most one impulse per throttle interval into the store's
//! mailbox slot. It knows nothing of the virtual clock.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::config::SamplerConfig;
use crate::store::{AppStore, PlaybackState};

/// One raw wheel event from the host's input layer.
#[derive(Clone, Copy, Debug)]
pub struct WheelEvent {
    /// Signed scroll magnitude in pixels; positive scrolls forward.
    pub delta_y: f64,
    /// Host timestamp of the event, in seconds.
    pub time: f64,
}

pub struct ScrollIntentSampler {
    config: SamplerConfig,
    receiver: Receiver<WheelEvent>,
    sender: Sender<WheelEvent>,
    last_emit: Option<f64>,
}

impl ScrollIntentSampler {
    pub fn new(config: SamplerConfig) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            config,
            receiver,
            sender,
            last_emit: None,
        }
    }

    /// Channel endpoint the host's input handler feeds wheel events into.
    pub fn sender(&self) -> Sender<WheelEvent> {
        self.sender.clone()
    }

    /// Drains pending wheel events into the store's impulse mailbox.
    ///
    /// Jitter below the magnitude threshold is dropped, emission is limited
    /// to one impulse per throttle interval, and everything is suppressed
    /// once the film has ended — no seeking past the end without an explicit
    /// restart. Impulses coalesce last-writer-wins in the mailbox.
    pub fn poll(&mut self, store: &AppStore) {
        while let Ok(event) = self.receiver.try_recv() {
            if store.playback() == PlaybackState::Ended {
                continue;
            }
            if event.delta_y.abs() < self.config.min_magnitude {
                continue;
            }
            if let Some(last) = self.last_emit {
                if event.time - last < self.config.throttle {
                    continue;
                }
            }
            self.last_emit = Some(event.time);
            store.offer_scroll(event.delta_y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler() -> (ScrollIntentSampler, AppStore) {
        (
            ScrollIntentSampler::new(SamplerConfig::default()),
            AppStore::new(),
        )
    }

    #[test]
    fn jitter_below_threshold_is_dropped() {
        let (mut sampler, store) = sampler();
        sampler.sender().send(WheelEvent { delta_y: 4.0, time: 0.0 }).unwrap();
        sampler.poll(&store);
        assert_eq!(store.take_scroll_impulse(), None);
    }

    #[test]
    fn throttles_to_one_emission_per_interval() {
        let (mut sampler, store) = sampler();
        let tx = sampler.sender();
        tx.send(WheelEvent { delta_y: 100.0, time: 0.000 }).unwrap();
        tx.send(WheelEvent { delta_y: 200.0, time: 0.010 }).unwrap();
        tx.send(WheelEvent { delta_y: 300.0, time: 0.020 }).unwrap();
        sampler.poll(&store);
        // First lands, second is inside the 16ms window, third emits again.
        assert_eq!(store.take_scroll_impulse(), Some(300.0));
    }

    #[test]
    fn suppressed_after_film_end() {
        let (mut sampler, store) = sampler();
        store.request_play();
        store.mark_ended();
        sampler.sender().send(WheelEvent { delta_y: 500.0, time: 1.0 }).unwrap();
        sampler.poll(&store);
        assert_eq!(store.take_scroll_impulse(), None);
    }

    #[test]
    fn coalesces_last_writer_wins() {
        let (mut sampler, store) = sampler();
        let tx = sampler.sender();
        tx.send(WheelEvent { delta_y: 100.0, time: 0.00 }).unwrap();
        tx.send(WheelEvent { delta_y: -250.0, time: 0.05 }).unwrap();
        sampler.poll(&store);
        assert_eq!(store.take_scroll_impulse(), Some(-250.0));
    }
}
