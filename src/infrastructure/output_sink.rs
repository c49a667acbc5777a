use crate::domain::gestures::{Direction, Gesture};
use tracing::info;

/// Keys the bridge ever presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Arrow(Direction),
    Enter,
}

/// Destination for synthesized keyboard input.
///
/// Calls are best effort: implementations log their own failures and never
/// report them back to the protocol loop.
pub trait OutputSink {
    /// Press and immediately release a single key
    fn press_and_release(&mut self, key: Key);

    /// Type literal text into the focused application
    fn type_text(&mut self, text: &str);

    /// Tap each arrow key of a gesture in turn
    fn perform(&mut self, gesture: Gesture) {
        for &direction in gesture.directions() {
            self.press_and_release(Key::Arrow(direction));
        }
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn press_and_release(&mut self, key: Key) {
        (**self).press_and_release(key)
    }

    fn type_text(&mut self, text: &str) {
        (**self).type_text(text)
    }

    fn perform(&mut self, gesture: Gesture) {
        (**self).perform(gesture)
    }
}

/// Sink that only logs what would have been typed
#[derive(Debug, Default)]
pub struct LogSink;

impl OutputSink for LogSink {
    fn press_and_release(&mut self, key: Key) {
        match key {
            Key::Arrow(direction) => info!("[dry-run] key {}", direction.name()),
            Key::Enter => info!("[dry-run] key enter"),
        }
    }

    fn type_text(&mut self, text: &str) {
        info!("[dry-run] type {:?}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Taps(Vec<Key>);

    impl OutputSink for Taps {
        fn press_and_release(&mut self, key: Key) {
            self.0.push(key);
        }

        fn type_text(&mut self, _text: &str) {}
    }

    #[test]
    fn test_perform_taps_each_direction() {
        let mut sink = Taps::default();
        sink.perform(Gesture::DownLeft);
        sink.perform(Gesture::Up);
        assert_eq!(
            sink.0,
            vec![
                Key::Arrow(Direction::Down),
                Key::Arrow(Direction::Left),
                Key::Arrow(Direction::Up),
            ]
        );
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut boxed: Box<Taps> = Box::default();
        boxed.perform(Gesture::UpRight);
        boxed.press_and_release(Key::Enter);
        assert_eq!(
            boxed.0,
            vec![
                Key::Arrow(Direction::Up),
                Key::Arrow(Direction::Right),
                Key::Enter,
            ]
        );
    }
}
