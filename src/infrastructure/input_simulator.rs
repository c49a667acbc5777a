use crate::domain::gestures::Direction;
use crate::infrastructure::output_sink::{Key, OutputSink};
use tracing::{debug, trace, warn};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    KEYEVENTF_UNICODE, VIRTUAL_KEY, VK_DOWN, VK_LEFT, VK_RETURN, VK_RIGHT, VK_UP,
};

/// Injects keystrokes into whatever window has focus via `SendInput`
#[derive(Debug, Default)]
pub struct InputSimulator;

impl InputSimulator {
    pub fn new() -> Self {
        Self
    }

    fn virtual_key(key: Key) -> VIRTUAL_KEY {
        match key {
            Key::Arrow(Direction::Up) => VK_UP,
            Key::Arrow(Direction::Down) => VK_DOWN,
            Key::Arrow(Direction::Left) => VK_LEFT,
            Key::Arrow(Direction::Right) => VK_RIGHT,
            Key::Enter => VK_RETURN,
        }
    }

    fn send(&self, inputs: &[INPUT]) -> anyhow::Result<()> {
        let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            anyhow::bail!("SendInput accepted {} of {} events", sent, inputs.len());
        }
        Ok(())
    }

    fn keyboard_input(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    /// Simulate key press
    pub fn key_down(&self, key: VIRTUAL_KEY) -> anyhow::Result<()> {
        debug!("Key Down: {:?}", key);
        self.send(&[Self::keyboard_input(key, 0, Default::default())])
    }

    /// Simulate key release
    pub fn key_up(&self, key: VIRTUAL_KEY) -> anyhow::Result<()> {
        debug!("Key Up: {:?}", key);
        self.send(&[Self::keyboard_input(key, 0, KEYEVENTF_KEYUP)])
    }

    /// Simulate key press and release
    pub fn key_press(&self, key: VIRTUAL_KEY) -> anyhow::Result<()> {
        self.key_down(key)?;
        self.key_up(key)?;
        Ok(())
    }

    /// Type text as unicode key events, independent of the keyboard layout
    pub fn type_unicode(&self, text: &str) -> anyhow::Result<()> {
        trace!("Typing {:?}", text);
        let inputs: Vec<INPUT> = text
            .encode_utf16()
            .flat_map(|unit| {
                [
                    Self::keyboard_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE),
                    Self::keyboard_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
                ]
            })
            .collect();
        self.send(&inputs)
    }
}

impl OutputSink for InputSimulator {
    fn press_and_release(&mut self, key: Key) {
        if let Err(e) = self.key_press(Self::virtual_key(key)) {
            warn!("Key press {:?} failed: {}", key, e);
        }
    }

    fn type_text(&mut self, text: &str) {
        if let Err(e) = self.type_unicode(text) {
            warn!("Typing {:?} failed: {}", text, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_keys() {
        assert_eq!(InputSimulator::virtual_key(Key::Enter), VK_RETURN);
        assert_eq!(
            InputSimulator::virtual_key(Key::Arrow(Direction::Left)),
            VK_LEFT
        );
    }

    #[test]
    fn test_default_sink() {
        let sink: Box<dyn OutputSink + Send> = Box::new(InputSimulator::default());
        assert_eq!(format!("{:?}", InputSimulator::new()), "InputSimulator");
        drop(sink);
    }
}
