//! Directional key gestures
//!
//! The Disto reports its navigation pad as a numeric key code. Each known
//! code maps to one of eight gestures, realised as one or two arrow-key taps.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// A directional action triggered by a Disto key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    UpLeft,
    Up,
    UpRight,
    Left,
    Right,
    DownLeft,
    Down,
    DownRight,
}

/// Device key code → gesture.
///
/// ```text
///  4 ↖   2 ↑   8 ↗
///  3 ←         6 →
/// 10 ↙   1 ↓  15 ↘
/// ```
const KEY_CODES: [(i32, Gesture); 8] = [
    (4, Gesture::UpLeft),
    (2, Gesture::Up),
    (8, Gesture::UpRight),
    (3, Gesture::Left),
    (6, Gesture::Right),
    (10, Gesture::DownLeft),
    (1, Gesture::Down),
    (15, Gesture::DownRight),
];

impl Gesture {
    /// Look up the gesture for a device key code, `None` if the code is unknown
    pub fn from_key_code(code: i32) -> Option<Self> {
        KEY_CODES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, gesture)| *gesture)
    }

    /// Arrow keys to tap, in order
    pub fn directions(self) -> &'static [Direction] {
        use Direction::*;
        match self {
            Self::UpLeft => &[Up, Left],
            Self::Up => &[Up],
            Self::UpRight => &[Up, Right],
            Self::Left => &[Left],
            Self::Right => &[Right],
            Self::DownLeft => &[Down, Left],
            Self::Down => &[Down],
            Self::DownRight => &[Down, Right],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UpLeft => "up-left",
            Self::Up => "up",
            Self::UpRight => "up-right",
            Self::Left => "left",
            Self::Right => "right",
            Self::DownLeft => "down-left",
            Self::Down => "down",
            Self::DownRight => "down-right",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
