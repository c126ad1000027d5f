use std::fmt::{Display, Formatter};
use std::ops::{BitOr, BitOrAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Option2,
    Option1,
    Left,
    Right,
    Up,
    Down,
    Pause,
}

impl Button {
    pub const ALL: [Self; 9] = [
        Self::A,
        Self::B,
        Self::Option2,
        Self::Option1,
        Self::Left,
        Self::Right,
        Self::Up,
        Self::Down,
        Self::Pause,
    ];

    #[inline]
    #[must_use]
    pub const fn bit(self) -> u16 {
        match self {
            Self::A => 0x0001,
            Self::B => 0x0002,
            Self::Option2 => 0x0004,
            Self::Option1 => 0x0008,
            Self::Left => 0x0010,
            Self::Right => 0x0020,
            Self::Up => 0x0040,
            Self::Down => 0x0080,
            Self::Pause => 0x0100,
        }
    }
}

impl Display for Button {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::B => "B",
            Self::Option2 => "Option 2",
            Self::Option1 => "Option 1",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Pause => "Pause",
        };
        write!(f, "{name}")
    }
}

/// Set of emulated-console buttons held during one frame, in the core's bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LogicalButtons(u16);

impl LogicalButtons {
    pub const NONE: Self = Self(0);

    const VALID_BITS: u16 = 0x01FF;

    /// Bits outside the nine defined buttons are discarded.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::VALID_BITS)
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    #[inline]
    pub fn set(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.0 |= button.bit();
        } else {
            self.0 &= !button.bit();
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL.into_iter().filter(move |&button| self.contains(button))
    }
}

impl From<Button> for LogicalButtons {
    fn from(value: Button) -> Self {
        Self(value.bit())
    }
}

impl BitOr<Button> for LogicalButtons {
    type Output = Self;

    fn bitor(self, rhs: Button) -> Self::Output {
        Self(self.0 | rhs.bit())
    }
}

impl BitOrAssign<Button> for LogicalButtons {
    fn bitor_assign(&mut self, rhs: Button) {
        self.0 |= rhs.bit();
    }
}

impl Display for LogicalButtons {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, button) in self.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{button}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_distinct() {
        let mut all = 0_u16;
        for button in Button::ALL {
            assert_eq!(all & button.bit(), 0, "{button} overlaps another button");
            all |= button.bit();
        }
        assert_eq!(all, LogicalButtons::VALID_BITS);
    }

    #[test]
    fn set_and_clear() {
        let mut buttons = LogicalButtons::NONE;
        buttons.set(Button::Up, true);
        buttons |= Button::A;
        assert_eq!(buttons.bits(), 0x0041);
        assert!(buttons.contains(Button::Up));

        buttons.set(Button::Up, false);
        assert_eq!(buttons, LogicalButtons::from(Button::A));
        assert_eq!(buttons.to_string(), "[A]");
    }

    #[test]
    fn from_bits_masks_unknown_bits() {
        assert_eq!(LogicalButtons::from_bits(0xFFFF).bits(), 0x01FF);
        assert!(LogicalButtons::from_bits(0xFE00).is_empty());
    }
}
