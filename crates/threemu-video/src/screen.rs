//! Screen identity and per-screen storage.

use std::ops::{Index, IndexMut};

/// One of the two emulated LCDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Upper, wide screen
    Top,
    /// Lower touchscreen
    Bottom,
}

impl Screen {
    /// Both screens in the order they are ingested and drawn
    pub const ALL: [Screen; 2] = [Screen::Top, Screen::Bottom];

    pub fn name(self) -> &'static str {
        match self {
            Screen::Top => "top",
            Screen::Bottom => "bottom",
        }
    }
}

/// A value for each screen, addressed by [`Screen`] rather than by position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerScreen<T> {
    pub top: T,
    pub bottom: T,
}

impl<T> PerScreen<T> {
    pub fn new(top: T, bottom: T) -> Self {
        Self { top, bottom }
    }

    /// Build both entries from a function of the screen
    pub fn from_fn(mut f: impl FnMut(Screen) -> T) -> Self {
        Self {
            top: f(Screen::Top),
            bottom: f(Screen::Bottom),
        }
    }

    pub fn get(&self, screen: Screen) -> &T {
        match screen {
            Screen::Top => &self.top,
            Screen::Bottom => &self.bottom,
        }
    }

    pub fn get_mut(&mut self, screen: Screen) -> &mut T {
        match screen {
            Screen::Top => &mut self.top,
            Screen::Bottom => &mut self.bottom,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Screen, T) -> U) -> PerScreen<U> {
        PerScreen {
            top: f(Screen::Top, self.top),
            bottom: f(Screen::Bottom, self.bottom),
        }
    }

    /// Iterate in display order
    pub fn iter(&self) -> impl Iterator<Item = (Screen, &T)> {
        [(Screen::Top, &self.top), (Screen::Bottom, &self.bottom)].into_iter()
    }
}

impl<T> Index<Screen> for PerScreen<T> {
    type Output = T;

    fn index(&self, screen: Screen) -> &T {
        self.get(screen)
    }
}

impl<T> IndexMut<Screen> for PerScreen<T> {
    fn index_mut(&mut self, screen: Screen) -> &mut T {
        self.get_mut(screen)
    }
}
