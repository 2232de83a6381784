//! Interface keystrokes and the character-to-key mapping.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// One simulated interface keystroke.
///
/// Keys serialize as their host-side names (`SELECT`, `STRING_A097`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Select,
    LeaveScreen,
    MenuConfirm,
    ChangeTab,
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    ScrollPageUp,
    ScrollPageDown,
    Military,
    BuildJob,
    DepotTrade,
    SetupEmbark,
    SetupFind,
    /// Backspace in text entry fields.
    Erase,
    /// A code-page byte typed into a text field, named `STRING_A<nnn>`.
    ///
    /// [`Key::from_char`] and [`Key::from_byte`] only produce printable ASCII.
    /// `Char(0)` is the host's erase key and reads back as [`Key::Erase`].
    Char(u8),
}

const NAMED: &[(Key, &str)] = &[
    (Key::Select, "SELECT"),
    (Key::LeaveScreen, "LEAVESCREEN"),
    (Key::MenuConfirm, "MENU_CONFIRM"),
    (Key::ChangeTab, "CHANGETAB"),
    (Key::CursorUp, "CURSOR_UP"),
    (Key::CursorDown, "CURSOR_DOWN"),
    (Key::CursorLeft, "CURSOR_LEFT"),
    (Key::CursorRight, "CURSOR_RIGHT"),
    (Key::ScrollUp, "STANDARDSCROLL_UP"),
    (Key::ScrollDown, "STANDARDSCROLL_DOWN"),
    (Key::ScrollLeft, "STANDARDSCROLL_LEFT"),
    (Key::ScrollRight, "STANDARDSCROLL_RIGHT"),
    (Key::ScrollPageUp, "STANDARDSCROLL_PAGEUP"),
    (Key::ScrollPageDown, "STANDARDSCROLL_PAGEDOWN"),
    (Key::Military, "D_MILITARY"),
    (Key::BuildJob, "D_BUILDJOB"),
    (Key::DepotTrade, "BUILDJOB_DEPOT_TRADE"),
    (Key::SetupEmbark, "SETUP_EMBARK"),
    (Key::SetupFind, "SETUP_FIND"),
    (Key::Erase, "STRING_A000"),
];

/// Code page 437 characters 128..=165, in order.
const EXTENDED: [char; 38] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ',
];

/// ASCII fold of each [`EXTENDED`] entry; `None` where the host has no key.
const FOLDED: [Option<u8>; 38] = [
    Some(b'C'), Some(b'u'), Some(b'e'), Some(b'a'), Some(b'a'), Some(b'a'), Some(b'a'), Some(b'c'),
    Some(b'e'), Some(b'e'), Some(b'e'), Some(b'i'), Some(b'i'), Some(b'i'), Some(b'A'), Some(b'A'),
    Some(b'E'), None, None, Some(b'o'), Some(b'o'), Some(b'o'), Some(b'u'), Some(b'u'),
    Some(b'y'), Some(b'O'), Some(b'U'), None, None, None, None, None,
    Some(b'a'), Some(b'i'), Some(b'o'), Some(b'u'), Some(b'n'), Some(b'N'),
];

impl Key {
    /// Key that types `c`, folding accented letters onto their ASCII base.
    pub fn from_char(c: char) -> Option<Key> {
        if c.is_ascii() {
            return Self::from_byte(c as u8);
        }
        let index = EXTENDED.iter().position(|&extended| extended == c)?;
        Self::from_byte(128 + index as u8)
    }

    /// Key for a byte of the host's code page.
    pub fn from_byte(byte: u8) -> Option<Key> {
        let folded = match byte {
            0..=127 => byte,
            _ => FOLDED.get(usize::from(byte - 128)).copied().flatten()?,
        };
        match folded {
            b' '..=b'~' => Some(Key::Char(folded)),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Key::Char(byte) = self {
            return write!(f, "STRING_A{byte:03}");
        }
        let name = NAMED
            .iter()
            .find(|(key, _)| key == self)
            .map(|(_, name)| *name)
            .unwrap_or("NONE");
        f.write_str(name)
    }
}

impl FromStr for Key {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some((key, _)) = NAMED.iter().find(|(_, name)| *name == s) {
            return Ok(*key);
        }
        if let Some(code) = s.strip_prefix("STRING_A") {
            if code.len() != 3 {
                return Err(anyhow!("invalid character key {s}"));
            }
            let byte: u8 = code
                .parse()
                .map_err(|_| anyhow!("invalid character key {s}"))?;
            return Ok(Key::Char(byte));
        }
        Err(anyhow!("unknown key {s}"))
    }
}

impl TryFrom<String> for Key {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

/// Receives the keystrokes a task produced during one step.
pub trait InputSink {
    fn feed_keys(&mut self, keys: Vec<Key>);
}

impl<F: FnMut(Vec<Key>)> InputSink for F {
    fn feed_keys(&mut self, keys: Vec<Key>) {
        self(keys);
    }
}
