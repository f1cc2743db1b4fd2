//! Line discipline settings applied to the PTY slave
//!
//! The default profile is a cooked terminal: canonical input, echo on,
//! signal generation from the usual control keys.

use std::mem;

use libc::{cc_t, tcflag_t};

const SLOTS: usize = 10;

/// A control-character slot of the line discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlChar {
    Interrupt,
    Quit,
    Erase,
    Kill,
    EndOfFile,
    Stop,
    Suspend,
    Start,
    /// Minimum byte count for a non-canonical read
    MinRead,
    /// Non-canonical read timeout in tenths of a second
    ReadTimeout,
}

impl ControlChar {
    pub const ALL: [ControlChar; SLOTS] = [
        ControlChar::Interrupt,
        ControlChar::Quit,
        ControlChar::Erase,
        ControlChar::Kill,
        ControlChar::EndOfFile,
        ControlChar::Stop,
        ControlChar::Suspend,
        ControlChar::Start,
        ControlChar::MinRead,
        ControlChar::ReadTimeout,
    ];

    /// Index of this slot in `termios.c_cc`
    fn termios_index(self) -> usize {
        match self {
            ControlChar::Interrupt => libc::VINTR,
            ControlChar::Quit => libc::VQUIT,
            ControlChar::Erase => libc::VERASE,
            ControlChar::Kill => libc::VKILL,
            ControlChar::EndOfFile => libc::VEOF,
            ControlChar::Stop => libc::VSTOP,
            ControlChar::Suspend => libc::VSUSP,
            ControlChar::Start => libc::VSTART,
            ControlChar::MinRead => libc::VMIN,
            ControlChar::ReadTimeout => libc::VTIME,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }

    /// Parse the lowercase name used in spawn request files
    pub fn from_name(name: &str) -> Option<Self> {
        let cc = match name {
            "intr" | "interrupt" => ControlChar::Interrupt,
            "quit" => ControlChar::Quit,
            "erase" => ControlChar::Erase,
            "kill" => ControlChar::Kill,
            "eof" => ControlChar::EndOfFile,
            "stop" => ControlChar::Stop,
            "susp" | "suspend" => ControlChar::Suspend,
            "start" => ControlChar::Start,
            "min" => ControlChar::MinRead,
            "time" => ControlChar::ReadTimeout,
            _ => return None,
        };
        Some(cc)
    }
}

/// Control code for a letter key pressed with Ctrl, e.g. `ctrl(b'C') == 0x03`
const fn ctrl(key: u8) -> cc_t {
    key - b'@'
}

const ECHO_FLAGS: tcflag_t = libc::ECHO | libc::ECHOE | libc::ECHOK | libc::ECHONL;

/// Terminal mode for a freshly spawned child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalMode {
    pub input_flags: tcflag_t,
    pub output_flags: tcflag_t,
    pub local_flags: tcflag_t,
    pub control_flags: tcflag_t,
    control_chars: [cc_t; SLOTS],
}

impl Default for TerminalMode {
    fn default() -> Self {
        let mut control_chars = [0; SLOTS];
        control_chars[ControlChar::Interrupt.slot()] = ctrl(b'C');
        control_chars[ControlChar::Quit.slot()] = ctrl(b'\\');
        control_chars[ControlChar::Erase.slot()] = 0x7f;
        control_chars[ControlChar::Kill.slot()] = ctrl(b'U');
        control_chars[ControlChar::EndOfFile.slot()] = ctrl(b'D');
        control_chars[ControlChar::Stop.slot()] = ctrl(b'S');
        control_chars[ControlChar::Suspend.slot()] = ctrl(b'Z');
        control_chars[ControlChar::Start.slot()] = ctrl(b'Q');
        control_chars[ControlChar::MinRead.slot()] = 1;
        control_chars[ControlChar::ReadTimeout.slot()] = 0;

        Self {
            input_flags: libc::ICRNL | libc::IXON | libc::IXANY,
            output_flags: libc::OPOST | libc::ONLCR,
            local_flags: libc::ISIG | libc::ICANON | ECHO_FLAGS | libc::IEXTEN,
            control_flags: libc::CS8 | libc::CREAD,
            control_chars,
        }
    }
}

impl TerminalMode {
    /// Turn the whole echo family (ECHO, ECHOE, ECHOK, ECHONL) on or off
    pub fn with_echo(mut self, enabled: bool) -> Self {
        if enabled {
            self.local_flags |= ECHO_FLAGS;
        } else {
            self.local_flags &= !ECHO_FLAGS;
        }
        self
    }

    /// Switch between line-buffered (canonical) and byte-at-a-time input
    pub fn with_canonical(mut self, enabled: bool) -> Self {
        if enabled {
            self.local_flags |= libc::ICANON;
        } else {
            self.local_flags &= !libc::ICANON;
        }
        self
    }

    /// Rebind one control-character slot
    pub fn with_control_char(mut self, cc: ControlChar, value: u8) -> Self {
        self.control_chars[cc.slot()] = value;
        self
    }

    pub fn control_char(&self, cc: ControlChar) -> u8 {
        self.control_chars[cc.slot()]
    }

    pub fn echo(&self) -> bool {
        self.local_flags & libc::ECHO != 0
    }

    pub fn canonical(&self) -> bool {
        self.local_flags & libc::ICANON != 0
    }

    /// Build the native structure handed to forkpty
    pub fn into_termios(self) -> libc::termios {
        // SAFETY: termios is plain old data, all-zero is a valid value
        let mut tt: libc::termios = unsafe { mem::zeroed() };
        tt.c_iflag = self.input_flags;
        tt.c_oflag = self.output_flags;
        tt.c_lflag = self.local_flags;
        tt.c_cflag = self.control_flags;
        for cc in ControlChar::ALL {
            tt.c_cc[cc.termios_index()] = self.control_chars[cc.slot()];
        }
        tt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_control_chars() {
        let mode = TerminalMode::default();
        assert_eq!(mode.control_char(ControlChar::Interrupt), 0x03);
        assert_eq!(mode.control_char(ControlChar::Quit), 0x1c);
        assert_eq!(mode.control_char(ControlChar::Erase), 0x7f);
        assert_eq!(mode.control_char(ControlChar::Kill), 0x15);
        assert_eq!(mode.control_char(ControlChar::EndOfFile), 0x04);
        assert_eq!(mode.control_char(ControlChar::Stop), 0x13);
        assert_eq!(mode.control_char(ControlChar::Suspend), 0x1a);
        assert_eq!(mode.control_char(ControlChar::Start), 0x11);
        assert_eq!(mode.control_char(ControlChar::MinRead), 1);
        assert_eq!(mode.control_char(ControlChar::ReadTimeout), 0);
    }

    #[test]
    fn test_default_flags() {
        let mode = TerminalMode::default();
        assert!(mode.echo());
        assert!(mode.canonical());
        assert_ne!(mode.local_flags & libc::ISIG, 0);
        assert_ne!(mode.input_flags & libc::ICRNL, 0);
        assert_ne!(mode.output_flags & libc::ONLCR, 0);
        assert_eq!(mode.control_flags & libc::CSIZE, libc::CS8);
        assert_ne!(mode.control_flags & libc::CREAD, 0);
    }

    #[test]
    fn test_echo_off_clears_echo_family() {
        let mode = TerminalMode::default().with_echo(false);
        assert!(!mode.echo());
        assert_eq!(mode.local_flags & ECHO_FLAGS, 0);
        // Other local flags untouched
        assert!(mode.canonical());
        assert_ne!(mode.local_flags & libc::ISIG, 0);

        let mode = mode.with_echo(true);
        assert_eq!(mode, TerminalMode::default());
    }

    #[test]
    fn test_canonical_toggle() {
        let mode = TerminalMode::default().with_canonical(false);
        assert!(!mode.canonical());
        assert!(mode.echo());
    }

    #[test]
    fn test_control_char_remap() {
        let mode = TerminalMode::default().with_control_char(ControlChar::Erase, 0x08);
        assert_eq!(mode.control_char(ControlChar::Erase), 0x08);
        assert_eq!(mode.control_char(ControlChar::Kill), 0x15);
    }

    #[test]
    fn test_into_termios() {
        let tt = TerminalMode::default().into_termios();
        assert_eq!(tt.c_cc[libc::VINTR], 0x03);
        assert_eq!(tt.c_cc[libc::VERASE], 0x7f);
        assert_eq!(tt.c_cc[libc::VMIN], 1);
        assert_eq!(tt.c_cc[libc::VTIME], 0);
        assert_ne!(tt.c_lflag & libc::ICANON, 0);
        assert_ne!(tt.c_iflag & libc::IXANY, 0);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ControlChar::from_name("intr"), Some(ControlChar::Interrupt));
        assert_eq!(ControlChar::from_name("eof"), Some(ControlChar::EndOfFile));
        assert_eq!(ControlChar::from_name("time"), Some(ControlChar::ReadTimeout));
        assert_eq!(ControlChar::from_name("bogus"), None);
    }
}
