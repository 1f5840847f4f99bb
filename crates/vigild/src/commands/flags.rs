//! Availability and policy bits attached to command descriptors.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bit-set governing where a command may run and which policy gates it skips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CommandFlags(u8);

impl CommandFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Usable from the command-line preflight path.
    pub const CLI: Self = Self(1 << 0);
    /// Usable from a live client session.
    pub const SESSION: Self = Self(1 << 1);
    /// Executable by clients that do not own the daemon process.
    pub const ALLOW_ANY_USER: Self = Self(1 << 2);
    /// Still executable after the service has been poisoned.
    pub const POISON_IMMUNE: Self = Self(1 << 3);

    const NAMES: [(Self, &'static str); 4] = [
        (Self::CLI, "cli"),
        (Self::SESSION, "session"),
        (Self::ALLOW_ANY_USER, "allow_any_user"),
        (Self::POISON_IMMUNE, "poison_immune"),
    ];

    /// Returns the raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true when every bit in `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true when `self` and `other` share at least one bit.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns true when no bits are set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CommandFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CommandFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CommandFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for CommandFlags {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    formatter.write_str("|")?;
                }
                formatter.write_str(name)?;
                first = false;
            }
        }
        if first {
            formatter.write_str("none")?;
        }
        Ok(())
    }
}

/// Invocation context used when resolving a request.
///
/// A permissive mode carries no bits: unknown commands pass through
/// unresolved instead of failing, and availability is not filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextMode(CommandFlags);

impl ContextMode {
    /// Lenient preflight used before a request is forwarded to the daemon.
    pub const PERMISSIVE: Self = Self(CommandFlags::NONE);
    /// Strict resolution for commands arriving on a client session.
    pub const SESSION: Self = Self(CommandFlags::SESSION);
    /// Strict resolution for commands executed directly by the CLI.
    pub const CLI: Self = Self(CommandFlags::CLI);

    /// Availability bits a descriptor must share to run in this mode.
    #[must_use]
    pub const fn flags(self) -> CommandFlags {
        self.0
    }

    /// Returns true for the zero mode.
    #[must_use]
    pub const fn is_permissive(self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn combines_and_tests_bits() {
        let flags = CommandFlags::SESSION | CommandFlags::POISON_IMMUNE;
        assert!(flags.contains(CommandFlags::SESSION));
        assert!(flags.contains(CommandFlags::POISON_IMMUNE));
        assert!(!flags.contains(CommandFlags::ALLOW_ANY_USER));
        assert!(!flags.intersects(CommandFlags::CLI | CommandFlags::ALLOW_ANY_USER));
    }

    #[rstest]
    #[case(CommandFlags::NONE, "none")]
    #[case(CommandFlags::CLI | CommandFlags::SESSION, "cli|session")]
    #[case(
        CommandFlags::ALLOW_ANY_USER | CommandFlags::POISON_IMMUNE,
        "allow_any_user|poison_immune"
    )]
    fn displays_flag_names(#[case] flags: CommandFlags, #[case] expected: &str) {
        assert_eq!(flags.to_string(), expected);
    }

    #[test]
    fn only_permissive_mode_is_zero() {
        assert!(ContextMode::PERMISSIVE.is_permissive());
        assert!(!ContextMode::SESSION.is_permissive());
        assert!(!ContextMode::CLI.is_permissive());
    }
}
