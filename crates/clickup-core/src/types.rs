//! # Choice Types
//!
//! Closed sets of values stored as text columns and exchanged verbatim over
//! the API.

use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $value:literal),+ $(,)?
        }
        default = $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $(
                #[cfg_attr(feature = "serde", serde(rename = $value))]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(CoreError::UnknownChoice {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

choice_enum! {
    /// Lifecycle of a sprint
    SprintStatus ("sprint status") {
        IsActive => "isActive",
        Completed => "Completed",
    }
    default = IsActive
}

choice_enum! {
    /// UI theme of an employee
    ThemeMode ("theme") {
        Light => "light",
        Dark => "dark",
    }
    default = Light
}

choice_enum! {
    DateFormat ("date format") {
        DayMonthYear => "dd-mm-yyyy",
    }
    default = DayMonthYear
}

choice_enum! {
    TimeFormat ("time format") {
        TwentyFourHour => "24hr",
    }
    default = TwentyFourHour
}

choice_enum! {
    ToastPosition ("toast position") {
        Off => "OFF",
    }
    default = Off
}

choice_enum! {
    /// Bucket a ticket status counts towards in team member statistics
    StatusCategory ("status category") {
        Todo => "todo",
        InProgress => "inprogress",
        ReadyForQa => "readyforqa",
        Completed => "completed",
    }
    default = Todo
}
