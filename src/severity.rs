use strum_macros::{AsRefStr, Display, EnumString};

/// The severity of a log entry, as defined by
/// [LogSeverity](https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#logseverity).
///
/// Variants are ordered by increasing severity and carry the numeric value Cloud Logging uses.
/// The wire form is the upper case name, e.g. `WARNING`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Severity {
    /// The log entry has no assigned severity level.
    #[default]
    Default = 0,
    Debug = 100,
    Info = 200,
    /// Normal but significant events, such as start up, shut down, or a configuration change.
    Notice = 300,
    Warning = 400,
    Error = 500,
    /// Critical events cause more severe problems or outages.
    Critical = 600,
    /// A person must take an action immediately.
    Alert = 700,
    /// One or more systems are unusable.
    Emergency = 800,
}

impl Severity {
    /// The numeric value Cloud Logging assigns to this severity.
    pub fn code(self) -> i32 {
        self as i32
    }
}
