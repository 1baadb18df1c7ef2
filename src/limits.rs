/// Widest availability query, in days.
pub const MAX_QUERY_DAYS: i64 = 93;

/// Longest single booking, in minutes.
pub const MAX_BOOKING_MINUTES: u32 = 1440;

/// Longest slot a rule may declare, in minutes.
pub const MAX_SLOT_MINUTES: u32 = 1440;

/// Longest buffer a rule may declare, in minutes.
pub const MAX_BUFFER_MINUTES: u32 = 1440;

/// Longest notice a rule may demand before a slot, in hours (one leap year).
pub const MAX_MIN_ADVANCE_HOURS: u32 = 8784;

/// Furthest ahead a rule may open its calendar, in days.
pub const MAX_ADVANCE_DAYS: u32 = 3660;

pub const MAX_EXCEPTIONS_PER_RULE: usize = 366;

pub const MAX_SERVICE_TYPES_PER_RULE: usize = 16;

pub const MAX_TITLE_LEN: usize = 256;
