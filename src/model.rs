use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::split::{PaymentSplit, SplitConfiguration};

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Span {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn from_minutes(start: DateTime<Utc>, minutes: u32) -> Self {
        Self::new(start, start + Duration::minutes(i64::from(minutes)))
    }

    /// The whole calendar day `[00:00, next 00:00)` in UTC.
    pub fn day(date: NaiveDate) -> Self {
        Self::new(start_of_day(date), start_of_day(date) + Duration::days(1))
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Three-way overlap test: `self` starts inside `other`, ends inside `other`,
    /// or fully contains it. Back-to-back intervals do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        (self.start >= other.start && self.start < other.end)
            || (self.end > other.start && self.end <= other.end)
            || (self.start <= other.start && self.end >= other.end)
    }

    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// 0 = Sunday .. 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

// ── Wall-clock time ──────────────────────────────────────────────

/// A 24-hour `HH:MM` time of day. Accepts `H:MM` or `HH:MM` with hour 0-23,
/// always renders zero-padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Anchor this time of day on a calendar date (UTC).
    pub fn on(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_time(self.0).and_utc()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidClockTime(pub String);

impl fmt::Display for InvalidClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time {:?}: expected HH:MM in 24-hour format (e.g. 09:00)", self.0)
    }
}

impl std::error::Error for InvalidClockTime {}

impl FromStr for ClockTime {
    type Err = InvalidClockTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidClockTime(s.to_string());
        let (hh, mm) = s.split_once(':').ok_or_else(invalid)?;
        let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(hh) || hh.len() > 2 || !all_digits(mm) || mm.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = hh.parse().map_err(|_| invalid())?;
        let minute: u32 = mm.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = InvalidClockTime;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(t: ClockTime) -> Self {
        t.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

// ── Availability rules ───────────────────────────────────────────

/// Which sub-structure of a rule is populated, tagged by `availabilityType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "availabilityType", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Schedule {
    Weekly {
        day_of_week: u8,
        start_time: ClockTime,
        end_time: ClockTime,
    },
    DateRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: ClockTime,
        end_time: ClockTime,
    },
    OneTime {
        start_date_time: DateTime<Utc>,
        end_date_time: DateTime<Utc>,
    },
}

impl Schedule {
    pub fn kind(&self) -> &'static str {
        match self {
            Schedule::Weekly { .. } => "weekly",
            Schedule::DateRange { .. } => "date-range",
            Schedule::OneTime { .. } => "one-time",
        }
    }

    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self {
            Schedule::Weekly { day_of_week: dow, .. } => *dow == day_of_week(date),
            Schedule::DateRange {
                start_date,
                end_date,
                ..
            } => *start_date <= date && date <= *end_date,
            Schedule::OneTime {
                start_date_time, ..
            } => start_date_time.date_naive() == date,
        }
    }

    /// The bookable window this schedule opens on `date`, or `None` when the
    /// stored window is empty.
    pub fn window_on(&self, date: NaiveDate) -> Option<Span> {
        let (start, end) = match self {
            Schedule::Weekly {
                start_time,
                end_time,
                ..
            }
            | Schedule::DateRange {
                start_time,
                end_time,
                ..
            } => (start_time.on(date), end_time.on(date)),
            Schedule::OneTime {
                start_date_time,
                end_date_time,
            } => (*start_date_time, *end_date_time),
        };
        (start < end).then(|| Span::new(start, end))
    }

    /// Human-readable title used when a rule is saved without one.
    pub fn default_title(&self) -> String {
        match self {
            Schedule::Weekly {
                day_of_week,
                start_time,
                end_time,
            } => {
                let day = WEEKDAY_NAMES
                    .get(usize::from(*day_of_week))
                    .copied()
                    .unwrap_or("Day");
                format!("{day} {start_time}-{end_time}")
            }
            Schedule::DateRange {
                start_date,
                end_date,
                ..
            } => format!("{start_date} to {end_date}"),
            Schedule::OneTime {
                start_date_time, ..
            } => format!("One-time: {}", start_date_time.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeWindow {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityException {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_availability: Option<AlternativeWindow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    #[default]
    Service,
    Consultation,
    Rental,
    Class,
    Event,
    Custom,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Service => "service",
            ServiceType::Consultation => "consultation",
            ServiceType::Rental => "rental",
            ServiceType::Class => "class",
            ServiceType::Event => "event",
            ServiceType::Custom => "custom",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeLimit {
    pub service_type: ServiceType,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
}

fn default_max_concurrent() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRule {
    pub id: Ulid,
    pub tenant: Ulid,
    pub provider: Ulid,
    pub title: String,
    #[serde(flatten)]
    pub schedule: Schedule,
    /// Minutes per bookable unit.
    pub slot_duration: u32,
    /// Dead minutes after each slot.
    pub buffer_time: u32,
    /// Hours; `None` falls back to the engine default.
    pub min_advance_booking: Option<u32>,
    /// Days; `None` (or 0) means no upper bound.
    pub max_advance_booking: Option<u32>,
    #[serde(default)]
    pub exceptions: Vec<AvailabilityException>,
    #[serde(default)]
    pub service_types: Vec<ServiceTypeLimit>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityRule {
    /// A rule without declared service types accepts every service.
    pub fn accepts_service(&self, service: Option<ServiceType>) -> bool {
        match service {
            Some(service) if !self.service_types.is_empty() => {
                self.service_types.iter().any(|st| st.service_type == service)
            }
            _ => true,
        }
    }

    pub fn exception_on(&self, date: NaiveDate) -> Option<&AvailabilityException> {
        self.exceptions.iter().find(|e| e.date == date)
    }
}

/// Input for creating a rule; unset fields take collection defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAvailabilityRule {
    pub tenant: Ulid,
    pub provider: Ulid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(default)]
    pub slot_duration: Option<u32>,
    #[serde(default)]
    pub buffer_time: Option<u32>,
    #[serde(default)]
    pub min_advance_booking: Option<u32>,
    #[serde(default)]
    pub max_advance_booking: Option<u32>,
    #[serde(default)]
    pub exceptions: Vec<AvailabilityException>,
    #[serde(default)]
    pub service_types: Vec<ServiceTypeLimit>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl NewAvailabilityRule {
    pub fn new(tenant: Ulid, provider: Ulid, schedule: Schedule) -> Self {
        Self {
            tenant,
            provider,
            title: None,
            schedule,
            slot_duration: None,
            buffer_time: None,
            min_advance_booking: None,
            max_advance_booking: None,
            exceptions: Vec::new(),
            service_types: Vec::new(),
            is_active: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRulePatch {
    pub title: Option<String>,
    pub schedule: Option<Schedule>,
    pub slot_duration: Option<u32>,
    pub buffer_time: Option<u32>,
    /// Hours of notice. `Some(0)` drops the notice requirement.
    pub min_advance_booking: Option<u32>,
    /// Booking horizon in days. `Some(0)` makes the rule unbounded; a stored
    /// `Some(0)` and `None` generate the same slots.
    pub max_advance_booking: Option<u32>,
    pub exceptions: Option<Vec<AvailabilityException>>,
    pub service_types: Option<Vec<ServiceTypeLimit>>,
    pub is_active: Option<bool>,
    pub metadata: Option<serde_json::Value>,
}

impl AvailabilityRulePatch {
    /// Absent fields are left as they are.
    pub fn apply(self, rule: &mut AvailabilityRule) {
        if let Some(title) = self.title {
            rule.title = title;
        }
        if let Some(schedule) = self.schedule {
            rule.schedule = schedule;
        }
        if let Some(v) = self.slot_duration {
            rule.slot_duration = v;
        }
        if let Some(v) = self.buffer_time {
            rule.buffer_time = v;
        }
        if let Some(v) = self.min_advance_booking {
            rule.min_advance_booking = Some(v);
        }
        if let Some(v) = self.max_advance_booking {
            rule.max_advance_booking = Some(v);
        }
        if let Some(v) = self.exceptions {
            rule.exceptions = v;
        }
        if let Some(v) = self.service_types {
            rule.service_types = v;
        }
        if let Some(v) = self.is_active {
            rule.is_active = v;
        }
        if let Some(v) = self.metadata {
            rule.metadata = Some(v);
        }
    }
}

// ── Bookings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Statuses that occupy the provider's calendar.
    pub const ACTIVE: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, NoShow)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in-progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no-show",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub amount: f64,
    pub currency: String,
    pub split_configuration: SplitConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequest {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub split_configuration: Option<SplitConfiguration>,
}

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingPlatform {
    Zoom,
    GoogleMeet,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDetails {
    pub platform: MeetingPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
}

/// Where a booking takes place, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Location {
    Provider {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
    },
    Client {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
    },
    Remote {
        remote_details: RemoteDetails,
    },
    Custom {
        address: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFlags {
    pub confirmation_sent: bool,
    pub reminder_sent: bool,
    pub follow_up_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Ulid,
    pub tenant: Ulid,
    pub provider: Ulid,
    pub client: Ulid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub booking_type: ServiceType,
    pub start_date_time: DateTime<Utc>,
    /// Always `start_date_time + duration`.
    pub end_date_time: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    pub pricing: Pricing,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub notifications: NotificationFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn span(&self) -> Span {
        Span::new(self.start_date_time, self.end_date_time)
    }

    pub fn payment_split(&self) -> PaymentSplit {
        PaymentSplit::calculate(
            self.pricing.amount,
            &self.pricing.currency,
            &self.pricing.split_configuration,
        )
    }
}

/// An already-authorized request to book a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub provider_id: Ulid,
    pub client_id: Ulid,
    pub tenant_id: Ulid,
    pub start_date_time: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    #[serde(default)]
    pub booking_type: ServiceType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub pricing: PricingRequest,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl BookingRequest {
    pub fn end_date_time(&self) -> DateTime<Utc> {
        self.start_date_time + Duration::minutes(i64::from(self.duration))
    }

    /// Requested interval. Callers must reject a zero duration first.
    pub fn span(&self) -> Span {
        Span::new(self.start_date_time, self.end_date_time())
    }
}

// ── Derived results ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub provider_id: Ulid,
    pub tenant_id: Ulid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
    /// Fallback slot length for rules that do not set one.
    #[serde(default)]
    pub slot_duration: Option<u32>,
}

impl AvailabilityQuery {
    pub fn new(
        provider_id: Ulid,
        tenant_id: Ulid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            provider_id,
            tenant_id,
            start_date,
            end_date,
            service_type: None,
            slot_duration: None,
        }
    }

    pub fn service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = Some(service_type);
        self
    }

    pub fn slot_duration(mut self, minutes: u32) -> Self {
        self.slot_duration = Some(minutes);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Available,
    Booked,
    Blocked,
    Buffer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub available: bool,
    pub slot_type: SlotType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Ulid>,
}

impl TimeSlot {
    pub fn available(span: Span) -> Self {
        Self {
            start_time: span.start,
            end_time: span.end,
            available: true,
            slot_type: SlotType::Available,
            booking_id: None,
        }
    }

    pub fn booked(span: Span, booking_id: Ulid) -> Self {
        Self {
            start_time: span.start,
            end_time: span.end,
            available: false,
            slot_type: SlotType::Booked,
            booking_id: Some(booking_id),
        }
    }

    pub fn buffer(span: Span) -> Self {
        Self {
            start_time: span.start,
            end_time: span.end,
            available: false,
            slot_type: SlotType::Buffer,
            booking_id: None,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.start_time, self.end_time)
    }

    /// Bookable and of type `available`; only these merge.
    pub fn is_open(&self) -> bool {
        self.available && self.slot_type == SlotType::Available
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictType {
    Booking,
    Availability,
    Buffer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConflict {
    pub conflict_id: Ulid,
    pub conflict_type: ConflictType,
    pub conflict_start: DateTime<Utc>,
    pub conflict_end: DateTime<Utc>,
    pub message: String,
}

impl BookingConflict {
    pub fn with_booking(booking: &Booking) -> Self {
        Self {
            conflict_id: booking.id,
            conflict_type: ConflictType::Booking,
            conflict_start: booking.start_date_time,
            conflict_end: booking.end_date_time,
            message: format!(
                "Conflicts with existing booking: {} ({} - {})",
                booking.title,
                booking.start_date_time.to_rfc3339(),
                booking.end_date_time.to_rfc3339()
            ),
        }
    }
}

/// Events published to downstream collaborators. Flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    BookingCreated {
        id: Ulid,
        provider: Ulid,
        client: Ulid,
        span: Span,
    },
    StatusChanged {
        id: Ulid,
        provider: Ulid,
        from: BookingStatus,
        to: BookingStatus,
    },
    RuleChanged {
        id: Ulid,
        provider: Ulid,
        active: bool,
    },
}

impl BookingEvent {
    pub fn provider(&self) -> Ulid {
        match self {
            BookingEvent::BookingCreated { provider, .. }
            | BookingEvent::StatusChanged { provider, .. }
            | BookingEvent::RuleChanged { provider, .. } => *provider,
        }
    }
}
