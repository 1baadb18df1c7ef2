use crate::model::*;

/// One conflict per active booking overlapping `span`, in start order.
/// Symmetric: A conflicts with B exactly when B conflicts with A.
pub fn booking_conflicts(span: &Span, existing: &[Booking]) -> Vec<BookingConflict> {
    let mut conflicts: Vec<BookingConflict> = existing
        .iter()
        .filter(|b| b.status.is_active() && span.overlaps(&b.span()))
        .map(BookingConflict::with_booking)
        .collect();
    conflicts.sort_by_key(|c| c.conflict_start);
    conflicts
}
