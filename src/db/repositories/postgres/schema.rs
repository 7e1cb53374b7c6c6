//! Diesel table definitions for the scheduling schema.

diesel::table! {
    photographer_agenda_entries (id) {
        id -> Int8,
        photographer_user_id -> Int8,
        entry_type -> Varchar,
        source -> Varchar,
        source_id -> Nullable<Int8>,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        blocking -> Bool,
        reason -> Nullable<Varchar>,
        timezone -> Varchar,
    }
}

diesel::table! {
    photo_session_bookings (id) {
        id -> Int8,
        agenda_entry_id -> Int8,
        photographer_user_id -> Int8,
        listing_identity_id -> Int8,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        status -> Varchar,
        reason -> Nullable<Varchar>,
        reservation_token -> Nullable<Varchar>,
        reserved_until -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    listings (id) {
        id -> Int8,
        identity_id -> Int8,
        user_id -> Int8,
        status -> Varchar,
        deleted -> Bool,
        city -> Varchar,
        state -> Varchar,
        code -> Int4,
    }
}

diesel::table! {
    users (id) {
        id -> Int8,
        full_name -> Varchar,
        city -> Varchar,
        state -> Varchar,
        timezone -> Nullable<Varchar>,
        photographer -> Bool,
    }
}

diesel::table! {
    user_device_tokens (id) {
        id -> Int8,
        user_id -> Int8,
        token -> Varchar,
        opted_in -> Bool,
    }
}

diesel::table! {
    photographer_service_areas (id) {
        id -> Int8,
        photographer_user_id -> Int8,
        city -> Varchar,
        state -> Varchar,
    }
}

diesel::table! {
    holiday_calendars (id) {
        id -> Int8,
        name -> Varchar,
        scope -> Varchar,
        state -> Nullable<Varchar>,
        city -> Nullable<Varchar>,
        active -> Bool,
    }
}

diesel::table! {
    holiday_calendar_dates (id) {
        id -> Int8,
        calendar_id -> Int8,
        holiday_date -> Date,
        label -> Varchar,
    }
}

diesel::table! {
    photographer_holiday_calendars (id) {
        id -> Int8,
        photographer_user_id -> Int8,
        calendar_id -> Int8,
    }
}

diesel::table! {
    owner_response_metrics (owner_id) {
        owner_id -> Int8,
        visit_avg_seconds -> Float8,
        visit_count -> Int8,
        visit_last_at -> Nullable<Timestamptz>,
        proposal_avg_seconds -> Float8,
        proposal_count -> Int8,
        proposal_last_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    listing_view_counters (listing_identity_id) {
        listing_identity_id -> Int8,
        views -> Int8,
        last_view_at -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    photographer_agenda_entries,
    photo_session_bookings,
    listings,
    users,
    user_device_tokens,
    photographer_service_areas,
    holiday_calendars,
    holiday_calendar_dates,
    photographer_holiday_calendars,
    owner_response_metrics,
    listing_view_counters,
);
