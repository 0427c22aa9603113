//! Diesel table definitions for the carpark store.
//!
//! Keep in sync with the SQL under `backend/migrations`.

diesel::table! {
    carparks (car_park_no) {
        car_park_no -> Varchar,
        address -> Text,
        x_coord -> Float8,
        y_coord -> Float8,
        latitude -> Float8,
        longitude -> Float8,
        car_park_type -> Text,
        type_of_parking_system -> Text,
        short_term_parking -> Text,
        free_parking -> Text,
        night_parking -> Bool,
        car_park_decks -> Int4,
        gantry_height -> Float8,
        car_park_basement -> Bool,
        total_lots -> Nullable<Int4>,
        lots_available -> Nullable<Int4>,
        lot_type -> Nullable<Text>,
        lot_info_last_updated -> Nullable<Text>,
        interested_driver_count -> Int4,
    }
}

diesel::table! {
    drivers (id) {
        id -> Uuid,
        interested_carpark -> Nullable<Varchar>,
        points -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(drivers -> carparks (interested_carpark));
diesel::allow_tables_to_appear_in_same_query!(carparks, drivers);
