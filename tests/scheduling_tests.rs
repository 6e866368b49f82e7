//! Screening scheduler: hall conflict detection, updates and deactivation.

mod common;

use chrono::{DateTime, Utc};

use cinema_booking::error::BookingError;
use cinema_booking::services::booking::{book_ticket, cancel_ticket, occupancy, BookTicketRequest};
use cinema_booking::services::scheduling::{
    deactivate_screening, reschedule_screening, schedule_screening, screening_details,
    ScheduleRequest,
};
use common::{at, Cinema, CUSTOMER_ROLE};

fn request(cinema: &Cinema, hall_id: i64, movie_id: i64, hour: u32, minute: u32) -> ScheduleRequest {
    ScheduleRequest {
        movie_id,
        hall_id,
        screening_type_id: cinema.standard.id,
        start_time: at(hour, minute),
    }
}

#[tokio::test]
async fn overlapping_screening_is_rejected_and_back_to_back_is_accepted() {
    let cinema = Cinema::new().await;
    let hall = cinema.hall1.id;
    let movie = cinema.feature.id;

    // 13:00 + 125 min = 15:05
    schedule_screening(cinema.store(), request(&cinema, hall, movie, 13, 0))
        .await
        .unwrap();

    let clash = schedule_screening(cinema.store(), request(&cinema, hall, movie, 14, 0)).await;
    assert!(matches!(clash, Err(BookingError::Conflict(_))));

    let next = schedule_screening(cinema.store(), request(&cinema, hall, movie, 15, 5))
        .await
        .unwrap();
    assert_eq!(next.start_time, at(15, 5));
    assert_eq!(cinema.store.screenings().await.len(), 2);
}

#[tokio::test]
async fn screening_ending_exactly_at_existing_start_is_accepted() {
    let cinema = Cinema::new().await;
    let hall = cinema.hall1.id;

    schedule_screening(cinema.store(), request(&cinema, hall, cinema.feature.id, 13, 0))
        .await
        .unwrap();

    // 11:30 + 90 min = 13:00
    let before = schedule_screening(cinema.store(), request(&cinema, hall, cinema.short.id, 11, 30)).await;
    assert!(before.is_ok());

    // 11:31 + 90 min = 13:01
    let overlapping = schedule_screening(cinema.store(), request(&cinema, hall, cinema.short.id, 11, 31)).await;
    assert!(matches!(overlapping, Err(BookingError::Conflict(_))));
}

#[tokio::test]
async fn candidate_enclosing_existing_screening_conflicts() {
    let cinema = Cinema::new().await;
    let hall = cinema.hall1.id;

    schedule_screening(cinema.store(), request(&cinema, hall, cinema.short.id, 13, 30))
        .await
        .unwrap();

    // 13:00-15:05 contains 13:30-15:00
    let result = schedule_screening(cinema.store(), request(&cinema, hall, cinema.feature.id, 13, 0)).await;
    assert!(matches!(result, Err(BookingError::Conflict(_))));
}

#[tokio::test]
async fn rejected_request_stays_rejected_without_state_change() {
    let cinema = Cinema::new().await;
    let hall = cinema.hall1.id;

    schedule_screening(cinema.store(), request(&cinema, hall, cinema.feature.id, 13, 0))
        .await
        .unwrap();
    let before = cinema.store.screenings().await;

    for _ in 0..3 {
        let result =
            schedule_screening(cinema.store(), request(&cinema, hall, cinema.feature.id, 14, 0)).await;
        assert!(matches!(result, Err(BookingError::Conflict(_))));
    }

    assert_eq!(cinema.store.screenings().await, before);
}

#[tokio::test]
async fn same_time_in_another_hall_is_fine() {
    let cinema = Cinema::new().await;

    schedule_screening(cinema.store(), request(&cinema, cinema.hall1.id, cinema.feature.id, 13, 0))
        .await
        .unwrap();
    let other = schedule_screening(cinema.store(), request(&cinema, cinema.hall2.id, cinema.feature.id, 13, 0)).await;

    assert!(other.is_ok());
}

#[tokio::test]
async fn missing_references_are_not_found() {
    let cinema = Cinema::new().await;

    let no_movie = schedule_screening(cinema.store(), request(&cinema, cinema.hall1.id, 9_999, 13, 0)).await;
    assert!(matches!(no_movie, Err(BookingError::NotFound { entity: "movie", id: 9_999 })));

    let no_hall = schedule_screening(cinema.store(), request(&cinema, 9_998, cinema.feature.id, 13, 0)).await;
    assert!(matches!(no_hall, Err(BookingError::NotFound { entity: "hall", .. })));

    let mut bad_type = request(&cinema, cinema.hall1.id, cinema.feature.id, 13, 0);
    bad_type.screening_type_id = 9_997;
    let no_type = schedule_screening(cinema.store(), bad_type).await;
    assert!(matches!(no_type, Err(BookingError::NotFound { entity: "screening type", .. })));

    assert!(cinema.store.screenings().await.is_empty());
}

#[tokio::test]
async fn inactive_movie_counts_as_missing() {
    let cinema = Cinema::new().await;
    cinema.store.set_movie_active(cinema.short.id, false).await;

    let result = schedule_screening(cinema.store(), request(&cinema, cinema.hall1.id, cinema.short.id, 10, 0)).await;
    assert!(matches!(result, Err(BookingError::NotFound { entity: "movie", .. })));
}

#[tokio::test]
async fn reschedule_ignores_its_own_interval() {
    let cinema = Cinema::new().await;
    let hall = cinema.hall1.id;

    let screening = schedule_screening(cinema.store(), request(&cinema, hall, cinema.feature.id, 13, 0))
        .await
        .unwrap();

    // Shift by 30 minutes, overlapping only its old self
    let moved = reschedule_screening(
        cinema.store(),
        screening.id,
        request(&cinema, hall, cinema.feature.id, 13, 30),
    )
    .await
    .unwrap();

    assert_eq!(moved.id, screening.id);
    assert_eq!(moved.start_time, at(13, 30));
    assert_eq!(cinema.store.screenings().await.len(), 1);
}

#[tokio::test]
async fn reschedule_into_another_screening_conflicts() {
    let cinema = Cinema::new().await;
    let hall = cinema.hall1.id;

    schedule_screening(cinema.store(), request(&cinema, hall, cinema.feature.id, 13, 0))
        .await
        .unwrap();
    let evening = schedule_screening(cinema.store(), request(&cinema, hall, cinema.short.id, 19, 0))
        .await
        .unwrap();

    let result = reschedule_screening(
        cinema.store(),
        evening.id,
        request(&cinema, hall, cinema.short.id, 14, 30),
    )
    .await;
    assert!(matches!(result, Err(BookingError::Conflict(_))));

    let unchanged = screening_details(cinema.store(), evening.id).await.unwrap();
    assert_eq!(unchanged.start_time, at(19, 0));
}

#[tokio::test]
async fn reschedule_of_unknown_screening_is_not_found() {
    let cinema = Cinema::new().await;

    let result = reschedule_screening(
        cinema.store(),
        4_242,
        request(&cinema, cinema.hall1.id, cinema.feature.id, 13, 0),
    )
    .await;
    assert!(matches!(result, Err(BookingError::NotFound { entity: "screening", id: 4_242 })));
}

#[tokio::test]
async fn deactivated_screening_frees_the_slot() {
    let cinema = Cinema::new().await;
    let hall = cinema.hall1.id;

    let screening = schedule_screening(cinema.store(), request(&cinema, hall, cinema.feature.id, 13, 0))
        .await
        .unwrap();

    let inactive = deactivate_screening(cinema.store(), screening.id).await.unwrap();
    assert!(!inactive.is_active);

    // Second call is a no-op
    let again = deactivate_screening(cinema.store(), screening.id).await.unwrap();
    assert!(!again.is_active);

    let replacement = schedule_screening(cinema.store(), request(&cinema, hall, cinema.short.id, 14, 0)).await;
    assert!(replacement.is_ok());
}

#[tokio::test]
async fn details_carry_end_time_and_price() {
    let cinema = Cinema::new().await;

    let screening = schedule_screening(
        cinema.store(),
        request(&cinema, cinema.hall2.id, cinema.feature.id, 20, 15),
    )
    .await
    .unwrap();

    let details = screening_details(cinema.store(), screening.id).await.unwrap();
    assert_eq!(details.end_time, at(22, 20));
    assert_eq!(details.movie_title, "The Long Feature");
    assert_eq!(details.hall_name, "Hall 2");
    assert_eq!(details.screening_type_name, "2D");
    assert_eq!(details.price, 9.5);
}

#[tokio::test]
async fn screening_with_sold_tickets_stays_in_its_hall() {
    let cinema = Cinema::new().await;
    let screening = schedule_screening(cinema.store(), request(&cinema, cinema.hall1.id, cinema.feature.id, 13, 0))
        .await
        .unwrap();
    let buyer = cinema.customer().await;
    let ticket = book_ticket(
        cinema.store(),
        CUSTOMER_ROLE,
        BookTicketRequest {
            seat_id: cinema.hall1_seats[0].id,
            screening_id: screening.id,
            user_id: buyer.id,
        },
    )
    .await
    .unwrap();

    let moved = reschedule_screening(
        cinema.store(),
        screening.id,
        request(&cinema, cinema.hall2.id, cinema.feature.id, 13, 0),
    )
    .await;
    assert!(matches!(moved, Err(BookingError::Conflict(_))));

    let details = screening_details(cinema.store(), screening.id).await.unwrap();
    assert_eq!(details.hall_id, cinema.hall1.id);
    let counts = occupancy(cinema.store(), screening.id).await.unwrap();
    assert_eq!((counts.total_seats, counts.occupied, counts.free), (10, 1, 9));

    // Same hall, new time: tickets still match their seats
    let shifted = reschedule_screening(
        cinema.store(),
        screening.id,
        request(&cinema, cinema.hall1.id, cinema.feature.id, 16, 0),
    )
    .await;
    assert!(shifted.is_ok());

    // Once the hall is empty of tickets the move goes through
    cancel_ticket(cinema.store(), ticket.id).await.unwrap();
    let moved = reschedule_screening(
        cinema.store(),
        screening.id,
        request(&cinema, cinema.hall2.id, cinema.feature.id, 13, 0),
    )
    .await
    .unwrap();
    assert_eq!(moved.hall_id, cinema.hall2.id);
}

#[tokio::test]
async fn end_past_the_calendar_is_invalid_not_a_panic() {
    let cinema = Cinema::new().await;

    let mut far = request(&cinema, cinema.hall1.id, cinema.feature.id, 13, 0);
    far.start_time = DateTime::<Utc>::MAX_UTC;
    let result = schedule_screening(cinema.store(), far).await;

    assert!(matches!(result, Err(BookingError::Invalid(_))));
    assert!(cinema.store.screenings().await.is_empty());
}
