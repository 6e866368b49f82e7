pub mod user;
pub mod hall;
pub mod seat;
pub mod movie;
pub mod screening;
pub mod ticket;
pub mod review;
pub mod seat_map;

pub use user::User;
pub use hall::Hall;
pub use seat::{NewSeat, Seat};
pub use movie::Movie;
pub use screening::{end_of, ScheduledSlot, Screening, ScreeningDetails, ScreeningDraft, ScreeningType};
pub use ticket::{OccupiedSeat, Ticket, TicketDraft};
pub use review::{Review, ReviewDraft};
pub use seat_map::{Occupancy, SeatMap, SeatWithTicket};
