//! Pure domain logic for the care ward: patients, care tasks and notifications.
//!
//! Nothing in this crate performs I/O. Storage adapters and the HTTP layer live
//! in `care-server` and call into these types before persisting or answering.

pub mod diagnosis;
pub mod editor;
pub mod error;
pub mod notification;
pub mod patient;
pub mod schedule;
pub mod search;
pub mod todo;

mod patch;

pub use diagnosis::{normalize, normalized, Diagnosis};
pub use error::{ValidationError, ValidationResult};
pub use notification::{NewNotification, Notification, NotificationType};
pub use patient::{Gender, NewPatient, Patient, PatientUpdate, VisitStatistic};
pub use schedule::{Classification, Classifier, UpcomingWindow};
pub use search::SearchQuery;
pub use todo::{NewTodo, Todo, TodoCategory, TodoFilter, TodoPriority, TodoUpdate};
