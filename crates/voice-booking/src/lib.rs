pub mod dispatcher;
pub mod slots;
pub mod store;

pub use dispatcher::{tool_definitions, ToolDefinition, ToolDispatcher, ToolName};
pub use slots::{format_slot_label, slots_for_date};
pub use store::{Appointment, BookingStore, CreateAppointmentOutcome, CreateAppointmentRequest};
