pub mod content;
pub mod date;
pub mod error;
pub mod fields;
pub mod fingerprint;
pub mod setting;
pub mod validate;

pub use content::{max_steps, ContentType, Status, StepDescriptor};
pub use error::{BoxError, DraftError};
pub use fields::Fields;
pub use fingerprint::Fingerprint;
pub use validate::{Clock, FieldError, FixedClock, StepValidator, SystemClock, ValidationReport};
