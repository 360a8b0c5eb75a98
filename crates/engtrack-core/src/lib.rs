pub mod business_days;
pub mod document;
pub mod engagement;
pub mod error;
pub mod selector;
pub mod stats;
pub mod store;

pub use business_days::count_business_days;
pub use document::{Document, Metadata};
pub use engagement::{
    normalize_boolean, parse_date_input, parse_rating, Engagement, FeedbackAnswer,
    ENGAGEMENT_TYPE_PRESETS, FEEDBACK_QUESTIONS,
};
pub use error::{EngtrackError, EngtrackResult};
pub use selector::{ClientSelector, SelectorOutcome, SelectorState};
pub use stats::{MetricsEngine, MetricsOptions, MetricsReport};
pub use store::EngagementStore;
