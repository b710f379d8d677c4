pub mod navigation;

pub use navigation::{NavState, NavigationEvent, QuizNavigation, SubmitOutcome};
