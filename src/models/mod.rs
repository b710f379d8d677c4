pub mod language;
pub mod question;
pub mod quiz;
pub mod session;

pub use question::{AnswerRecord, Question, OPTION_COUNT};
pub use quiz::{AppSettings, Certificate, GenerationProgress, QuestionSet, QuizRecord};
pub use session::{QuizConfig, QuizSession, MAX_QUESTIONS, MIN_QUESTIONS};
