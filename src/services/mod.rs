pub mod batch_generator;
pub mod certification_validator;
pub mod prompts;
pub mod question_generator;
pub mod response_parser;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch_generator::{BatchGenerator, MAX_BATCH_SIZE};
pub use certification_validator::{CertificationValidation, CertificationValidator, Confidence};
pub use question_generator::QuestionGenerator;
pub use retry::RetryPolicy;
