pub mod controller;
pub mod markdown;
pub mod readability;
pub mod result;
pub mod stage;
pub mod validator;

pub use controller::QualityController;
pub use result::ValidationResult;
pub use stage::StageValidator;
pub use validator::ContentValidator;
