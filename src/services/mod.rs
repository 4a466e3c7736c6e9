pub mod answer_service;
pub mod completion;
pub mod ocr;
pub mod prompt;
pub mod upload;
