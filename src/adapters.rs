pub mod ocr;
pub mod translate;
