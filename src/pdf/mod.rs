//! PDF access module

pub mod fields;

// Re-export commonly used items
pub use fields::{
    decode_text_string, fields_from_document, read_form_fields, FieldType, FormField, FormFields,
};
