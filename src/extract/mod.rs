//! # Parameter Extraction
//!
//! The Value Reader ([`read_param`]) turns raw header, query and url strings
//! into typed JSON values and runs each declared type's validator. The results
//! land in a [`RequestValues`] store whose accessors enforce that handlers read
//! params exactly as they were declared.
//!
//! Client mistakes (missing, unparseable, invalid) are 400 [`HttpError`]s.
//! Handler mistakes (wrong kind, wrong required-ness, undeclared name) are
//! [`Fault`]s and surface as 500.
//!
//! [`HttpError`]: crate::error::HttpError
//! [`Fault`]: crate::error::Fault

mod reader;
mod store;

pub use reader::{extract_values, header_value_string, read_param};
pub use store::{RequestValues, StoredValue, ValueStore};
