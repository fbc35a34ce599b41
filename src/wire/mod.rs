pub mod reader;
pub mod varint;

pub use reader::{FieldReader, Halt, WireField, WireType, WireValue};
