//! Core of the Brine SBE toolchain: IR tokens, the token stream walker, the
//! layout engine and a dynamic runtime codec. See
//! [https://github.com/real-logic/simple-binary-encoding](https://github.com/real-logic/simple-binary-encoding)
//! for documentation about the format.
//!
//! ```
//! use brine_sbe_schema::*;
//!
//! let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
//!     .add_message(
//!         MessageDef::new("Point", 1)
//!             .field(FieldDef::primitive("x", 1, PrimitiveType::Int16))
//!             .field(FieldDef::primitive("y", 2, PrimitiveType::Int16)),
//!     )
//!     .build();
//!
//! let codec = MessageCodec::new(&ir, "Point").unwrap();
//! let value = codec.decode_body(&[1, 0, 255, 255], 4).unwrap();
//! assert_eq!(format!("{:?}", value), "Point {x: 1, y: -1}");
//! assert_eq!(codec.encode_body(&value).unwrap(), [1, 0, 255, 255]);
//! ```

pub mod bb;
pub mod builder;
pub mod codec;
pub mod error;
pub mod ir;
pub mod layout;
pub mod primitive;
pub mod token;
pub mod value;
pub mod walker;

pub use bb::*;
pub use builder::*;
pub use codec::*;
pub use error::*;
pub use ir::*;
pub use layout::*;
pub use primitive::*;
pub use token::*;
pub use value::*;
pub use walker::{collect_fields, collect_groups, collect_var_data, split_body, BodySpans, Span};
