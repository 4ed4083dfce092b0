//! Pipe configuration: raw descriptors and their per-item resolution
//!
//! A pipe is instantiated with a [`RawConfiguration`]: a mapping from
//! parameter name to either a literal or a reference descriptor. For every
//! item processed the [`Resolver`] substitutes each reference against the
//! current record and the run [`Context`](crate::context::Context), producing
//! a fresh [`ResolvedConfiguration`].
//!
//! # Reference descriptors
//!
//! | JSON form | Descriptor | Resolves to |
//! |---|---|---|
//! | `{"value": v, "type": t}` | [`ConfValue::Literal`] | `v`, coerced to `t` when given |
//! | `{"path": "a.b"}` | [`ConfValue::Path`] | record value at `a.b`, else the string `"a.b"` itself |
//! | `{"subkey": "a.b"}` | [`ConfValue::Subkey`] | record value at `a.b`, else `null` |
//! | `{"terminal": "n", "default": v}` | [`ConfValue::Term`] | context input `n`, else `v`, else `null` |
//! | any other object | [`ConfValue::Nested`] | an object resolved field by field |
//! | anything else | [`ConfValue::Literal`] | itself |

pub mod raw;
pub mod resolved;
pub mod resolver;

pub use raw::{ConfValue, RawConfiguration};
pub use resolved::ResolvedConfiguration;
pub use resolver::{resolve, ResolutionMode, Resolver};
