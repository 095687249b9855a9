//! Split calculation.
//!
//! - [`mode`] - the [`SplitMode`] enumeration
//! - [`request`] - [`SplitRequest`] and the loose numeric input accepted on the wire
//! - [`calculator`] - [`compute`] and the fail-closed [`validate_and_compute`]
//!
//! # Example
//!
//! ```
//! use splitpay::split::{validate_and_compute, SplitRequest};
//!
//! let request = SplitRequest::percentage(90.0, 3, vec![50.0, 30.0, 20.0]);
//! let outcome = validate_and_compute(&request).unwrap();
//! assert_eq!(outcome.split_amount, 30.0);
//! assert_eq!(outcome.details, Some(vec![45.0, 27.0, 18.0]));
//! ```

pub mod calculator;
pub mod mode;
pub mod request;

pub use calculator::*;
pub use mode::*;
pub use request::*;
