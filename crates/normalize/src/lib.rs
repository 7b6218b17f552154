//! Parsers for the noisy rate and tenor strings that come out of bank pages,
//! JSON payloads and PDF sheets. Tolerant to Vietnamese unit words, comma
//! decimals and stray percent signs; strict about the plausible rate band.

pub mod fold;
pub mod rate;
pub mod term;

pub use fold::fold_ascii;
pub use rate::parse_rate;
pub use term::{parse_term, standard_term_label};
