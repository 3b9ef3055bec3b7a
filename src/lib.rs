//! Turn stories serialized on the web into EPUB books.
//!
//! A [`source::Source`] fetches a story into a [`book::Book`], downloading
//! chapter pages and their images; [`book::Book::to_epub`] packages it.

#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

pub mod book;
pub mod chapter;
pub mod content;
pub mod date;
pub mod errors;
pub mod fetch;
pub mod image_data;
pub mod report;
pub mod source;

pub use book::{Book, OnConflict, Outcome};
pub use errors::{Error, ErrorKind, Result};
