#![doc = include_str!("../README.md")]

pub mod catalog;
pub mod error;
pub mod extractors;
pub mod keywords;
pub mod pattern;
pub mod po;
pub mod trans;
pub mod walk;
pub mod whitespace;

pub use catalog::{Catalog, CatalogMetadata, Location, Message, MessageId};
pub use error::ExtractError;
pub use extractors::{ExtractOptions, ExtractedMessage, ExtractorKind, TemplateOptions};
pub use keywords::{KeywordSpec, Keywords};
pub use pattern::PathPattern;
pub use trans::{CollapseWhitespace, TransBlock, TransBlockParser, TransBlockStyle, Verbatim};
pub use walk::{FileMessage, MethodMap, extract_from_dir};
pub use whitespace::collapse_whitespace;
