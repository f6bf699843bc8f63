//! Scramble - static OpenAPI generation from a route table and handler sources.
//!
//! Routes are read from a manifest, each class-based route is resolved to its
//! handler in the Rust source tree, and an ordered pipeline of extensions turns
//! the handler signature, its doc comment and the validation rules of its
//! request objects into an operation. Nothing is executed; the analysis works on
//! syntax trees only.
//!
//! # Architecture
//!
//! 1. [`route`] - routes and the manifest they are loaded from
//! 2. [`scanner`], [`parser`], [`source_index`] - locate and parse handler sources
//! 3. [`catalog`] - filters the routes to document
//! 4. [`route_info`] - a route together with its handler syntax node
//! 5. [`extensions`] - the operation pipeline, with [`rules`] and [`infer`]
//! 6. [`generator`] - assembles the [`openapi::Document`]
//! 7. [`merger`] - hoists shared alternate servers to their path
//! 8. [`serializer`] - renders the document as YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use scramble::config::Config;
//! use scramble::generator::Generator;
//! use scramble::route::RouteTable;
//! use scramble::serializer::serialize_yaml;
//! use std::path::{Path, PathBuf};
//!
//! let routes = RouteTable::from_file(Path::new("routes.yaml")).unwrap();
//! let generator = Generator::new(Config::default(), Box::new(routes), vec![PathBuf::from("src")]);
//! let document = generator.generate().unwrap();
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod doc_block;
pub mod error;
pub mod extensions;
pub mod generator;
pub mod infer;
pub mod merger;
pub mod openapi;
pub mod parser;
pub mod route;
pub mod route_info;
pub mod rules;
pub mod scanner;
pub mod serializer;
pub mod source_index;
