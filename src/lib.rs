//! # medprep
//!
//! Corpus indexer and query engine for medical exam preparation.
//!
//! A folder of textbooks, guidelines and question papers (PDF, XLSX/XLS,
//! CSV) is turned into a flat-file token store. Topic queries build a
//! taxonomy-driven index from that store on demand and answer with
//! aggregated content, high-yield summary points or ranked exam-topic
//! predictions.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌────────────────────────┐
//! │ Extractor  │──▶│   Chunker   │──▶│ tokenized_content.json │
//! │ PDF/XLSX/  │   │ clean+split │   │     (token store)      │
//! │ CSV        │   │ +tokenize   │   └───────────┬────────────┘
//! └────────────┘   └─────────────┘               │
//!                                                ▼
//!                                       ┌────────────────┐
//!                                       │  Topic index   │
//!                                       └───┬────────┬───┘
//!                                           ▼        ▼
//!                                    ┌──────────┐ ┌──────────┐
//!                                    │Summarizer│ │Predictor │
//!                                    └──────────┘ └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF, workbook and CSV text extraction |
//! | [`chunk`] | Cleaning, word chunking and tokenization |
//! | [`corpus`] | Category folder discovery |
//! | [`ingest`] | Tokenization pipeline |
//! | [`store`] | Token store persistence |
//! | [`taxonomy`] | Topic keywords and slug normalization |
//! | [`index`] | Topic index and topic lookup |
//! | [`summarize`] | High-yield point selection |
//! | [`predict`] | Exam topic scoring |
//! | [`query`] | Content, summary and prediction queries |
//! | [`server`] | HTTP server |
//! | [`stats`], [`export`], [`inspect`] | Store inspection commands |
//! | [`progress`] | Tokenization progress on stderr |

pub mod chunk;
pub mod config;
pub mod corpus;
pub mod export;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod inspect;
pub mod models;
pub mod predict;
pub mod progress;
pub mod query;
pub mod server;
pub mod stats;
pub mod store;
pub mod summarize;
pub mod taxonomy;
