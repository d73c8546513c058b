pub mod annotate;
pub mod app;
pub mod config;
pub mod contigs;
pub mod domain;
pub mod download;
pub mod error;
pub mod fs_util;
pub mod hits;
pub mod hmm_profile;
pub mod hmmer;
pub mod interacdome;
pub mod kofam;
pub mod output;
pub mod pipeline;
pub mod store;
