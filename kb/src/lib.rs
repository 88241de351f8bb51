//! Kfetboard - command-line front-end for the Kfet planning board
//!
//! The binary loads [`config::Config`], opens a [`planningstore::PlanningStore`]
//! on file storage and maps each subcommand onto one store command, printing
//! views through [`render`].

pub mod cli;
pub mod config;
pub mod render;
