// Library root
// -----------
// This crate exposes the pieces of the upload step so they can be tested
// without a network. The binary (`main.rs`) wires them together.
//
// Module responsibilities:
// - `config`: reads the step inputs from the environment and expands the
//   filename pattern.
// - `auth`: decodes the service-account credentials and mints bearer tokens.
// - `api`: blocking Drive v3 client behind the `Drive` trait.
// - `naming`: decides the destination name of each file.
// - `mirror`: recreates local directories as remote folders.
// - `upload`: the per-file create-or-update loop.
pub mod api;
pub mod auth;
pub mod config;
pub mod mirror;
pub mod naming;
pub mod upload;
