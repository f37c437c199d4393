//! Command handlers

pub mod auth;
pub mod machinepool;
pub mod operator_roles;
