//! Caredesk: the authorization core of a small clinical CRM.
//!
//! Staff (admins) manage patients, follow-up tasks and patient message
//! threads. Patients register themselves and get an account of their own.
//! Every read and write goes through [`authz::PolicyRegistry`], which
//! decides per role and per resource whether an action is allowed and which
//! records a listing may contain.
//!
//! Repositories accept only [`authz::Authorized`] values, so a mutation or
//! listing that skipped its policy check does not compile.

pub mod authz;
pub mod config;
pub mod db;
pub mod models;
#[cfg(feature = "cli")]
pub mod observability;
pub mod services;

#[cfg(test)]
mod tests;
