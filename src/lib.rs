//! Identity provider gateway: drives a Cognito-style user pool for the
//! credential lifecycle (register, confirm, login, MFA) and verifies the
//! bearer tokens the pool issues.

pub mod api;
pub mod cli;
pub mod idp;
pub mod token;
