/// Middleware modules for the API server
///
/// This module contains custom middleware for:
/// - Security headers
///
/// JWT authentication middleware lives in `marketbrief_shared::auth`
/// because the worker validates the same tokens.

pub mod security;
