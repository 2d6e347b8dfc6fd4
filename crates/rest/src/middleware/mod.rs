//! Axum middleware for the export API.

pub mod request_id;
