//! HTTP layer for the image gallery.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      HTTP Layer                         │
//! │                     GET /image                          │
//! │                                                         │
//! │  ┌──────────────────────┐  ┌─────────────────────────┐  │
//! │  │       handlers       │  │         routes          │  │
//! │  │ (image list, health) │  │ (local + Lambda router) │  │
//! │  └──────────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{health_handler, image_handler, GalleryState, HealthResponse, ImageListError};
pub use routes::{create_function_router, create_router, RouterConfig};
