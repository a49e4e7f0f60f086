// Adapters layer: concrete implementations for external systems (http, clock, browser driver).

pub mod clock;
pub mod http;
pub mod ui_download;
