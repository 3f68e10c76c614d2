pub mod api_utils;
pub mod background;
pub mod endpoints;
pub mod main_api;
pub mod model;
pub mod serve;
