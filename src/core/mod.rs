mod app;

pub use app::{App, AppBuilder, TypedAppBuilder};
