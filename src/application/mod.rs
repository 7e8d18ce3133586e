pub mod app;
pub mod resource_monitor;

pub use app::Application;
pub use resource_monitor::ResourceMonitor;
